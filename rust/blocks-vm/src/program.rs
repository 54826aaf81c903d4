//! Finalized, immutable programs.

use std::fmt;
use std::sync::Arc;

use crate::binding::Bindings;
use crate::builder::Builder;
use crate::inst::Inst;

/// A finalized kernel: compact instructions plus the register-file size
/// they were laid out against.
///
/// Programs are shared through `Arc` and never mutated, so one program can
/// be embedded by any number of callers and executed from several threads
/// at once. A program exists before anything can call it, which rules out
/// self-referential call graphs by construction.
#[derive(PartialEq, Eq)]
pub struct Program {
    code: Box<[Inst]>,
    slots: usize,
    entry: usize,
    bindings: Bindings,
}

impl Program {
    /// Build a program. The closure receives a fresh [`Builder`] whose
    /// handles cannot escape or mix with any other builder's, and finishes
    /// it with [`Builder::ret`] or [`Builder::ret4`].
    ///
    /// ```
    /// use blocks_vm::Program;
    ///
    /// let add = Program::build(|mut b| {
    ///     let (x, y) = (b.arg(0), b.arg(1));
    ///     let sum = b.fadd(x, y);
    ///     b.ret(sum)
    /// });
    /// assert_eq!(add.len(), 2);
    /// ```
    pub fn build<F>(f: F) -> Arc<Program>
    where
        F: for<'id> FnOnce(Builder<'id>) -> Program,
    {
        Arc::new(f(Builder::new()))
    }

    pub(crate) fn new(code: Box<[Inst]>, slots: usize, entry: usize, bindings: Bindings) -> Self {
        Program {
            code,
            slots,
            entry,
            bindings,
        }
    }

    /// Register-file size, in slots, that executing this program needs.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of executable instructions, the final `ret` included.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// A finalized program always ends in `ret`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn instructions(&self) -> &[Inst] {
        &self.code
    }

    /// Slot the first instruction executes at.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Side-table usage of this program and everything it calls.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("slots", &self.slots)
            .field("entry", &self.entry)
            .field("code", &self.code)
            .finish()
    }
}

/// Disassembly listing, one instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; {} slots, {} instructions", self.slots, self.code.len())?;
        let mut at = self.entry;
        for inst in self.code.iter() {
            write!(f, "{:04}  {:<13}", at, inst.op().to_string())?;
            for off in inst.args() {
                write!(f, " {:+}", off)?;
            }
            if inst.op().touches_memory() {
                write!(f, " @{}", inst.ptr())?;
            }
            let imm = inst.imm().to_string();
            if !imm.is_empty() {
                write!(f, " {}", imm)?;
            }
            if let Some(callee) = inst.callee() {
                write!(f, " <{} slots>", callee.slots())?;
            }
            writeln!(f)?;
            at += inst.op().width();
        }
        Ok(())
    }
}
