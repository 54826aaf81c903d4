//! Instruction records.
//!
//! Each produced value is described by one record: an opcode, up to four
//! operand references, a side-table index, a typed immediate and, for calls,
//! the embedded callee. While building, operands are absolute slots
//! ([`Record`]); after finalization they are signed offsets from the
//! instruction's own slot ([`Inst`]).

use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::program::Program;
use crate::stages::Stage;

/// Opcodes understood by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
    /// Inert placeholder: reserved slots and the trailing slots of a call.
    Nop,

    // Constants and memory
    Splat,
    LoadUniform,
    LoadVarying,
    StoreVarying,

    // Float arithmetic
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Fmad,

    // Float comparison, all-bits mask per lane
    Feq,
    Fne,
    Flt,
    Fle,
    Fgt,
    Fge,

    // Bitwise
    Band,
    Bor,
    Bxor,
    Bsel,

    // Shifts
    Shl,
    Shr,
    Sra,

    // Sub-programs
    Call,
    Ret,
}

impl Op {
    /// Number of operand references the opcode reads.
    pub fn arity(self) -> usize {
        match self {
            Op::Nop | Op::Splat | Op::LoadUniform | Op::LoadVarying => 0,
            Op::StoreVarying => 1,
            Op::Fmad | Op::Bsel => 3,
            Op::Call | Op::Ret => 4,
            _ => 2,
        }
    }

    /// Number of register slots one emission of this opcode occupies.
    pub fn width(self) -> usize {
        match self {
            Op::Call => 4,
            _ => 1,
        }
    }

    /// True if the opcode reads or writes a side-table buffer.
    pub fn touches_memory(self) -> bool {
        matches!(self, Op::LoadUniform | Op::LoadVarying | Op::StoreVarying)
    }
}

/// Typed immediate operand.
#[derive(Debug, Clone, Copy, Default)]
pub enum Imm {
    #[default]
    None,
    Int(i32),
    Uint(u32),
    Float(f32),
}

impl Imm {
    /// Raw 32-bit pattern of the immediate; `None` is zero.
    pub fn bits(self) -> u32 {
        match self {
            Imm::None => 0,
            Imm::Int(i) => i as u32,
            Imm::Uint(u) => u,
            Imm::Float(f) => f.to_bits(),
        }
    }

    fn tag(self) -> u8 {
        match self {
            Imm::None => 0,
            Imm::Int(_) => 1,
            Imm::Uint(_) => 2,
            Imm::Float(_) => 3,
        }
    }
}

// Bitwise equality so a NaN splat still compares equal to itself.
impl PartialEq for Imm {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag() && self.bits() == other.bits()
    }
}

impl Eq for Imm {}

impl fmt::Display for Imm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imm::None => Ok(()),
            Imm::Int(i) => write!(f, "#{}", i),
            Imm::Uint(u) => write!(f, "#{}u", u),
            Imm::Float(x) => write!(f, "#{:?}f", x),
        }
    }
}

/// Builder-side record: operands are absolute slots.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub(crate) op: Op,
    pub(crate) args: [u32; 4],
    pub(crate) ptr: u32,
    pub(crate) imm: Imm,
    pub(crate) call: Option<Arc<Program>>,
}

impl Record {
    pub(crate) const NOP: Record = Record {
        op: Op::Nop,
        args: [0; 4],
        ptr: 0,
        imm: Imm::None,
        call: None,
    };

    pub(crate) fn new(op: Op) -> Self {
        Record {
            op,
            ..Record::NOP
        }
    }

    pub(crate) fn with_args(mut self, args: &[usize]) -> Self {
        for (dst, &slot) in self.args.iter_mut().zip(args) {
            *dst = slot as u32;
        }
        self
    }

    pub(crate) fn with_ptr(mut self, ptr: usize) -> Self {
        self.ptr = ptr as u32;
        self
    }

    pub(crate) fn with_imm(mut self, imm: Imm) -> Self {
        self.imm = imm;
        self
    }
}

/// Finalized instruction: operands are offsets relative to the
/// instruction's own slot in the register file.
#[derive(Clone)]
pub struct Inst {
    pub(crate) stage: Stage,
    pub(crate) op: Op,
    pub(crate) args: [i32; 4],
    pub(crate) ptr: u32,
    pub(crate) imm: Imm,
    pub(crate) call: Option<Arc<Program>>,
}

impl Inst {
    pub fn op(&self) -> Op {
        self.op
    }

    /// Relative operand offsets; only the first [`Op::arity`] are meaningful.
    pub fn args(&self) -> &[i32] {
        &self.args[..self.op.arity()]
    }

    /// Side-table index for memory opcodes.
    pub fn ptr(&self) -> usize {
        self.ptr as usize
    }

    pub fn imm(&self) -> Imm {
        self.imm
    }

    /// Callee embedded by a call instruction.
    pub fn callee(&self) -> Option<&Arc<Program>> {
        self.call.as_ref()
    }

    /// Resolve operand `i` against the slot this instruction executes at.
    #[inline(always)]
    pub(crate) fn arg(&self, i: usize, at: usize) -> usize {
        (at as isize + self.args[i] as isize) as usize
    }
}

impl PartialEq for Inst {
    fn eq(&self, other: &Self) -> bool {
        let same_callee = match (&self.call, &other.call) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.op == other.op
            && self.args == other.args
            && self.ptr == other.ptr
            && self.imm == other.imm
            && same_callee
    }
}

impl Eq for Inst {}

impl fmt::Debug for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inst")
            .field("op", &self.op)
            .field("args", &self.args())
            .field("ptr", &self.ptr)
            .field("imm", &self.imm)
            .field("callee_slots", &self.call.as_ref().map(|p| p.slots()))
            .finish()
    }
}
