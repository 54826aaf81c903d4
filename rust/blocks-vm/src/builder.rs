//! Append-only program builder.
//!
//! Every emit appends exactly one [`Record`] (a call appends its result
//! slots too) and returns a handle to the new slot. Nothing is ever removed
//! or rewritten before [`Builder::ret`] consumes the builder.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::inst::{Imm, Op, Record};
use crate::program::Program;
use crate::value::{Brand, Val, Val4, ARGS, RESERVED, RETURNS};

/// In-progress program. Only reachable through [`Program::build`].
pub struct Builder<'id> {
    pub(crate) records: Vec<Record>,
    _brand: Brand<'id>,
}

#[inline]
fn is_pow2_or_zero(x: usize) -> bool {
    x & x.wrapping_sub(1) == 0
}

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $name:ident => $op:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, x: Val<'id>, y: Val<'id>) -> Val<'id> {
                self.push(Record::new($op).with_args(&[x.slot(), y.slot()]))
            }
        )*
    };
}

impl<'id> Builder<'id> {
    pub(crate) fn new() -> Self {
        let mut records = Vec::with_capacity(RESERVED);
        records.resize(RESERVED, Record::NOP);
        Builder {
            records,
            _brand: PhantomData,
        }
    }

    /// Number of slots produced so far, reserved slots included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// A builder always holds its reserved slots.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// The reserved always-zero slot.
    pub fn nil(&self) -> Val<'id> {
        Val::new(0)
    }

    /// Handle to the `i`-th formal argument.
    ///
    /// # Panics
    /// Panics if `i` is not below the argument count (4).
    pub fn arg(&self, i: usize) -> Val<'id> {
        assert!(i < ARGS, "argument index {} out of range (max {})", i, ARGS - 1);
        Val::new(RETURNS + i)
    }

    pub(crate) fn push(&mut self, record: Record) -> Val<'id> {
        let width = record.op.width();
        let slot = self.records.len();
        for i in 0..width {
            self.grow();
            self.records
                .push(if i == 0 { record.clone() } else { Record::NOP });
        }
        Val::new(slot)
    }

    /// Double the backing capacity each time the count reaches a power of two.
    fn grow(&mut self) {
        let len = self.records.len();
        if is_pow2_or_zero(len) && self.records.capacity() <= len {
            self.records.reserve_exact(len.max(1));
        }
    }

    // ── Constants and memory ────────────────────────────────────────────

    /// Broadcast an integer constant to every lane.
    pub fn splat(&mut self, imm: i32) -> Val<'id> {
        self.push(Record::new(Op::Splat).with_imm(Imm::Int(imm)))
    }

    pub fn splat_i32(&mut self, imm: i32) -> Val<'id> {
        self.splat(imm)
    }

    pub fn splat_u32(&mut self, imm: u32) -> Val<'id> {
        self.push(Record::new(Op::Splat).with_imm(Imm::Uint(imm)))
    }

    pub fn splat_f32(&mut self, imm: f32) -> Val<'id> {
        self.push(Record::new(Op::Splat).with_imm(Imm::Float(imm)))
    }

    /// Broadcast element `off` of side-table buffer `ptr` to every lane.
    pub fn load_uniform(&mut self, ptr: usize, off: u32) -> Val<'id> {
        self.push(
            Record::new(Op::LoadUniform)
                .with_ptr(ptr)
                .with_imm(Imm::Uint(off)),
        )
    }

    /// Load the current lane-chunk of side-table buffer `ptr`.
    pub fn load_varying(&mut self, ptr: usize) -> Val<'id> {
        self.push(Record::new(Op::LoadVarying).with_ptr(ptr))
    }

    /// Store `x` into the current lane-chunk of side-table buffer `ptr`.
    pub fn store_varying(&mut self, ptr: usize, x: Val<'id>) {
        self.push(
            Record::new(Op::StoreVarying)
                .with_ptr(ptr)
                .with_args(&[x.slot()]),
        );
    }

    // ── Arithmetic ──────────────────────────────────────────────────────

    binary_ops! {
        fadd => Op::Fadd;
        fsub => Op::Fsub;
        fmul => Op::Fmul;
        fdiv => Op::Fdiv;
    }

    /// Fused `x * y + z`.
    pub fn fmad(&mut self, x: Val<'id>, y: Val<'id>, z: Val<'id>) -> Val<'id> {
        self.push(Record::new(Op::Fmad).with_args(&[x.slot(), y.slot(), z.slot()]))
    }

    // ── Comparison ──────────────────────────────────────────────────────

    binary_ops! {
        feq => Op::Feq;
        fne => Op::Fne;
        flt => Op::Flt;
        fle => Op::Fle;
        fgt => Op::Fgt;
        fge => Op::Fge;
    }

    // ── Bitwise ─────────────────────────────────────────────────────────

    binary_ops! {
        band => Op::Band;
        bor => Op::Bor;
        bxor => Op::Bxor;
    }

    /// Per-bit select: bits of `y` where `mask` is set, bits of `z` elsewhere.
    pub fn bsel(&mut self, mask: Val<'id>, y: Val<'id>, z: Val<'id>) -> Val<'id> {
        self.push(Record::new(Op::Bsel).with_args(&[mask.slot(), y.slot(), z.slot()]))
    }

    // ── Shifts ──────────────────────────────────────────────────────────

    binary_ops! {
        /// Logical left shift; the amount is taken modulo 32.
        shl => Op::Shl;
        /// Logical right shift; the amount is taken modulo 32.
        shr => Op::Shr;
        /// Arithmetic right shift; the amount is taken modulo 32.
        sra => Op::Sra;
    }

    // ── Sub-programs ────────────────────────────────────────────────────

    /// Call a finalized program with four arguments, yielding its four
    /// results. Unused arguments are usually [`Builder::nil`].
    pub fn call(
        &mut self,
        program: &Arc<Program>,
        x: Val<'id>,
        y: Val<'id>,
        z: Val<'id>,
        w: Val<'id>,
    ) -> Val4<'id> {
        let mut record =
            Record::new(Op::Call).with_args(&[x.slot(), y.slot(), z.slot(), w.slot()]);
        record.call = Some(Arc::clone(program));
        let base = self.push(record).slot();
        Val4::new(
            Val::new(base),
            Val::new(base + 1),
            Val::new(base + 2),
            Val::new(base + 3),
        )
    }
}
