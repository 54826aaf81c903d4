//! Stage bodies and the threaded dispatch chain.
//!
//! Every instruction carries a [`Stage`] function pointer resolved at
//! finalization. A stage computes its value into the register slot at the
//! cursor, then hands control straight to the next instruction by reporting
//! how many slots it produced; `ret` ends the chain for the current
//! lane-chunk. There is no opcode decode anywhere on the execution path.
//!
//! The lane-progress marker `end` tells memory stages which lanes they
//! cover: a multiple of [`K`] means the full chunk `end - K..end`, anything
//! else means the single remainder lane `end - 1`.

use crate::binding::SideTable;
use crate::frame::Arena;
use crate::inst::{Inst, Op};
use crate::lanes::{Lanes, K};
use crate::program::Program;
use crate::value::{RESERVED, RETURNS};

/// Per-execution state threaded through every stage.
pub(crate) struct Context<'t, 'a> {
    pub(crate) table: &'t mut SideTable<'a>,
    pub(crate) arena: &'t mut Arena,
}

/// What the chain does after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Continue with the next instruction, advancing the cursor by this many slots.
    Next(usize),
    /// The program's `ret` fired.
    Return,
}

/// Executor for one opcode: remaining instruction stream, register file,
/// register cursor, lane-progress marker, execution context.
pub(crate) type Stage =
    fn(ip: &[Inst], v: &mut [Lanes], at: usize, end: usize, cx: &mut Context<'_, '_>) -> Flow;

/// Drive `program` over one lane-chunk in the register file `v`.
#[inline]
pub(crate) fn run(program: &Program, v: &mut [Lanes], end: usize, cx: &mut Context<'_, '_>) {
    let code = program.instructions();
    let mut ip = 0;
    let mut at = program.entry();
    loop {
        let rest = &code[ip..];
        match (rest[0].stage)(rest, v, at, end, cx) {
            Flow::Next(produced) => {
                ip += 1;
                at += produced;
            }
            Flow::Return => return,
        }
    }
}

pub(crate) fn stage_for(op: Op) -> Stage {
    match op {
        Op::Nop => nop,
        Op::Splat => splat,
        Op::LoadUniform => load_uniform,
        Op::LoadVarying => load_varying,
        Op::StoreVarying => store_varying,
        Op::Fadd => fadd,
        Op::Fsub => fsub,
        Op::Fmul => fmul,
        Op::Fdiv => fdiv,
        Op::Fmad => fmad,
        Op::Feq => feq,
        Op::Fne => fne,
        Op::Flt => flt,
        Op::Fle => fle,
        Op::Fgt => fgt,
        Op::Fge => fge,
        Op::Band => band,
        Op::Bor => bor,
        Op::Bxor => bxor,
        Op::Bsel => bsel,
        Op::Shl => shl,
        Op::Shr => shr,
        Op::Sra => sra,
        Op::Call => call,
        Op::Ret => ret,
    }
}

/// True when `end` marks a single remainder lane rather than a full chunk.
#[inline(always)]
fn is_tail(end: usize) -> bool {
    end & (K - 1) != 0
}

fn nop(_: &[Inst], _: &mut [Lanes], _: usize, _: usize, _: &mut Context<'_, '_>) -> Flow {
    Flow::Next(1)
}

// ── Constants and memory ────────────────────────────────────────────────

fn splat(ip: &[Inst], v: &mut [Lanes], at: usize, _: usize, _: &mut Context<'_, '_>) -> Flow {
    v[at] = Lanes::splat(ip[0].imm.bits());
    Flow::Next(1)
}

fn load_uniform(
    ip: &[Inst],
    v: &mut [Lanes],
    at: usize,
    _: usize,
    cx: &mut Context<'_, '_>,
) -> Flow {
    let inst = &ip[0];
    let buf = cx.table.binding(inst.ptr()).elements();
    v[at] = Lanes::splat(buf[inst.imm.bits() as usize]);
    Flow::Next(1)
}

fn load_varying(
    ip: &[Inst],
    v: &mut [Lanes],
    at: usize,
    end: usize,
    cx: &mut Context<'_, '_>,
) -> Flow {
    let buf = cx.table.binding(ip[0].ptr()).elements();
    let mut lanes = [0u32; K];
    if is_tail(end) {
        lanes[0] = buf[end - 1];
    } else {
        lanes.copy_from_slice(&buf[end - K..end]);
    }
    v[at] = Lanes(lanes);
    Flow::Next(1)
}

fn store_varying(
    ip: &[Inst],
    v: &mut [Lanes],
    at: usize,
    end: usize,
    cx: &mut Context<'_, '_>,
) -> Flow {
    let inst = &ip[0];
    let x = v[inst.arg(0, at)].0;
    let buf = cx.table.binding_mut(inst.ptr()).elements_mut();
    if is_tail(end) {
        buf[end - 1] = x[0];
    } else {
        buf[end - K..end].copy_from_slice(&x);
    }
    Flow::Next(1)
}

// ── Lane-wise arithmetic, comparison, bitwise ───────────────────────────

macro_rules! binary_stage {
    ($($name:ident = $method:ident(|$a:ident, $b:ident| $body:expr);)*) => {
        $(
            fn $name(
                ip: &[Inst],
                v: &mut [Lanes],
                at: usize,
                _: usize,
                _: &mut Context<'_, '_>,
            ) -> Flow {
                let inst = &ip[0];
                let (x, y) = (v[inst.arg(0, at)], v[inst.arg(1, at)]);
                v[at] = x.$method(y, |$a, $b| $body);
                Flow::Next(1)
            }
        )*
    };
}

binary_stage! {
    fadd = zip_f32(|a, b| a + b);
    fsub = zip_f32(|a, b| a - b);
    fmul = zip_f32(|a, b| a * b);
    fdiv = zip_f32(|a, b| a / b);

    feq = mask_f32(|a, b| a == b);
    fne = mask_f32(|a, b| a != b);
    flt = mask_f32(|a, b| a < b);
    fle = mask_f32(|a, b| a <= b);
    fgt = mask_f32(|a, b| a > b);
    fge = mask_f32(|a, b| a >= b);

    band = zip_u32(|a, b| a & b);
    bor = zip_u32(|a, b| a | b);
    bxor = zip_u32(|a, b| a ^ b);

    shl = zip_u32(|a, b| a.wrapping_shl(b));
    shr = zip_u32(|a, b| a.wrapping_shr(b));
    sra = zip_u32(|a, b| (a as i32).wrapping_shr(b) as u32);
}

fn fmad(ip: &[Inst], v: &mut [Lanes], at: usize, _: usize, _: &mut Context<'_, '_>) -> Flow {
    let inst = &ip[0];
    let x = v[inst.arg(0, at)].f32s();
    let y = v[inst.arg(1, at)].f32s();
    let z = v[inst.arg(2, at)].f32s();
    v[at] = Lanes::from_f32([0, 1, 2, 3].map(|i| x[i].mul_add(y[i], z[i])));
    Flow::Next(1)
}

fn bsel(ip: &[Inst], v: &mut [Lanes], at: usize, _: usize, _: &mut Context<'_, '_>) -> Flow {
    let inst = &ip[0];
    let m = v[inst.arg(0, at)].0;
    let y = v[inst.arg(1, at)].0;
    let z = v[inst.arg(2, at)].0;
    v[at] = Lanes([0, 1, 2, 3].map(|i| (m[i] & y[i]) | (!m[i] & z[i])));
    Flow::Next(1)
}

// ── Sub-programs ────────────────────────────────────────────────────────

/// Run the embedded callee in a fresh zeroed frame for this lane-chunk.
fn call(ip: &[Inst], v: &mut [Lanes], at: usize, end: usize, cx: &mut Context<'_, '_>) -> Flow {
    let inst = &ip[0];
    if let Some(callee) = inst.call.as_deref() {
        let args = [0, 1, 2, 3].map(|i| v[inst.arg(i, at)]);
        let mut frame = cx.arena.checkout(callee.slots());
        frame[RETURNS..RESERVED].copy_from_slice(&args);
        run(callee, &mut frame, end, cx);
        v[at..at + RETURNS].copy_from_slice(&frame[..RETURNS]);
        cx.arena.release(frame);
    }
    Flow::Next(Op::Call.width())
}

/// Copy the results into the reserved return slots and end the chain.
fn ret(ip: &[Inst], v: &mut [Lanes], at: usize, _: usize, _: &mut Context<'_, '_>) -> Flow {
    let inst = &ip[0];
    let results = [0, 1, 2, 3].map(|i| v[inst.arg(i, at)]);
    let base = (at as isize + inst.imm.bits() as i32 as isize) as usize;
    v[base..base + RETURNS].copy_from_slice(&results);
    Flow::Return
}
