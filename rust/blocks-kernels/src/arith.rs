//! Arithmetic kernels.

use std::sync::Arc;

use blocks_vm::Program;

/// `x + y`
pub fn add() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let s = b.fadd(x, y);
        b.ret(s)
    })
}

/// `3 * x`, computed as three calls to `add`. The first call adds nil, so it
/// only copies `x` through a frame.
pub fn triple_with(add: &Arc<Program>) -> Arc<Program> {
    Program::build(|mut b| {
        let x = b.arg(0);
        let nil = b.nil();
        let once = b.call(add, x, nil, nil, nil);
        let twice = b.call(add, once.x, x, nil, nil);
        let thrice = b.call(add, twice.x, x, nil, nil);
        b.ret(thrice.x)
    })
}

pub fn triple() -> Arc<Program> {
    triple_with(&add())
}

/// `a + t * (b - a)` with arguments `(a, b, t)`.
pub fn lerp() -> Arc<Program> {
    Program::build(|mut b| {
        let (a, to, t) = (b.arg(0), b.arg(1), b.arg(2));
        let span = b.fsub(to, a);
        let r = b.fmad(t, span, a);
        b.ret(r)
    })
}

/// `|x|` by clearing the sign bit.
pub fn abs() -> Arc<Program> {
    Program::build(|mut b| {
        let x = b.arg(0);
        let mask = b.splat_u32(0x7FFF_FFFF);
        let r = b.band(x, mask);
        b.ret(r)
    })
}
