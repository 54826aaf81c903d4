//! Comparison-driven kernels: selection by lane masks.

use std::sync::Arc;

use blocks_vm::Program;

/// The smaller of `x` and `y`; `y` when they compare unordered.
pub fn min() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let lt = b.flt(x, y);
        let r = b.bsel(lt, x, y);
        b.ret(r)
    })
}

/// The larger of `x` and `y`; `x` when they compare unordered.
pub fn max() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let lt = b.flt(x, y);
        let r = b.bsel(lt, y, x);
        b.ret(r)
    })
}

/// Two results: `(min(x, y), max(x, y))`.
pub fn sort_pair_with(min: &Arc<Program>, max: &Arc<Program>) -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let nil = b.nil();
        let lo = b.call(min, x, y, nil, nil);
        let hi = b.call(max, x, y, nil, nil);
        b.ret4([lo.x, hi.x, nil, nil].into())
    })
}

pub fn sort_pair() -> Arc<Program> {
    sort_pair_with(&min(), &max())
}

/// `x` limited to `[lo, hi]`, arguments `(x, lo, hi)`.
pub fn clamp_with(min: &Arc<Program>, max: &Arc<Program>) -> Arc<Program> {
    Program::build(|mut b| {
        let (x, lo, hi) = (b.arg(0), b.arg(1), b.arg(2));
        let nil = b.nil();
        let floor = b.call(max, x, lo, nil, nil);
        let r = b.call(min, floor.x, hi, nil, nil);
        b.ret(r.x)
    })
}

pub fn clamp() -> Arc<Program> {
    clamp_with(&min(), &max())
}
