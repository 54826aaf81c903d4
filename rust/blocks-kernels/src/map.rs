//! Drivers that run a kernel over side-table buffers.
//!
//! Each driver loads its inputs with varying loads, calls the kernel with
//! nil in the unused argument slots, and stores the results. Buffer
//! arguments are side-table indices; an output may alias an input for
//! in-place updates.

use std::sync::Arc;

use blocks_vm::Program;

/// `out[i] = kernel(input[i])`
pub fn map_unary(kernel: &Arc<Program>, out: usize, input: usize) -> Arc<Program> {
    Program::build(|mut b| {
        let x = b.load_varying(input);
        let nil = b.nil();
        let r = b.call(kernel, x, nil, nil, nil);
        b.store_varying(out, r.x);
        b.ret(nil)
    })
}

/// `out[i] = kernel(x[i], y[i])`
pub fn map_binary(kernel: &Arc<Program>, out: usize, x: usize, y: usize) -> Arc<Program> {
    Program::build(|mut b| {
        let xv = b.load_varying(x);
        let yv = b.load_varying(y);
        let nil = b.nil();
        let r = b.call(kernel, xv, yv, nil, nil);
        b.store_varying(out, r.x);
        b.ret(nil)
    })
}

/// `(out.0[i], out.1[i]) = kernel(x[i], y[i])` for a two-result kernel.
pub fn map_pair(
    kernel: &Arc<Program>,
    out: (usize, usize),
    x: usize,
    y: usize,
) -> Arc<Program> {
    Program::build(|mut b| {
        let xv = b.load_varying(x);
        let yv = b.load_varying(y);
        let nil = b.nil();
        let r = b.call(kernel, xv, yv, nil, nil);
        b.store_varying(out.0, r.x);
        b.store_varying(out.1, r.y);
        b.ret(nil)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::add;

    #[test]
    fn test_map_binary_summarizes_buffers() {
        let p = map_binary(&add(), 2, 0, 1);
        let uses = p.bindings();
        assert_eq!(uses.required_len(), 3);
        assert!(uses.get(0).varying_read && !uses.get(0).varying_write);
        assert!(uses.get(1).varying_read);
        assert!(uses.get(2).varying_write && !uses.get(2).varying_read);
    }

    #[test]
    fn test_map_pair_in_place() {
        let p = map_pair(&crate::compare::sort_pair(), (0, 1), 0, 1);
        let uses = p.bindings();
        assert_eq!(uses.required_len(), 2);
        assert!(uses.get(0).varying_read && uses.get(0).varying_write);
        assert!(uses.get(1).varying_read && uses.get(1).varying_write);
    }
}
