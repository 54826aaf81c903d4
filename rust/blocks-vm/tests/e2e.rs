//! End-to-end tests: build kernels, run them over buffers, check the output.

use std::sync::Arc;

use blocks_vm::{execute, ExecError, Executor, Op, Program, SideTable, RESERVED};

fn add() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let s = b.fadd(x, y);
        b.ret(s)
    })
}

/// out[i] = f(in[i]) for a one-argument kernel `f`.
fn map_unary(kernel: &Arc<Program>, out: usize, input: usize) -> Arc<Program> {
    Program::build(|mut b| {
        let v = b.load_varying(input);
        let nil = b.nil();
        let r = b.call(kernel, v, nil, nil, nil);
        b.store_varying(out, r.x);
        b.ret(nil)
    })
}

// ─── Calls ──────────────────────────────────────────────────────────────

#[test]
fn triple_through_three_calls() {
    let add = add();
    let triple = Program::build(|mut b| {
        let x = b.arg(0);
        let nil = b.nil();
        let once = b.call(&add, x, nil, nil, nil);
        let twice = b.call(&add, once.x, x, nil, nil);
        let thrice = b.call(&add, twice.x, x, nil, nil);
        b.ret(thrice.x)
    });
    let map_triple = map_unary(&triple, 0, 1);

    let x: Vec<f32> = (1..=10).map(|i| i as f32).collect();
    let mut y = vec![0.0f32; x.len()];
    let mut table = SideTable::new().write(&mut y[..]).read(&x[..]);
    execute(&map_triple, x.len(), &mut table).unwrap();
    drop(table);

    for (i, (&xi, &yi)) in x.iter().zip(&y).enumerate() {
        assert_eq!(xi, (i + 1) as f32);
        assert_eq!(yi, 3.0 * (i + 1) as f32);
    }
}

fn min() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let lt = b.flt(x, y);
        let m = b.bsel(lt, x, y);
        b.ret(m)
    })
}

fn max() -> Arc<Program> {
    Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let lt = b.flt(x, y);
        let m = b.bsel(lt, y, x);
        b.ret(m)
    })
}

#[test]
fn sort_pair_in_place_matches_fixture() {
    let (min, max) = (min(), max());
    let sort_pair = Program::build(|mut b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let nil = b.nil();
        let lo = b.call(&min, x, y, nil, nil);
        let hi = b.call(&max, x, y, nil, nil);
        b.ret4([lo.x, hi.x, nil, nil].into())
    });
    let map_sort = Program::build(|mut b| {
        let x = b.load_varying(0);
        let y = b.load_varying(1);
        let nil = b.nil();
        let r = b.call(&sort_pair, x, y, nil, nil);
        b.store_varying(0, r.x);
        b.store_varying(1, r.y);
        b.ret(nil)
    });

    let mut x = [1.0f32, 4., 5., 8., 9., 3., 4., 7., 8., 2.];
    let mut y = [2.0f32, 3., 6., 7., 1., 2., 5., 6., 9., 1.];
    let mut table = SideTable::new().write(&mut x[..]).write(&mut y[..]);
    execute(&map_sort, 10, &mut table).unwrap();
    drop(table);

    assert_eq!(x, [1.0, 3., 5., 7., 1., 2., 4., 6., 8., 1.]);
    assert_eq!(y, [2.0, 4., 6., 8., 9., 3., 5., 7., 9., 2.]);
}

#[test]
fn nested_calls_three_deep() {
    let add = add();
    let add3 = Program::build(|mut b| {
        let (x, y, z) = (b.arg(0), b.arg(1), b.arg(2));
        let nil = b.nil();
        let xy = b.call(&add, x, y, nil, nil);
        let xyz = b.call(&add, xy.x, z, nil, nil);
        b.ret(xyz.x)
    });
    let add4 = Program::build(|mut b| {
        let (x, y, z, w) = (b.arg(0), b.arg(1), b.arg(2), b.arg(3));
        let nil = b.nil();
        let xyz = b.call(&add3, x, y, z, nil);
        let all = b.call(&add, xyz.x, w, nil, nil);
        b.ret(all.x)
    });
    let driver = Program::build(|mut b| {
        let a = b.load_varying(1);
        let one = b.splat_f32(1.0);
        let ten = b.splat_f32(10.0);
        let hundred = b.splat_f32(100.0);
        let r = b.call(&add4, a, one, ten, hundred);
        b.store_varying(0, r.x);
        let nil = b.nil();
        b.ret(nil)
    });

    let input = [0.0f32, 1., 2., 3., 4., 5., 6.];
    let mut out = [0.0f32; 7];
    let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
    execute(&driver, 7, &mut table).unwrap();
    drop(table);
    assert_eq!(out, [111.0, 112., 113., 114., 115., 116., 117.]);
}

#[test]
fn callee_memory_uses_global_indices() {
    // The callee stores directly into buffer 0; the caller never touches it.
    let store_double = Program::build(|mut b| {
        let x = b.arg(0);
        let d = b.fadd(x, x);
        b.store_varying(0, d);
        let nil = b.nil();
        b.ret(nil)
    });
    let driver = Program::build(|mut b| {
        let v = b.load_varying(1);
        let nil = b.nil();
        b.call(&store_double, v, nil, nil, nil);
        b.ret(nil)
    });
    assert!(driver.bindings().get(0).varying_write);

    let input = [1.0f32, 2., 3., 4., 5.];
    let mut out = [0.0f32; 5];
    let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
    execute(&driver, 5, &mut table).unwrap();
    drop(table);
    assert_eq!(out, [2.0, 4., 6., 8., 10.]);
}

// ─── Nil ────────────────────────────────────────────────────────────────

#[test]
fn nil_reads_zero_in_every_chunk() {
    // Returning a live value pollutes slot 0 at the end of each chunk; the
    // next chunk must still read nil as zero.
    let p = Program::build(|mut b| {
        let v = b.load_varying(1);
        let nil = b.nil();
        let s = b.fadd(v, nil);
        b.store_varying(0, s);
        b.ret(v)
    });
    let input = [1.0f32, 2., 3., 4., 5., 6., 7., 8., 9.];
    let mut out = [0.0f32; 9];
    let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
    execute(&p, 9, &mut table).unwrap();
    drop(table);
    assert_eq!(out, input);
}

#[test]
fn nil_arguments_do_not_perturb_results() {
    let weighted = Program::build(|mut b| {
        let (x, y, z, w) = (b.arg(0), b.arg(1), b.arg(2), b.arg(3));
        let xy = b.fadd(x, y);
        let zw = b.fadd(z, w);
        let s = b.fadd(xy, zw);
        b.ret4([s, z, w, x].into())
    });
    let driver = Program::build(|mut b| {
        let v = b.load_varying(1);
        let nil = b.nil();
        let r = b.call(&weighted, v, v, nil, nil);
        b.store_varying(0, r.x);
        b.store_varying(2, r.y);
        b.store_varying(3, r.z);
        b.ret(nil)
    });
    let input = [1.5f32, -2., 4., 0.25, 8.];
    let mut sum = [9.0f32; 5];
    let mut z = [9.0f32; 5];
    let mut w = [9.0f32; 5];
    let mut table = SideTable::new()
        .write(&mut sum[..])
        .read(&input[..])
        .write(&mut z[..])
        .write(&mut w[..]);
    execute(&driver, 5, &mut table).unwrap();
    drop(table);
    assert_eq!(sum, [3.0, -4., 8., 0.5, 16.]);
    assert_eq!(z, [0.0; 5]);
    assert_eq!(w, [0.0; 5]);
}

// ─── Finalization properties ────────────────────────────────────────────

fn kernel_with_slots(trace: &mut Vec<(Op, Vec<usize>)>) -> Arc<Program> {
    let add = add();
    Program::build(|mut b| {
        let x = b.load_varying(0);
        let k = b.splat_f32(2.0);
        let m = b.fmul(x, k);
        let nil = b.nil();
        let r = b.call(&add, m, x, nil, nil);
        let lt = b.flt(r.x, k);
        let sel = b.bsel(lt, r.x, m);
        b.store_varying(1, sel);
        trace.push((Op::LoadVarying, vec![]));
        trace.push((Op::Splat, vec![]));
        trace.push((Op::Fmul, vec![x.slot(), k.slot()]));
        trace.push((Op::Call, vec![m.slot(), x.slot(), 0, 0]));
        trace.push((Op::Flt, vec![r.x.slot(), k.slot()]));
        trace.push((Op::Bsel, vec![lt.slot(), r.x.slot(), m.slot()]));
        trace.push((Op::StoreVarying, vec![sel.slot()]));
        trace.push((Op::Ret, vec![0, 0, 0, 0]));
        b.ret(nil)
    })
}

#[test]
fn finalization_is_deterministic() {
    // Callees compare by identity, so share one build of `add`.
    let add = add();
    let build = || {
        Program::build(|mut b| {
            let v = b.load_varying(0);
            let nil = b.nil();
            let r = b.call(&add, v, v, nil, nil);
            let h = b.splat_f32(0.5);
            let s = b.fmul(r.x, h);
            b.store_varying(1, s);
            b.ret(nil)
        })
    };
    let (a, b) = (build(), build());
    assert_eq!(*a, *b);
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn offsets_resolve_to_original_slots() {
    let mut trace = Vec::new();
    let p = kernel_with_slots(&mut trace);
    assert_eq!(p.len(), trace.len());

    let mut at = p.entry();
    assert_eq!(at, RESERVED);
    for (inst, (op, targets)) in p.instructions().iter().zip(&trace) {
        assert_eq!(inst.op(), *op);
        let resolved: Vec<usize> = inst
            .args()
            .iter()
            .map(|&off| (at as isize + off as isize) as usize)
            .collect();
        assert_eq!(&resolved, targets, "operands of {} at slot {}", op, at);
        at += op.width();
    }
    assert_eq!(at, p.slots());
}

#[test]
fn dead_slots_are_dropped() {
    let mut trace = Vec::new();
    let p = kernel_with_slots(&mut trace);
    // 7 productive emissions plus the synthetic ret
    assert_eq!(p.len(), 7 + 1);
    // the call's three trailing slots still count toward the register file
    assert_eq!(p.slots(), RESERVED + 7 + 3 + 1);
    assert!(p.instructions().iter().all(|i| i.op() != Op::Nop));
}

// ─── Lane coverage ──────────────────────────────────────────────────────

#[test]
fn lengths_not_divisible_by_four() {
    let square = Program::build(|mut b| {
        let v = b.load_varying(1);
        let s = b.fmul(v, v);
        b.store_varying(0, s);
        let nil = b.nil();
        b.ret(nil)
    });
    for n in [0usize, 1, 2, 3, 4, 5, 7, 10, 17, 64, 65] {
        let input: Vec<f32> = (0..n).map(|i| i as f32 - 3.0).collect();
        let mut out = vec![-1.0f32; n];
        let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
        execute(&square, n, &mut table).unwrap();
        drop(table);
        let expected: Vec<f32> = input.iter().map(|x| x * x).collect();
        assert_eq!(out, expected, "n = {}", n);
    }
}

#[test]
fn remainder_lane_sees_only_its_element() {
    // A lane index kernel: out[i] = in[i] + uniform[0]; n = 6 covers one
    // full chunk and two single-lane tails.
    let p = Program::build(|mut b| {
        let v = b.load_varying(1);
        let k = b.load_uniform(2, 0);
        let s = b.fadd(v, k);
        b.store_varying(0, s);
        let nil = b.nil();
        b.ret(nil)
    });
    let input = [10.0f32, 20., 30., 40., 50., 60., 70.];
    let bias = [0.5f32];
    let mut out = [0.0f32; 7];
    let mut table = SideTable::new()
        .write(&mut out[..])
        .read(&input[..])
        .read(&bias[..]);
    execute(&p, 6, &mut table).unwrap();
    drop(table);
    assert_eq!(out, [10.5, 20.5, 30.5, 40.5, 50.5, 60.5, 0.0]);
}

// ─── Opcodes ────────────────────────────────────────────────────────────

#[test]
fn float_arithmetic_and_fmad() {
    let p = Program::build(|mut b| {
        let x = b.load_varying(0);
        let y = b.load_varying(1);
        let s = b.fsub(x, y);
        let d = b.fdiv(s, y);
        let m = b.fmad(d, x, y);
        b.store_varying(2, m);
        let nil = b.nil();
        b.ret(nil)
    });
    let x = [3.0f32, 8., 1., 6., 9.];
    let y = [1.0f32, 2., 4., 3., 3.];
    let mut out = [0.0f32; 5];
    let mut table = SideTable::new()
        .read(&x[..])
        .read(&y[..])
        .write(&mut out[..]);
    execute(&p, 5, &mut table).unwrap();
    drop(table);
    let expected: Vec<f32> = x
        .iter()
        .zip(&y)
        .map(|(&x, &y)| ((x - y) / y).mul_add(x, y))
        .collect();
    assert_eq!(out.to_vec(), expected);
}

#[test]
fn comparisons_produce_lane_masks() {
    let cmp = |op: Op| {
        Program::build(move |mut b| {
            let x = b.load_varying(0);
            let y = b.load_varying(1);
            let m = match op {
                Op::Feq => b.feq(x, y),
                Op::Fne => b.fne(x, y),
                Op::Flt => b.flt(x, y),
                Op::Fle => b.fle(x, y),
                Op::Fgt => b.fgt(x, y),
                _ => b.fge(x, y),
            };
            b.store_varying(2, m);
            let nil = b.nil();
            b.ret(nil)
        })
    };
    let x = [1.0f32, 2., 3., f32::NAN, 5.];
    let y = [2.0f32, 2., 1., f32::NAN, 5.];
    let t = u32::MAX;
    let cases = [
        (Op::Feq, [0, t, 0, 0, t]),
        (Op::Fne, [t, 0, t, t, 0]),
        (Op::Flt, [t, 0, 0, 0, 0]),
        (Op::Fle, [t, t, 0, 0, t]),
        (Op::Fgt, [0, 0, t, 0, 0]),
        (Op::Fge, [0, t, t, 0, t]),
    ];
    for (op, expected) in cases {
        let p = cmp(op);
        let mut out = [7u32; 5];
        let mut table = SideTable::new()
            .read(&x[..])
            .read(&y[..])
            .write(&mut out[..]);
        execute(&p, 5, &mut table).unwrap();
        drop(table);
        assert_eq!(out, expected, "{}", op);
    }
}

#[test]
fn bitwise_and_shifts() {
    let p = Program::build(|mut b| {
        let x = b.load_varying(0);
        let y = b.load_varying(1);
        let and = b.band(x, y);
        let or = b.bor(x, y);
        let xor = b.bxor(x, y);
        let three = b.splat(3);
        let shl = b.shl(x, three);
        let shr = b.shr(x, three);
        let sra = b.sra(x, three);
        let wide = b.splat(33);
        let masked = b.shl(x, wide);
        b.store_varying(2, and);
        b.store_varying(3, or);
        b.store_varying(4, xor);
        b.store_varying(5, shl);
        b.store_varying(6, shr);
        b.store_varying(7, sra);
        b.store_varying(8, masked);
        let nil = b.nil();
        b.ret(nil)
    });
    let x = [0b1100i32, -16, 1, i32::MIN, 7];
    let y = [0b1010i32, 0xFF, -1, 1, 0];
    let mut outs = vec![[0i32; 5]; 7];
    let mut table = SideTable::new().read(&x[..]).read(&y[..]);
    for out in outs.iter_mut() {
        table.push(blocks_vm::Binding::write(&mut out[..]));
    }
    execute(&p, 5, &mut table).unwrap();
    drop(table);

    for i in 0..5 {
        assert_eq!(outs[0][i], x[i] & y[i]);
        assert_eq!(outs[1][i], x[i] | y[i]);
        assert_eq!(outs[2][i], x[i] ^ y[i]);
        assert_eq!(outs[3][i], ((x[i] as u32) << 3) as i32);
        assert_eq!(outs[4][i], ((x[i] as u32) >> 3) as i32);
        assert_eq!(outs[5][i], x[i] >> 3);
        assert_eq!(outs[6][i], ((x[i] as u32) << 1) as i32);
    }
}

#[test]
fn splat_forms_share_bits() {
    let p = Program::build(|mut b| {
        let f = b.splat_f32(-1.5);
        let u = b.splat_u32(0xDEAD_BEEF);
        let i = b.splat_i32(-2);
        b.store_varying(0, f);
        b.store_varying(1, u);
        b.store_varying(2, i);
        let nil = b.nil();
        b.ret(nil)
    });
    let mut f = [0.0f32; 3];
    let mut u = [0u32; 3];
    let mut i = [0i32; 3];
    let mut table = SideTable::new()
        .write(&mut f[..])
        .write(&mut u[..])
        .write(&mut i[..]);
    execute(&p, 3, &mut table).unwrap();
    drop(table);
    assert_eq!(f, [-1.5; 3]);
    assert_eq!(u, [0xDEAD_BEEF; 3]);
    assert_eq!(i, [-2; 3]);
}

// ─── Execution surface ──────────────────────────────────────────────────

#[test]
fn read_only_store_is_rejected() {
    let p = map_unary(&add(), 0, 1);
    let out = [0.0f32; 4];
    let input = [1.0f32; 4];
    let mut table = SideTable::new().read(&out[..]).read(&input[..]);
    assert_eq!(
        execute(&p, 4, &mut table),
        Err(ExecError::ReadOnlyBinding { index: 0 })
    );
}

#[test]
fn executor_is_reusable() {
    let double = map_unary(&add(), 0, 1);
    let mut exec = Executor::default();
    for n in [3usize, 8, 1] {
        let input: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let mut out = vec![0.0f32; n];
        let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
        exec.run(&double, n, &mut table).unwrap();
        drop(table);
        // `add` receives (x, nil), so the mapped kernel is the identity
        assert_eq!(out, input);
    }
    assert!(exec.stats().scratch > 0);
    assert_eq!(exec.stats().heap_allocs, 0);
}

#[test]
fn concurrent_executions_share_one_program() {
    let add = add();
    let double = Program::build(|mut b| {
        let v = b.load_varying(1);
        let nil = b.nil();
        let r = b.call(&add, v, v, nil, nil);
        b.store_varying(0, r.x);
        b.ret(nil)
    });

    std::thread::scope(|s| {
        for t in 0..4 {
            let double = &double;
            s.spawn(move || {
                let n = 100 + t;
                let input: Vec<f32> = (0..n).map(|i| (i * (t + 1)) as f32).collect();
                let mut out = vec![0.0f32; n];
                let mut table = SideTable::new().write(&mut out[..]).read(&input[..]);
                execute(double, n, &mut table).unwrap();
                drop(table);
                for (o, i) in out.iter().zip(&input) {
                    assert_eq!(*o, 2.0 * i);
                }
            });
        }
    });
}
