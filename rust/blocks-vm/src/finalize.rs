//! Finalization: turning a [`Builder`] into an immutable [`Program`].
//!
//! 1. A synthetic `ret` copies the designated results into slots `0..4`.
//! 2. Placeholder records (reserved slots, trailing call slots) are dropped.
//! 3. Every surviving operand becomes `target - own_slot`.
//! 4. The register-file size stays the original slot count, so the relative
//!    offsets keep resolving even though dead slots have no instruction.

use tracing::debug;

use crate::binding::Bindings;
use crate::builder::Builder;
use crate::inst::{Imm, Inst, Op, Record};
use crate::program::Program;
use crate::stages;
use crate::value::{Val, Val4};

impl<'id> Builder<'id> {
    /// Finalize with a single result; the other return slots receive nil.
    pub fn ret(self, x: Val<'id>) -> Program {
        let nil = self.nil();
        self.ret4(Val4::new(x, nil, nil, nil))
    }

    /// Finalize with up to four results.
    pub fn ret4(mut self, results: Val4<'id>) -> Program {
        let at = self.records.len();
        self.push(
            Record::new(Op::Ret)
                .with_args(&results.slots())
                .with_imm(Imm::Int(-(at as i32))),
        );
        close(self.records)
    }
}

fn close(records: Vec<Record>) -> Program {
    let slots = records.len();
    let mut bindings = Bindings::default();
    let mut code = Vec::with_capacity(slots);
    let mut entry = None;

    for (at, record) in records.into_iter().enumerate() {
        if record.op == Op::Nop {
            continue;
        }
        entry.get_or_insert(at);
        bindings.record(&record);

        let mut args = [0i32; 4];
        for (rel, &abs) in args.iter_mut().zip(&record.args).take(record.op.arity()) {
            *rel = abs as i32 - at as i32;
        }
        code.push(Inst {
            stage: stages::stage_for(record.op),
            op: record.op,
            args,
            ptr: record.ptr,
            imm: record.imm,
            call: record.call,
        });
    }

    // The synthetic ret always survives.
    let entry = entry.unwrap_or(slots - 1);
    debug!(
        slots,
        instructions = code.len(),
        eliminated = slots - code.len(),
        "program finalized"
    );
    Program::new(code.into_boxed_slice(), slots, entry, bindings)
}
