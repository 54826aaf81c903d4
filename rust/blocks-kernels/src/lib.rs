//! Reusable compute kernels for the blocks VM.
//!
//! Each kernel is a finalized [`Program`] that takes its operands in the
//! argument slots and returns its results, so kernels compose through
//! [`Builder::call`](blocks_vm::Builder::call). The `map_*` drivers wrap a
//! kernel in varying loads and stores so it can run over whole buffers.

pub mod arith;
pub mod compare;
pub mod map;

use std::sync::Arc;

use blocks_vm::Program;
use tracing::debug;

pub use arith::{abs, add, lerp, triple, triple_with};
pub use compare::{clamp, clamp_with, max, min, sort_pair, sort_pair_with};
pub use map::{map_binary, map_pair, map_unary};

/// Every kernel in the library, built once with shared callees.
#[derive(Debug, Clone)]
pub struct Kernels {
    pub add: Arc<Program>,
    pub triple: Arc<Program>,
    pub lerp: Arc<Program>,
    pub abs: Arc<Program>,
    pub min: Arc<Program>,
    pub max: Arc<Program>,
    pub clamp: Arc<Program>,
    pub sort_pair: Arc<Program>,
}

impl Kernels {
    pub fn new() -> Self {
        let add = add();
        let min = min();
        let max = max();
        let kernels = Kernels {
            triple: triple_with(&add),
            lerp: lerp(),
            abs: abs(),
            clamp: clamp_with(&min, &max),
            sort_pair: sort_pair_with(&min, &max),
            add,
            min,
            max,
        };
        debug!(
            kernels = 8,
            slots = kernels.iter().map(|(_, p)| p.slots()).sum::<usize>(),
            "kernel library built"
        );
        kernels
    }

    /// Kernels by name.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Arc<Program>)> {
        [
            ("add", &self.add),
            ("triple", &self.triple),
            ("lerp", &self.lerp),
            ("abs", &self.abs),
            ("min", &self.min),
            ("max", &self.max),
            ("clamp", &self.clamp),
            ("sort_pair", &self.sort_pair),
        ]
        .into_iter()
    }
}

impl Default for Kernels {
    fn default() -> Self {
        Self::new()
    }
}
