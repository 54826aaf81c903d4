//! Top-level execution over `n` lanes.

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::binding::SideTable;
use crate::error::ExecError;
use crate::frame::{Arena, ArenaStats};
use crate::lanes::{Lanes, K};
use crate::program::Program;
use crate::stages::{self, Context};
use crate::value::RETURNS;

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Validate the side table against the program's binding summary before
    /// running. When disabled, a mismatched table panics at the first bad
    /// access instead.
    pub check_bindings: bool,
    /// Heap register files kept for reuse after their frame returns.
    pub retained_frames: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            check_bindings: true,
            retained_frames: 8,
        }
    }
}

/// Runs programs, reusing heap register files across runs.
#[derive(Debug)]
pub struct Executor {
    config: ExecConfig,
    arena: Arena,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecConfig::default())
    }
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        let arena = Arena::new(config.retained_frames);
        Self { config, arena }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Where register files have come from so far.
    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Apply `program` to lanes `0..n`. Results are observable only through
    /// the buffers in `table`.
    ///
    /// Full chunks of [`K`] lanes run first with `end = i + K`; the final
    /// `n % K` lanes then run one at a time with `end = i + 1`.
    #[instrument(level = "trace", skip_all, fields(slots = program.slots(), lanes = n))]
    pub fn run(
        &mut self,
        program: &Program,
        n: usize,
        table: &mut SideTable<'_>,
    ) -> Result<(), ExecError> {
        if self.config.check_bindings {
            program.bindings().check(table, n)?;
        }

        let full = n / K * K;
        trace!(chunks = full / K, remainder = n - full, "lane split");

        let mut regs = self.arena.checkout(program.slots());
        let mut cx = Context {
            table,
            arena: &mut self.arena,
        };
        for i in (0..full).step_by(K) {
            stages::run(program, &mut regs, i + K, &mut cx);
            regs[..RETURNS].fill(Lanes::ZERO);
        }
        for i in full..n {
            stages::run(program, &mut regs, i + 1, &mut cx);
            regs[..RETURNS].fill(Lanes::ZERO);
        }
        self.arena.release(regs);
        Ok(())
    }
}

/// Run `program` over `n` lanes with a default [`Executor`].
pub fn execute(program: &Program, n: usize, table: &mut SideTable<'_>) -> Result<(), ExecError> {
    Executor::default().run(program, n, table)
}
