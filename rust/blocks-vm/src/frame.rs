//! Register files and the arena they are checked out from.
//!
//! Each execution and each call frame gets its own zeroed register file.
//! Files up to [`SCRATCH_BYTES`] live inline on the native stack; larger
//! ones are heap buffers that the arena keeps for reuse once the frame
//! returns, up to a configured number of retained buffers.

use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;
use tracing::trace;

use crate::lanes::Lanes;

/// Inline scratch budget for one register file.
pub const SCRATCH_BYTES: usize = 4096;

/// Slots that fit in the inline scratch budget.
pub const INLINE_SLOTS: usize = SCRATCH_BYTES / std::mem::size_of::<Lanes>();

/// One frame's registers.
pub(crate) enum RegisterFile {
    Scratch(SmallVec<[Lanes; INLINE_SLOTS]>),
    Heap(Vec<Lanes>),
}

impl RegisterFile {
    pub(crate) fn is_heap(&self) -> bool {
        matches!(self, RegisterFile::Heap(_))
    }
}

impl Deref for RegisterFile {
    type Target = [Lanes];

    #[inline(always)]
    fn deref(&self) -> &[Lanes] {
        match self {
            RegisterFile::Scratch(v) => v,
            RegisterFile::Heap(v) => v,
        }
    }
}

impl DerefMut for RegisterFile {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [Lanes] {
        match self {
            RegisterFile::Scratch(v) => v,
            RegisterFile::Heap(v) => v,
        }
    }
}

/// Counters describing where register files came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Files served from inline scratch.
    pub scratch: u64,
    /// Heap files freshly allocated.
    pub heap_allocs: u64,
    /// Heap files served from the retained pool.
    pub heap_reuses: u64,
}

/// Pool of heap register files shared by every frame of an executor.
#[derive(Debug)]
pub(crate) struct Arena {
    free: Vec<Vec<Lanes>>,
    retain: usize,
    stats: ArenaStats,
}

impl Arena {
    pub(crate) fn new(retain: usize) -> Self {
        Arena {
            free: Vec::new(),
            retain,
            stats: ArenaStats::default(),
        }
    }

    /// Check out a zeroed register file of `slots` slots.
    pub(crate) fn checkout(&mut self, slots: usize) -> RegisterFile {
        if slots <= INLINE_SLOTS {
            self.stats.scratch += 1;
            return RegisterFile::Scratch(SmallVec::from_elem(Lanes::ZERO, slots));
        }
        match self.free.pop() {
            Some(mut regs) => {
                self.stats.heap_reuses += 1;
                trace!(slots, capacity = regs.capacity(), "reusing retained register file");
                regs.clear();
                regs.resize(slots, Lanes::ZERO);
                RegisterFile::Heap(regs)
            }
            None => {
                self.stats.heap_allocs += 1;
                trace!(slots, "register file spilled to heap");
                RegisterFile::Heap(vec![Lanes::ZERO; slots])
            }
        }
    }

    /// Return a register file. Heap files are kept while the pool has room.
    pub(crate) fn release(&mut self, regs: RegisterFile) {
        if let RegisterFile::Heap(buf) = regs {
            if self.free.len() < self.retain {
                self.free.push(buf);
            }
        }
    }

    pub(crate) fn stats(&self) -> ArenaStats {
        self.stats
    }

    pub(crate) fn retained(&self) -> usize {
        self.free.len()
    }
}
