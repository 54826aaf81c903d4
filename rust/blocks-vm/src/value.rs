//! Value handles produced by a [`Builder`](crate::Builder).
//!
//! A handle names a slot in the register file of the program being built.
//! Handles carry the builder's `'id` brand: the brand is invariant and only
//! ever introduced by [`Program::build`](crate::Program::build), so a handle
//! from one builder cannot be passed to another.

use std::fmt;
use std::marker::PhantomData;

/// Invariant lifetime marker shared by a builder and its handles.
pub(crate) type Brand<'id> = PhantomData<fn(&'id ()) -> &'id ()>;

/// Slots `0..RETURNS` receive a program's results. Slot 0 doubles as nil.
pub const RETURNS: usize = 4;

/// Slots `RETURNS..RETURNS + ARGS` hold a program's formal arguments.
pub const ARGS: usize = 4;

/// First slot available to user emissions.
pub const RESERVED: usize = RETURNS + ARGS;

/// Handle to one produced value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Val<'id> {
    slot: u32,
    _brand: Brand<'id>,
}

impl<'id> Val<'id> {
    #[inline]
    pub(crate) fn new(slot: usize) -> Self {
        Val {
            slot: slot as u32,
            _brand: PhantomData,
        }
    }

    /// Absolute slot this handle refers to while building.
    #[inline]
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    /// True for the reserved always-zero slot.
    pub fn is_nil(self) -> bool {
        self.slot == 0
    }
}

impl fmt::Debug for Val<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "nil")
        } else {
            write!(f, "v{}", self.slot)
        }
    }
}

/// Four handles bundled together, as returned by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Val4<'id> {
    pub x: Val<'id>,
    pub y: Val<'id>,
    pub z: Val<'id>,
    pub w: Val<'id>,
}

impl<'id> Val4<'id> {
    pub fn new(x: Val<'id>, y: Val<'id>, z: Val<'id>, w: Val<'id>) -> Self {
        Val4 { x, y, z, w }
    }

    pub(crate) fn slots(self) -> [usize; 4] {
        [self.x.slot(), self.y.slot(), self.z.slot(), self.w.slot()]
    }
}

impl<'id> From<[Val<'id>; 4]> for Val4<'id> {
    fn from([x, y, z, w]: [Val<'id>; 4]) -> Self {
        Val4 { x, y, z, w }
    }
}

impl<'id> From<Val4<'id>> for [Val<'id>; 4] {
    fn from(q: Val4<'id>) -> Self {
        [q.x, q.y, q.z, q.w]
    }
}
