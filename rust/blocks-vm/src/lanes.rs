//! Four-lane SIMD vectors.
//!
//! A [`Lanes`] value is the contents of one register-file slot: four 32-bit
//! lanes stored as raw bits. Opcode bodies view the same bits as `f32`, `i32`
//! or `u32` depending on what they compute, so no storage is ever
//! reinterpreted through a union.

/// Number of lanes processed per full-width chunk.
pub const K: usize = 4;

/// One register-file slot: `K` lanes of 32 bits each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C, align(16))]
pub struct Lanes(pub [u32; K]);

impl Lanes {
    /// The all-zero vector. Slot 0 of every register file holds it.
    pub const ZERO: Lanes = Lanes([0; K]);

    /// Broadcast a raw bit pattern to every lane.
    #[inline(always)]
    pub fn splat(bits: u32) -> Self {
        Lanes([bits; K])
    }

    #[inline(always)]
    pub fn from_f32(lanes: [f32; K]) -> Self {
        Lanes(lanes.map(f32::to_bits))
    }

    #[inline(always)]
    pub fn from_i32(lanes: [i32; K]) -> Self {
        Lanes(lanes.map(|x| x as u32))
    }

    #[inline(always)]
    pub fn f32s(self) -> [f32; K] {
        self.0.map(f32::from_bits)
    }

    #[inline(always)]
    pub fn i32s(self) -> [i32; K] {
        self.0.map(|x| x as i32)
    }

    #[inline(always)]
    pub fn u32s(self) -> [u32; K] {
        self.0
    }

    /// Lane-wise binary map over `f32` views.
    #[inline(always)]
    pub(crate) fn zip_f32(self, other: Lanes, f: impl Fn(f32, f32) -> f32) -> Lanes {
        let (a, b) = (self.f32s(), other.f32s());
        Lanes::from_f32([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }

    /// Lane-wise comparison producing an all-bits mask per lane.
    #[inline(always)]
    pub(crate) fn mask_f32(self, other: Lanes, f: impl Fn(f32, f32) -> bool) -> Lanes {
        let (a, b) = (self.f32s(), other.f32s());
        Lanes([0, 1, 2, 3].map(|i| if f(a[i], b[i]) { u32::MAX } else { 0 }))
    }

    /// Lane-wise binary map over raw bits.
    #[inline(always)]
    pub(crate) fn zip_u32(self, other: Lanes, f: impl Fn(u32, u32) -> u32) -> Lanes {
        let (a, b) = (self.0, other.0);
        Lanes([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }
}
