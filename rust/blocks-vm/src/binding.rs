//! Side tables: the external buffers a program loads from and stores to.
//!
//! Load and store instructions name buffers by a small index into the
//! [`SideTable`] handed to [`execute`](crate::execute). Indices are global
//! across the call graph: a callee addresses the same buffers its caller
//! would. Every finalized program carries a [`Bindings`] summary of which
//! indices it (and everything it calls) touches and how, so the executor
//! can reject a mismatched table before running a single lane.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::ExecError;
use crate::inst::{Op, Record};

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
}

/// 32-bit element types a buffer may hold.
pub trait Scalar: sealed::Sealed + Copy {}

impl Scalar for f32 {}
impl Scalar for i32 {}
impl Scalar for u32 {}

/// One side-table entry: a borrowed buffer of 32-bit elements.
#[derive(Debug)]
pub struct Binding<'a> {
    ptr: NonNull<u32>,
    len: usize,
    writable: bool,
    _borrow: PhantomData<&'a mut [u32]>,
}

impl<'a> Binding<'a> {
    /// Bind a buffer the program may only load from.
    pub fn read<T: Scalar>(buf: &'a [T]) -> Self {
        Binding {
            // `T` is a 4-byte, 4-aligned plain scalar, so the cast is sound.
            ptr: NonNull::from(buf).cast(),
            len: buf.len(),
            writable: false,
            _borrow: PhantomData,
        }
    }

    /// Bind a buffer the program may load from and store to.
    pub fn write<T: Scalar>(buf: &'a mut [T]) -> Self {
        Binding {
            ptr: NonNull::from(&mut *buf).cast(),
            len: buf.len(),
            writable: true,
            _borrow: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    #[inline(always)]
    pub(crate) fn elements(&self) -> &[u32] {
        // SAFETY: ptr/len come from a slice borrowed for 'a.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// # Panics
    /// Panics if the buffer was bound read-only.
    #[inline(always)]
    pub(crate) fn elements_mut(&mut self) -> &mut [u32] {
        assert!(self.writable, "store into a read-only binding");
        // SAFETY: ptr/len come from a `&'a mut` slice and `self` is borrowed
        // mutably, so this is the only live reference into the buffer.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

/// Ordered buffers addressed by side-table index.
#[derive(Debug, Default)]
pub struct SideTable<'a> {
    bindings: Vec<Binding<'a>>,
}

impl<'a> SideTable<'a> {
    pub fn new() -> Self {
        SideTable {
            bindings: Vec::new(),
        }
    }

    /// Append a read-only buffer; its index is the table length before the call.
    pub fn read<T: Scalar>(mut self, buf: &'a [T]) -> Self {
        self.bindings.push(Binding::read(buf));
        self
    }

    /// Append a read/write buffer.
    pub fn write<T: Scalar>(mut self, buf: &'a mut [T]) -> Self {
        self.bindings.push(Binding::write(buf));
        self
    }

    pub fn push(&mut self, binding: Binding<'a>) -> usize {
        self.bindings.push(binding);
        self.bindings.len() - 1
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Binding<'a>> {
        self.bindings.get(index)
    }

    #[inline(always)]
    pub(crate) fn binding(&self, index: usize) -> &Binding<'a> {
        &self.bindings[index]
    }

    #[inline(always)]
    pub(crate) fn binding_mut(&mut self, index: usize) -> &mut Binding<'a> {
        &mut self.bindings[index]
    }
}

impl<'a> FromIterator<Binding<'a>> for SideTable<'a> {
    fn from_iter<I: IntoIterator<Item = Binding<'a>>>(iter: I) -> Self {
        SideTable {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// How a program uses one side-table index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingUse {
    /// Loaded lane-by-lane.
    pub varying_read: bool,
    /// Stored lane-by-lane.
    pub varying_write: bool,
    /// One past the highest uniform offset loaded, if any.
    pub uniform_extent: Option<u32>,
}

impl BindingUse {
    pub fn is_unused(&self) -> bool {
        *self == BindingUse::default()
    }

    fn merge(&mut self, other: &BindingUse) {
        self.varying_read |= other.varying_read;
        self.varying_write |= other.varying_write;
        self.uniform_extent = self.uniform_extent.max(other.uniform_extent);
    }
}

/// Per-index side-table usage, merged across the whole call graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    uses: Vec<BindingUse>,
}

impl Bindings {
    /// Usage of side-table index `index`.
    pub fn get(&self, index: usize) -> BindingUse {
        self.uses.get(index).copied().unwrap_or_default()
    }

    /// Smallest side-table length the program can run against.
    pub fn required_len(&self) -> usize {
        self.uses
            .iter()
            .rposition(|u| !u.is_unused())
            .map_or(0, |i| i + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BindingUse)> {
        self.uses.iter().enumerate().filter(|(_, u)| !u.is_unused())
    }

    fn slot(&mut self, index: usize) -> &mut BindingUse {
        if self.uses.len() <= index {
            self.uses.resize(index + 1, BindingUse::default());
        }
        &mut self.uses[index]
    }

    pub(crate) fn record(&mut self, record: &Record) {
        let index = record.ptr as usize;
        match record.op {
            Op::LoadVarying => self.slot(index).varying_read = true,
            Op::StoreVarying => self.slot(index).varying_write = true,
            Op::LoadUniform => {
                let extent = Some(record.imm.bits().saturating_add(1));
                let slot = self.slot(index);
                slot.uniform_extent = slot.uniform_extent.max(extent);
            }
            Op::Call => {
                if let Some(callee) = &record.call {
                    for (i, u) in callee.bindings().iter() {
                        self.slot(i).merge(u);
                    }
                }
            }
            _ => {}
        }
    }

    /// Check `table` can serve every access over `lanes` lanes.
    pub fn check(&self, table: &SideTable<'_>, lanes: usize) -> Result<(), ExecError> {
        for (index, u) in self.iter() {
            let binding = table.get(index).ok_or(ExecError::MissingBinding {
                index,
                len: table.len(),
            })?;
            if (u.varying_read || u.varying_write) && binding.len() < lanes {
                return Err(ExecError::ShortBinding {
                    index,
                    len: binding.len(),
                    lanes,
                });
            }
            if u.varying_write && !binding.is_writable() {
                return Err(ExecError::ReadOnlyBinding { index });
            }
            if let Some(extent) = u.uniform_extent {
                if extent as usize > binding.len() {
                    return Err(ExecError::UniformOutOfRange {
                        index,
                        offset: extent - 1,
                        len: binding.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
