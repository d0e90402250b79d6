//! Fake object layout.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::method::MockableClass;
use crate::vtable::VirtualTable;

/// A byte-for-byte layout-compatible stand-in for `C`.
///
/// The buffer is exactly `size_of::<C>()` bytes: the `vfptr` word followed by
/// zeroed data. No constructor of `C` ever runs; the only initialized state
/// is the vtable pointer, which is what makes virtual dispatch (and nothing
/// else) work on the instance.
pub struct FakeObject<C: MockableClass> {
    vtable: VirtualTable,
    buf: NonNull<u8>,
    layout: Layout,
    _marker: PhantomData<C>,
}

impl<C: MockableClass> FakeObject<C> {
    /// Overlays `vtable` onto a fresh zeroed buffer shaped like `C`.
    pub fn new(vtable: VirtualTable) -> Result<Self> {
        let layout = Layout::new::<C>();
        if layout.size() < std::mem::size_of::<usize>()
            || layout.align() < std::mem::align_of::<usize>()
        {
            return Err(Error::UnsupportedLayout {
                class: C::NAME,
                reason: "class layout has no room for a vfptr word".to_owned(),
            });
        }

        let buf = unsafe { alloc_zeroed(layout) };
        let Some(buf) = NonNull::new(buf) else {
            handle_alloc_error(layout);
        };

        let fake = Self {
            vtable,
            buf,
            layout,
            _marker: PhantomData,
        };
        unsafe {
            *(fake.buf.as_ptr() as *mut usize) = fake.vtable.as_vfptr();
        }
        Ok(fake)
    }

    /// Size of the backing buffer; always equals `size_of::<C>()`.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn ptr(&self) -> *mut C {
        self.buf.as_ptr() as *mut C
    }

    pub fn vtable(&self) -> &VirtualTable {
        &self.vtable
    }

    pub fn vtable_mut(&mut self) -> &mut VirtualTable {
        &mut self.vtable
    }
}

impl<C: MockableClass> Drop for FakeObject<C> {
    fn drop(&mut self) {
        // The data region is plain zero-initialized bytes; no drop glue of
        // `C` may run because `C` was never constructed.
        unsafe { dealloc(self.buf.as_ptr(), self.layout) };
    }
}
