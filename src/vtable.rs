//! Runtime virtual-table construction.
//!
//! A [`VirtualTable`] owns a heap array of function-pointer-sized slots laid
//! out exactly as a compiler-built vtable: hidden cookie slots first, then
//! slot 0 onward. An object's `vfptr` is pointed at slot 0, so a typed
//! `FooVTable` view over the same memory dispatches normally while the cookie
//! slots stay reachable at negative offsets.

use std::any::TypeId;

use log::trace;

use crate::abi::{Abi, RawSlot, RttiLocator, TypeDescriptor, COOKIE_RTTI, COOKIE_TYPE_INFO};
use crate::method::MockableClass;

/// A runtime-built vtable for one faked (or patched) instance.
pub struct VirtualTable {
    /// Cookie slots followed by the visible slots.
    buf: Box<[RawSlot]>,
    cookies: usize,
    abi: Abi,
    class: &'static str,
    descriptor: Box<TypeDescriptor>,
    /// Owned RTTI reconstruction; present for [`Abi::Msvc`] only.
    rtti: Option<Box<RttiLocator>>,
}

impl VirtualTable {
    /// Allocates a zeroed table sized for `C` under the given ABI and stamps
    /// the type-information cookies.
    pub fn new_for<C: MockableClass>(abi: Abi) -> Self {
        let cookies = abi.cookie_count();
        let buf = vec![std::ptr::null(); cookies + C::VIRTUAL_SLOTS].into_boxed_slice();
        let descriptor = Box::new(TypeDescriptor {
            name: C::NAME,
            type_id: TypeId::of::<C>(),
        });

        let mut table = Self {
            buf,
            cookies,
            abi,
            class: C::NAME,
            rtti: None,
            descriptor,
        };

        table.set_cookie(COOKIE_TYPE_INFO, &*table.descriptor as *const TypeDescriptor as RawSlot);
        if abi == Abi::Msvc {
            let rtti = Box::new(RttiLocator::new(&*table.descriptor));
            table.set_cookie(COOKIE_RTTI, &*rtti as *const RttiLocator as RawSlot);
            table.rtti = Some(rtti);
        }

        trace!(
            "built vtable for {} ({} slots, {} cookies, {:?})",
            C::NAME,
            table.slot_count(),
            cookies,
            abi
        );
        table
    }

    pub fn abi(&self) -> Abi {
        self.abi
    }

    /// Number of visible (non-cookie) slots.
    pub fn slot_count(&self) -> usize {
        self.buf.len() - self.cookies
    }

    /// The value an object's `vfptr` word must hold to dispatch through this
    /// table, i.e. the address of slot 0.
    pub fn as_vfptr(&self) -> usize {
        &self.buf[self.cookies] as *const RawSlot as usize
    }

    pub fn slot(&self, index: usize) -> RawSlot {
        self.buf[self.cookies + index]
    }

    pub fn set_slot(&mut self, index: usize, value: RawSlot) {
        trace!("patching {} slot {}", self.class, index);
        self.buf[self.cookies + index] = value;
    }

    /// Fills every visible slot with the same value.
    pub fn fill_slots(&mut self, value: RawSlot) {
        let cookies = self.cookies;
        self.buf[cookies..].fill(value);
    }

    /// Copies the visible slots (never the cookies) out of another live
    /// table, given the `vfptr` an object dispatching through it holds.
    ///
    /// # Safety
    ///
    /// `vfptr` must point at slot 0 of a table with at least as many slots as
    /// this one.
    pub unsafe fn copy_slots_from_raw(&mut self, vfptr: usize) {
        let src = vfptr as *const RawSlot;
        for i in 0..self.slot_count() {
            self.buf[self.cookies + i] = *src.add(i);
        }
    }

    pub fn cookie(&self, index: usize) -> RawSlot {
        self.buf[self.cookies - 1 - index]
    }

    pub fn set_cookie(&mut self, index: usize, value: RawSlot) {
        self.buf[self.cookies - 1 - index] = value;
    }

    /// The type descriptor this table advertises in its cookie area.
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Reads a cookie through an instance's `vfptr`, the path a trampoline
    /// takes when all it knows is `this`.
    ///
    /// # Safety
    ///
    /// `vfptr` must point at slot 0 of a table built by this crate (cookies
    /// present at negative offsets).
    pub(crate) unsafe fn cookie_from_vfptr(vfptr: usize, index: usize) -> RawSlot {
        let slot0 = vfptr as *const RawSlot;
        *slot0.sub(1 + index)
    }
}

impl Drop for VirtualTable {
    fn drop(&mut self) {
        // Owned descriptor and RTTI boxes free with the struct; nothing else
        // to unhook, the table never owns the instances dispatching over it.
        trace!("disposing vtable for {}", self.class);
    }
}
