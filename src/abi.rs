//! Target-ABI parameters for virtual table layout.
//!
//! The two supported layouts differ only in the hidden bookkeeping ("cookie")
//! slots that precede slot 0 of a table: the Itanium C++ ABI reserves two of
//! them, the MSVC ABI a third for its complete-object-locator reconstruction.
//! Slot 0 and everything after it is what the object's `vfptr` points to, so
//! typed dispatch through a generated `FooVTable` view works identically for
//! both variants.

use std::any::TypeId;

/// A single virtual-table slot, type-erased.
pub type RawSlot = *const ();

/// Number of cookies reserved before slot 0, counted backwards from it.
///
/// Cookie 0 (at slot index -1) always holds the invocation-handler-collection
/// pointer so a trampoline can find its handlers knowing nothing but `this`.
pub(crate) const COOKIE_HANDLERS: usize = 0;
/// Cookie 1 holds the owned [`TypeDescriptor`] pointer.
pub(crate) const COOKIE_TYPE_INFO: usize = 1;
/// Cookie 2 (MSVC only) holds the owned [`RttiLocator`] pointer.
pub(crate) const COOKIE_RTTI: usize = 2;

/// The vtable layout flavor a table is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Abi {
    /// Itanium C++ ABI (POSIX platforms): two cookie slots.
    Itanium,
    /// MSVC ABI: three cookie slots, including an RTTI locator.
    Msvc,
}

impl Abi {
    /// The ABI matching the compilation target.
    pub const fn host() -> Self {
        if cfg!(windows) {
            Abi::Msvc
        } else {
            Abi::Itanium
        }
    }

    /// Number of hidden cookie slots preceding slot 0.
    pub const fn cookie_count(self) -> usize {
        match self {
            Abi::Itanium => 2,
            Abi::Msvc => 3,
        }
    }
}

/// Minimal stand-in for the `type_info` an ordinary polymorphic object's
/// table would reference. Owned by the [`VirtualTable`](crate::VirtualTable)
/// that advertises it.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Reconstruction of the MSVC `RTTICompleteObjectLocator` header fields.
///
/// Only the shape is preserved; nothing in this crate consumes it beyond the
/// ownership bookkeeping, mirroring how a fake object merely has to *carry*
/// plausible RTTI for the ABI it imitates.
#[derive(Debug)]
pub struct RttiLocator {
    pub signature: u32,
    pub offset: u32,
    pub cd_offset: u32,
    pub descriptor: *const TypeDescriptor,
}

impl RttiLocator {
    pub(crate) fn new(descriptor: *const TypeDescriptor) -> Self {
        Self {
            signature: 0,
            offset: 0,
            cd_offset: 0,
            descriptor,
        }
    }
}
