//! Runtime discovery of vtable slot offsets.
//!
//! The probe overlays an object whose vtable slots are all index-recording
//! thunks: thunk `N` writes `N` into the probe object itself and returns.
//! Invoking a class's typed bridge method against the probe therefore
//! records exactly the slot index that method dispatches through, without
//! consulting any metadata.
//!
//! The thunks run under whatever signature the probed method really has;
//! they only touch `this` and return an integer. That reinterpretation is a
//! platform contract (System-V and MSVC x64 calling conventions pass `this`
//! first and tolerate an ignored integer return), not something this module
//! can verify. Methods returning large by-value aggregates shift `this` into
//! the second parameter position on both ABIs and must not be probed.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;

use crate::error::{Error, Result};
use crate::method::MockableClass;
use crate::proxy::{slot_table, SlotTable, MAX_SLOTS};

/// Bookkeeping region at the front of the probe buffer. Field order matters:
/// the `vfptr` word must sit at offset 0, exactly as in a real instance.
#[repr(C)]
struct ProbeHeader {
    vfptr: usize,
    offset: Cell<usize>,
    hit: Cell<bool>,
}

static PROBE_SLOTS: SlotTable = slot_table!(probe_slot);

extern "C-unwind" fn probe_slot<const N: usize>(this: *const ProbeHeader) -> usize {
    let header = unsafe { &*this };
    header.offset.set(N);
    header.hit.set(true);
    N
}

/// Discovers the vtable slot index the given virtual call dispatches
/// through. `invoke` receives a probe instance disguised as a `C` and must
/// perform exactly one virtual call on it, e.g. `|c| { c.legs(); }`.
///
/// Panics if `invoke` never reaches a virtual slot, which indicates the
/// closure called something other than a generated bridge method.
pub fn method_offset<C: MockableClass>(invoke: impl FnOnce(&mut C)) -> usize {
    assert!(
        C::VIRTUAL_SLOTS <= MAX_SLOTS,
        "{} declares more virtual slots than the probe table holds",
        C::NAME
    );

    let layout = probe_layout::<C>();
    let buf = unsafe { alloc_zeroed(layout) };
    if buf.is_null() {
        handle_alloc_error(layout);
    }

    let offset = {
        let header = unsafe { &mut *(buf as *mut ProbeHeader) };
        header.vfptr = PROBE_SLOTS.0.as_ptr() as usize;

        invoke(unsafe { &mut *(buf as *mut C) });

        let header = unsafe { &*(buf as *const ProbeHeader) };
        assert!(
            header.hit.get(),
            "probe invocation on {} did not reach a virtual slot",
            C::NAME
        );
        header.offset.get()
    };

    unsafe { dealloc(buf, layout) };
    offset
}

/// Discovers the virtual destructor's slot index, e.g. via
/// `|c| unsafe { c.destruct() }`. Fails for classes that do not declare a
/// virtual destructor.
pub fn destructor_offset<C: MockableClass>(invoke: impl FnOnce(&mut C)) -> Result<usize> {
    if C::DTOR.is_none() {
        return Err(Error::NoVirtualDestructor(C::NAME));
    }
    Ok(method_offset(invoke))
}

fn probe_layout<C: MockableClass>() -> Layout {
    let header = Layout::new::<ProbeHeader>();
    let class = Layout::new::<C>();
    let size = header.size().max(class.size());
    let align = header.align().max(class.align());
    Layout::from_size_align(size, align).expect("probe layout")
}
