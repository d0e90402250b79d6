//! Dynamic proxying of live instances and trampoline dispatch.
//!
//! A [`DynamicProxy`] takes over an instance's virtual dispatch: it saves the
//! object's current `vfptr` as a restorable handle, clones the table it
//! points at, stamps the clone's handler cookie, and swaps the clone in.
//! Stubbing a method patches one clone slot with a monomorphized trampoline
//! (`call0`..`call4`) that recovers the [`InvocationHandlerCollection`]
//! through the cookie and forwards the captured arguments to the method's
//! recorded body.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use log::debug;

use crate::abi::{Abi, RawSlot, COOKIE_HANDLERS};
use crate::body::{ErasedBody, RecordedMethodBody};
use crate::context::MockContext;
use crate::error::{Error, UnexpectedKind};
use crate::invocation::InvocationRecord;
use crate::method::{MethodArgs, MockableClass, VirtualMethod};
use crate::vtable::VirtualTable;

/// Largest vtable this crate can fake; also the probe-table size.
pub const MAX_SLOTS: usize = 128;

/// Builds a slot-indexed table of monomorphized thunks.
macro_rules! slot_table {
    ($thunk:ident) => {
        $crate::proxy::SlotTable([
            $thunk::<0> as $crate::RawSlot,
            $thunk::<1> as $crate::RawSlot,
            $thunk::<2> as $crate::RawSlot,
            $thunk::<3> as $crate::RawSlot,
            $thunk::<4> as $crate::RawSlot,
            $thunk::<5> as $crate::RawSlot,
            $thunk::<6> as $crate::RawSlot,
            $thunk::<7> as $crate::RawSlot,
            $thunk::<8> as $crate::RawSlot,
            $thunk::<9> as $crate::RawSlot,
            $thunk::<10> as $crate::RawSlot,
            $thunk::<11> as $crate::RawSlot,
            $thunk::<12> as $crate::RawSlot,
            $thunk::<13> as $crate::RawSlot,
            $thunk::<14> as $crate::RawSlot,
            $thunk::<15> as $crate::RawSlot,
            $thunk::<16> as $crate::RawSlot,
            $thunk::<17> as $crate::RawSlot,
            $thunk::<18> as $crate::RawSlot,
            $thunk::<19> as $crate::RawSlot,
            $thunk::<20> as $crate::RawSlot,
            $thunk::<21> as $crate::RawSlot,
            $thunk::<22> as $crate::RawSlot,
            $thunk::<23> as $crate::RawSlot,
            $thunk::<24> as $crate::RawSlot,
            $thunk::<25> as $crate::RawSlot,
            $thunk::<26> as $crate::RawSlot,
            $thunk::<27> as $crate::RawSlot,
            $thunk::<28> as $crate::RawSlot,
            $thunk::<29> as $crate::RawSlot,
            $thunk::<30> as $crate::RawSlot,
            $thunk::<31> as $crate::RawSlot,
            $thunk::<32> as $crate::RawSlot,
            $thunk::<33> as $crate::RawSlot,
            $thunk::<34> as $crate::RawSlot,
            $thunk::<35> as $crate::RawSlot,
            $thunk::<36> as $crate::RawSlot,
            $thunk::<37> as $crate::RawSlot,
            $thunk::<38> as $crate::RawSlot,
            $thunk::<39> as $crate::RawSlot,
            $thunk::<40> as $crate::RawSlot,
            $thunk::<41> as $crate::RawSlot,
            $thunk::<42> as $crate::RawSlot,
            $thunk::<43> as $crate::RawSlot,
            $thunk::<44> as $crate::RawSlot,
            $thunk::<45> as $crate::RawSlot,
            $thunk::<46> as $crate::RawSlot,
            $thunk::<47> as $crate::RawSlot,
            $thunk::<48> as $crate::RawSlot,
            $thunk::<49> as $crate::RawSlot,
            $thunk::<50> as $crate::RawSlot,
            $thunk::<51> as $crate::RawSlot,
            $thunk::<52> as $crate::RawSlot,
            $thunk::<53> as $crate::RawSlot,
            $thunk::<54> as $crate::RawSlot,
            $thunk::<55> as $crate::RawSlot,
            $thunk::<56> as $crate::RawSlot,
            $thunk::<57> as $crate::RawSlot,
            $thunk::<58> as $crate::RawSlot,
            $thunk::<59> as $crate::RawSlot,
            $thunk::<60> as $crate::RawSlot,
            $thunk::<61> as $crate::RawSlot,
            $thunk::<62> as $crate::RawSlot,
            $thunk::<63> as $crate::RawSlot,
            $thunk::<64> as $crate::RawSlot,
            $thunk::<65> as $crate::RawSlot,
            $thunk::<66> as $crate::RawSlot,
            $thunk::<67> as $crate::RawSlot,
            $thunk::<68> as $crate::RawSlot,
            $thunk::<69> as $crate::RawSlot,
            $thunk::<70> as $crate::RawSlot,
            $thunk::<71> as $crate::RawSlot,
            $thunk::<72> as $crate::RawSlot,
            $thunk::<73> as $crate::RawSlot,
            $thunk::<74> as $crate::RawSlot,
            $thunk::<75> as $crate::RawSlot,
            $thunk::<76> as $crate::RawSlot,
            $thunk::<77> as $crate::RawSlot,
            $thunk::<78> as $crate::RawSlot,
            $thunk::<79> as $crate::RawSlot,
            $thunk::<80> as $crate::RawSlot,
            $thunk::<81> as $crate::RawSlot,
            $thunk::<82> as $crate::RawSlot,
            $thunk::<83> as $crate::RawSlot,
            $thunk::<84> as $crate::RawSlot,
            $thunk::<85> as $crate::RawSlot,
            $thunk::<86> as $crate::RawSlot,
            $thunk::<87> as $crate::RawSlot,
            $thunk::<88> as $crate::RawSlot,
            $thunk::<89> as $crate::RawSlot,
            $thunk::<90> as $crate::RawSlot,
            $thunk::<91> as $crate::RawSlot,
            $thunk::<92> as $crate::RawSlot,
            $thunk::<93> as $crate::RawSlot,
            $thunk::<94> as $crate::RawSlot,
            $thunk::<95> as $crate::RawSlot,
            $thunk::<96> as $crate::RawSlot,
            $thunk::<97> as $crate::RawSlot,
            $thunk::<98> as $crate::RawSlot,
            $thunk::<99> as $crate::RawSlot,
            $thunk::<100> as $crate::RawSlot,
            $thunk::<101> as $crate::RawSlot,
            $thunk::<102> as $crate::RawSlot,
            $thunk::<103> as $crate::RawSlot,
            $thunk::<104> as $crate::RawSlot,
            $thunk::<105> as $crate::RawSlot,
            $thunk::<106> as $crate::RawSlot,
            $thunk::<107> as $crate::RawSlot,
            $thunk::<108> as $crate::RawSlot,
            $thunk::<109> as $crate::RawSlot,
            $thunk::<110> as $crate::RawSlot,
            $thunk::<111> as $crate::RawSlot,
            $thunk::<112> as $crate::RawSlot,
            $thunk::<113> as $crate::RawSlot,
            $thunk::<114> as $crate::RawSlot,
            $thunk::<115> as $crate::RawSlot,
            $thunk::<116> as $crate::RawSlot,
            $thunk::<117> as $crate::RawSlot,
            $thunk::<118> as $crate::RawSlot,
            $thunk::<119> as $crate::RawSlot,
            $thunk::<120> as $crate::RawSlot,
            $thunk::<121> as $crate::RawSlot,
            $thunk::<122> as $crate::RawSlot,
            $thunk::<123> as $crate::RawSlot,
            $thunk::<124> as $crate::RawSlot,
            $thunk::<125> as $crate::RawSlot,
            $thunk::<126> as $crate::RawSlot,
            $thunk::<127> as $crate::RawSlot,
        ])
    };
}
pub(crate) use slot_table;

/// Slot-indexed thunk table; the wrapper exists because raw slots are not
/// `Sync` on their own and the table must live in a `static` so its address
/// outlives every probe and fake object built over it.
pub struct SlotTable(pub(crate) [RawSlot; MAX_SLOTS]);

unsafe impl Sync for SlotTable {}

/// Table of slot-identifying "unmocked method called" thunks used to fill a
/// fake object's initial vtable.
pub(crate) static UNMOCKED_SLOTS: SlotTable = slot_table!(unmocked_slot);

extern "C-unwind" fn unmocked_slot<const N: usize>(this: *const ()) -> usize {
    let vfptr = unsafe { *(this as *const usize) };
    let handlers = unsafe { collection_from_vfptr(vfptr) };
    handlers.report_unmocked(N)
}

/// Recovers the handler collection a trampoline needs, knowing only `this`.
///
/// # Safety
///
/// `vfptr` must point at slot 0 of a table whose handler cookie was stamped
/// by [`DynamicProxy::new`] and whose collection is still alive.
unsafe fn collection_from_vfptr<'a>(vfptr: usize) -> &'a InvocationHandlerCollection {
    let raw = VirtualTable::cookie_from_vfptr(vfptr, COOKIE_HANDLERS);
    &*(raw as *const InvocationHandlerCollection)
}

fn dispatch<C: MockableClass, A: MethodArgs, R: 'static>(this: *const C, slot: usize, args: A) -> R {
    let vfptr = unsafe { *(this as *const usize) };
    let handlers = unsafe { collection_from_vfptr(vfptr) };
    handlers.handle(slot, args)
}

/// Nullary trampoline; also serves destructor slots.
pub extern "C-unwind" fn call0<C: MockableClass, R: 'static, const SLOT: usize>(this: &C) -> R {
    dispatch(this as *const C, SLOT, ())
}

pub extern "C-unwind" fn call1<C, A0, R, const SLOT: usize>(this: &C, a0: A0) -> R
where
    C: MockableClass,
    A0: Clone + Debug + 'static,
    R: 'static,
{
    dispatch(this as *const C, SLOT, (a0,))
}

pub extern "C-unwind" fn call2<C, A0, A1, R, const SLOT: usize>(this: &C, a0: A0, a1: A1) -> R
where
    C: MockableClass,
    A0: Clone + Debug + 'static,
    A1: Clone + Debug + 'static,
    R: 'static,
{
    dispatch(this as *const C, SLOT, (a0, a1))
}

pub extern "C-unwind" fn call3<C, A0, A1, A2, R, const SLOT: usize>(
    this: &C,
    a0: A0,
    a1: A1,
    a2: A2,
) -> R
where
    C: MockableClass,
    A0: Clone + Debug + 'static,
    A1: Clone + Debug + 'static,
    A2: Clone + Debug + 'static,
    R: 'static,
{
    dispatch(this as *const C, SLOT, (a0, a1, a2))
}

pub extern "C-unwind" fn call4<C, A0, A1, A2, A3, R, const SLOT: usize>(
    this: &C,
    a0: A0,
    a1: A1,
    a2: A2,
    a3: A3,
) -> R
where
    C: MockableClass,
    A0: Clone + Debug + 'static,
    A1: Clone + Debug + 'static,
    A2: Clone + Debug + 'static,
    A3: Clone + Debug + 'static,
    R: 'static,
{
    dispatch(this as *const C, SLOT, (a0, a1, a2, a3))
}

/// Per-mock registry mapping vtable slots to recorded method bodies, found
/// by trampolines through the handler cookie.
///
/// Interior mutability is deliberate: the trampoline only has a shared
/// reference recovered from a raw cookie. The whole structure is
/// single-threaded by contract; a stubbed action calling back into the same
/// mock is rejected by the `RefCell` at runtime.
pub struct InvocationHandlerCollection {
    class: &'static str,
    method_names: &'static [Option<&'static str>],
    bodies: RefCell<Vec<Option<Box<dyn ErasedBody>>>>,
    ctx: MockContext,
}

impl InvocationHandlerCollection {
    pub(crate) fn new<C: MockableClass>(ctx: MockContext) -> Self {
        Self {
            class: C::NAME,
            method_names: C::METHOD_NAMES,
            bodies: RefCell::new((0..C::VIRTUAL_SLOTS).map(|_| None).collect()),
            ctx,
        }
    }

    fn method_name(&self, slot: usize) -> String {
        match self.method_names.get(slot).copied().flatten() {
            Some(name) => name.to_owned(),
            None => format!("<slot {slot}>"),
        }
    }

    /// Creates the body for a slot if this is the first stub against it.
    pub(crate) fn ensure_body<A: MethodArgs, R: 'static>(&self, slot: usize, name: &'static str) {
        let mut bodies = self.bodies.borrow_mut();
        if bodies[slot].is_none() {
            let ordinal = self.ctx.next_method_ordinal();
            bodies[slot] = Some(Box::new(RecordedMethodBody::<A, R>::new(
                self.class, name, slot, ordinal,
            )));
        }
    }

    /// Runs `f` against the typed body recorded for `slot`.
    ///
    /// Panics if the slot was never stubbed or was stubbed under different
    /// types; both indicate a bug in the generated class metadata.
    pub(crate) fn with_body<A: MethodArgs, R: 'static, T>(
        &self,
        slot: usize,
        f: impl FnOnce(&mut RecordedMethodBody<A, R>) -> T,
    ) -> T {
        let mut bodies = self.bodies.borrow_mut();
        let body = bodies[slot]
            .as_mut()
            .and_then(|body| body.as_any_mut().downcast_mut::<RecordedMethodBody<A, R>>())
            .expect("stubbed slot lost its recorded body");
        f(body)
    }

    /// Serves one trampoline call. Errors cannot be returned through a
    /// virtual call, so they propagate as a panic carrying the rendered
    /// unexpected-call message.
    pub(crate) fn handle<A: MethodArgs, R: 'static>(&self, slot: usize, args: A) -> R {
        let ordinal = self.ctx.next_invocation_ordinal();
        let mut bodies = self.bodies.borrow_mut();
        let body = bodies[slot]
            .as_mut()
            .and_then(|body| body.as_any_mut().downcast_mut::<RecordedMethodBody<A, R>>());

        let result = match body {
            Some(body) => body.handle_invocation(args, ordinal),
            None => Err(Error::UnexpectedCall {
                kind: UnexpectedKind::Unmocked,
                class: self.class,
                method: self.method_name(slot),
                args: "(..)".to_owned(),
            }),
        };

        match result {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub(crate) fn report_unmocked(&self, slot: usize) -> ! {
        let _ = self.ctx.next_invocation_ordinal();
        let err = Error::UnexpectedCall {
            kind: UnexpectedKind::Unmocked,
            class: self.class,
            method: self.method_name(slot),
            args: "(..)".to_owned(),
        };
        panic!("{err}")
    }

    pub(crate) fn is_stubbed(&self, slot: usize) -> bool {
        self.bodies.borrow()[slot].is_some()
    }

    pub(crate) fn clear(&self) {
        let mut bodies = self.bodies.borrow_mut();
        for body in bodies.iter_mut() {
            *body = None;
        }
    }

    /// Every invocation recorded by any body, sorted by global ordinal.
    pub(crate) fn records(&self) -> Vec<Rc<dyn InvocationRecord>> {
        let bodies = self.bodies.borrow();
        let mut all: Vec<_> = bodies
            .iter()
            .flatten()
            .flat_map(|body| body.records())
            .collect();
        all.sort_by_key(|record| record.ordinal());
        all
    }
}

/// Redirects a live instance's virtual dispatch into a handler collection,
/// restorably.
pub struct DynamicProxy<C: MockableClass> {
    instance: *mut C,
    original_vfptr: usize,
    table: VirtualTable,
    handlers: Rc<InvocationHandlerCollection>,
    attached: bool,
}

impl<C: MockableClass> DynamicProxy<C> {
    /// Takes over `instance`'s dispatch: clones its current vtable, stamps
    /// the handler cookie, and installs the clone.
    ///
    /// # Safety
    ///
    /// `instance` must point at a live, well-formed `C` whose `vfptr` leads
    /// to a table with at least `C::VIRTUAL_SLOTS` slots, and must stay
    /// valid for the proxy's lifetime.
    pub unsafe fn new(ctx: &MockContext, instance: *mut C, abi: Abi) -> Self {
        let original_vfptr = *(instance as *const usize);

        let mut table = VirtualTable::new_for::<C>(abi);
        table.copy_slots_from_raw(original_vfptr);

        let handlers = Rc::new(InvocationHandlerCollection::new::<C>(ctx.clone()));
        table.set_cookie(COOKIE_HANDLERS, Rc::as_ptr(&handlers) as RawSlot);

        *(instance as *mut usize) = table.as_vfptr();
        debug!("attached proxy to {} instance {instance:p}", C::NAME);

        Self {
            instance,
            original_vfptr,
            table,
            handlers,
            attached: true,
        }
    }

    pub fn instance(&self) -> *mut C {
        self.instance
    }

    pub(crate) fn handlers(&self) -> &Rc<InvocationHandlerCollection> {
        &self.handlers
    }

    /// Registers a method body (if absent) and patches its slot to the
    /// trampoline carried by the method descriptor.
    pub(crate) fn stub<A: MethodArgs, R: 'static>(&mut self, method: VirtualMethod<C, A, R>) {
        self.handlers
            .ensure_body::<A, R>(method.slot(), method.name());
        self.table.set_slot(method.slot(), method.trampoline());
    }

    pub fn is_stubbed(&self, slot: usize) -> bool {
        self.handlers.is_stubbed(slot)
    }

    /// The slot value the instance dispatched through before the proxy
    /// attached; used for spy fall-through behavior.
    pub(crate) fn original_slot(&self, slot: usize) -> RawSlot {
        unsafe { *(self.original_vfptr as *const RawSlot).add(slot) }
    }

    /// Clears all stubs and recorded invocations and re-copies the original
    /// table's slots, leaving the instance mockable from a clean slate.
    pub fn reset(&mut self) {
        self.handlers.clear();
        unsafe { self.table.copy_slots_from_raw(self.original_vfptr) };
    }

    /// Restores the pre-mocking vtable onto the live instance.
    pub fn detach(&mut self) {
        if self.attached {
            unsafe { *(self.instance as *mut usize) = self.original_vfptr };
            self.attached = false;
            debug!("detached proxy from {} instance", C::NAME);
        }
    }
}

impl<C: MockableClass> Drop for DynamicProxy<C> {
    fn drop(&mut self) {
        self.detach();
    }
}
