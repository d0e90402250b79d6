//! The user-facing mock object and stubbing interface.

use std::rc::Rc;

use log::debug;

use crate::abi::Abi;
use crate::action::{Action, Quantity};
use crate::body::ArgMatcher;
use crate::context::MockContext;
use crate::error::{Error, Result};
use crate::fake::FakeObject;
use crate::invocation::{render_args, ActualInvocation, InvocationRecord, InvocationsSource};
use crate::method::{MethodArgs, MockableClass, VirtualMethod};
use crate::proxy::{DynamicProxy, MAX_SLOTS, UNMOCKED_SLOTS};
use crate::verify::{Sequence, Step};
use crate::vtable::VirtualTable;

/// A mocked (or spied) instance of `C` plus everything recorded about it.
///
/// A mock built by [`Mock::new`] owns a fake object: an uninitialized,
/// layout-compatible buffer whose only live state is its vtable pointer.
/// Every slot of that table starts as an "unmocked" thunk that panics with a
/// diagnostic, and [`Mock::when`] patches individual slots with recording
/// trampolines. A spy built by [`Mock::spy`] wraps a real instance instead
/// and restores its original table when dropped.
pub struct Mock<C: MockableClass> {
    // Declared before `fake` so the proxy detaches (writing the original
    // vfptr back into the buffer) while the buffer is still allocated.
    proxy: DynamicProxy<C>,
    fake: Option<FakeObject<C>>,
    ctx: MockContext,
}

impl<C: MockableClass> Mock<C> {
    /// Builds a mock over a fresh fake object, using the compilation
    /// target's vtable layout.
    pub fn new(ctx: &MockContext) -> Result<Self> {
        Self::with_abi(ctx, Abi::host())
    }

    /// Builds a mock whose fake object carries a vtable laid out for the
    /// given ABI, regardless of the compilation target.
    pub fn with_abi(ctx: &MockContext, abi: Abi) -> Result<Self> {
        if C::VIRTUAL_SLOTS > MAX_SLOTS {
            return Err(Error::UnsupportedLayout {
                class: C::NAME,
                reason: format!(
                    "{} virtual slots exceed the supported maximum of {MAX_SLOTS}",
                    C::VIRTUAL_SLOTS
                ),
            });
        }

        let mut vtable = VirtualTable::new_for::<C>(abi);
        for (slot, thunk) in UNMOCKED_SLOTS.0[..C::VIRTUAL_SLOTS].iter().enumerate() {
            vtable.set_slot(slot, *thunk);
        }

        let fake = FakeObject::new(vtable)?;
        let proxy = unsafe { DynamicProxy::new(ctx, fake.ptr(), abi) };
        debug!("mock created for {}", C::NAME);

        Ok(Self {
            proxy,
            fake: Some(fake),
            ctx: ctx.clone(),
        })
    }

    /// Attaches a mock to a live instance. Unstubbed methods keep their
    /// original behavior but record nothing; [`Mock::spy_on`] forwards a
    /// method while recording its calls. The instance's own vtable is
    /// restored when the mock is dropped.
    ///
    /// # Safety
    ///
    /// `target` must point at a live, well-formed `C` that outlives the
    /// returned mock and is not moved or destroyed while it is attached.
    pub unsafe fn spy(ctx: &MockContext, target: *mut C) -> Self {
        Self::spy_with_abi(ctx, target, Abi::host())
    }

    /// [`Mock::spy`] with an explicit vtable layout for the cloned table.
    ///
    /// # Safety
    ///
    /// Same contract as [`Mock::spy`].
    pub unsafe fn spy_with_abi(ctx: &MockContext, target: *mut C, abi: Abi) -> Self {
        let proxy = DynamicProxy::new(ctx, target, abi);
        debug!("spy attached to {}", C::NAME);
        Self {
            proxy,
            fake: None,
            ctx: ctx.clone(),
        }
    }

    /// The mocked instance, viewed as an ordinary `&mut C`.
    ///
    /// For a fake-backed mock only virtual calls are meaningful; the data
    /// members behind the reference are zeroed bytes.
    pub fn get(&mut self) -> &mut C {
        unsafe { &mut *self.proxy.instance() }
    }

    pub fn ptr(&self) -> *mut C {
        self.proxy.instance()
    }

    /// Size in bytes of the owned fake buffer; `None` for a spy.
    pub fn object_size(&self) -> Option<usize> {
        self.fake.as_ref().map(|fake| fake.size())
    }

    pub(crate) fn handlers(&self) -> &Rc<crate::proxy::InvocationHandlerCollection> {
        self.proxy.handlers()
    }

    /// Starts stubbing `method`. The returned builder chains argument
    /// matchers and actions:
    ///
    /// ```ignore
    /// mock.when(Animal::LEGS).then_return(4);
    /// mock.when(Animal::EAT).with(("grass".to_owned(),)).always_return(true);
    /// ```
    ///
    /// Of several stubs accepting the same arguments, the most recently
    /// registered wins. Dropping the builder without an action registers a
    /// matcher with no behavior, so a matched call fails as unmatched; that
    /// is how a restrictive `when(..).with(..)` turns unforeseen arguments
    /// into failures.
    pub fn when<A: MethodArgs, R: 'static>(
        &mut self,
        method: VirtualMethod<C, A, R>,
    ) -> When<'_, C, A, R> {
        self.proxy.stub(method);
        When {
            mock: self,
            method,
            matcher: Some(ArgMatcher::any()),
            handler: None,
        }
    }

    /// Stubs `method` to return `R::default()` on every call.
    pub fn fake<A: MethodArgs, R: Default + 'static>(&mut self, method: VirtualMethod<C, A, R>) {
        self.when(method).always_do(|_| R::default());
    }

    /// Starts stubbing the virtual destructor slot. Fails for classes
    /// without a virtual destructor.
    pub fn when_destroyed(&mut self) -> Result<When<'_, C, (), ()>> {
        let dtor = C::DTOR.ok_or(Error::NoVirtualDestructor(C::NAME))?;
        Ok(self.when(dtor))
    }

    /// Keeps `method`'s original behavior while recording its invocations.
    /// Meaningful on a spy; on a fake-backed mock the forwarded target is an
    /// unmocked thunk and every call panics.
    pub fn spy_on<A: MethodArgs, R: 'static>(&mut self, method: VirtualMethod<C, A, R>) {
        let original = self.proxy.original_slot(method.slot());
        let instance = self.proxy.instance();
        self.when(method)
            .always_do(move |args: A| unsafe { args.apply(original, instance) });
    }

    /// A one-step verification sequence matching any call to `method`.
    pub fn called<A: MethodArgs, R: 'static>(&self, method: VirtualMethod<C, A, R>) -> Sequence {
        self.handlers().ensure_body::<A, R>(method.slot(), method.name());
        Sequence::single(Step::new(
            Rc::clone(self.handlers()),
            method.slot(),
            Rc::new(|_: &dyn InvocationRecord| true),
            format!("{}::{}(..)", C::NAME, method.name()),
        ))
    }

    /// A one-step verification sequence matching calls to `method` whose
    /// arguments equal `expected`.
    pub fn called_with<A, R>(&self, method: VirtualMethod<C, A, R>, expected: A) -> Sequence
    where
        A: MethodArgs + PartialEq,
        R: 'static,
    {
        self.handlers().ensure_body::<A, R>(method.slot(), method.name());
        let describe = format!("{}::{}{}", C::NAME, method.name(), render_args(&expected));
        Sequence::single(Step::new(
            Rc::clone(self.handlers()),
            method.slot(),
            Rc::new(move |record: &dyn InvocationRecord| {
                record
                    .as_any()
                    .downcast_ref::<ActualInvocation<A>>()
                    .is_some_and(|inv| *inv.args() == expected)
            }),
            describe,
        ))
    }

    /// A one-step verification sequence matching calls to `method` whose
    /// arguments satisfy `predicate`.
    pub fn called_matching<A, R>(
        &self,
        method: VirtualMethod<C, A, R>,
        predicate: impl Fn(&A) -> bool + 'static,
    ) -> Sequence
    where
        A: MethodArgs,
        R: 'static,
    {
        self.handlers().ensure_body::<A, R>(method.slot(), method.name());
        Sequence::single(Step::new(
            Rc::clone(self.handlers()),
            method.slot(),
            Rc::new(move |record: &dyn InvocationRecord| {
                record
                    .as_any()
                    .downcast_ref::<ActualInvocation<A>>()
                    .is_some_and(|inv| predicate(inv.args()))
            }),
            format!("{}::{}(<predicate>)", C::NAME, method.name()),
        ))
    }

    /// Discards every stub and every recorded invocation, returning the
    /// instance to its pre-stubbing dispatch (unmocked thunks for a
    /// fake-backed mock, the original methods for a spy).
    pub fn reset(&mut self) {
        self.proxy.reset();
        debug!("mock for {} reset", C::NAME);
    }

    pub fn context(&self) -> &MockContext {
        &self.ctx
    }
}

impl<C: MockableClass> InvocationsSource for Mock<C> {
    fn invocations(&self) -> Vec<Rc<dyn InvocationRecord>> {
        self.handlers().records()
    }
}

/// Builder returned by [`Mock::when`]. Matchers first, then actions; the
/// chain is consumed by value so a statement like
/// `mock.when(M).with(args).then_return(v).always_return(w)` reads in
/// registration order.
pub struct When<'m, C: MockableClass, A: MethodArgs, R: 'static> {
    mock: &'m mut Mock<C>,
    method: VirtualMethod<C, A, R>,
    matcher: Option<ArgMatcher<A>>,
    handler: Option<usize>,
}

impl<C: MockableClass, A: MethodArgs, R: 'static> When<'_, C, A, R> {
    /// Restricts the stub to calls whose arguments equal `expected`.
    pub fn with(mut self, expected: A) -> Self
    where
        A: PartialEq,
    {
        assert!(
            self.handler.is_none(),
            "argument matchers must be set before actions"
        );
        let expectation = render_args(&expected);
        self.matcher = Some(ArgMatcher::new(
            Box::new(move |args| *args == expected),
            expectation,
        ));
        self
    }

    /// Restricts the stub to calls whose arguments satisfy `predicate`.
    pub fn matching(mut self, predicate: impl Fn(&A) -> bool + 'static) -> Self {
        assert!(
            self.handler.is_none(),
            "argument matchers must be set before actions"
        );
        self.matcher = Some(ArgMatcher::new(
            Box::new(move |args| predicate(args)),
            "(<predicate>)".to_owned(),
        ));
        self
    }

    /// Queues `value` as the result of the next matched call.
    pub fn then_return(mut self, value: R) -> Self {
        let mut value = Some(value);
        self.push_action(Action::new(
            Box::new(move |_| value.take().expect("single-shot return already served")),
            Quantity::Times(1),
        ));
        self
    }

    /// Queues `value` as the result of the next `times` matched calls.
    pub fn then_return_times(mut self, value: R, times: u64) -> Self
    where
        R: Clone,
    {
        self.push_action(Action::new(
            Box::new(move |_| value.clone()),
            Quantity::Times(times),
        ));
        self
    }

    /// Queues `f` to compute the result of the next matched call.
    pub fn then_do(mut self, f: impl FnMut(A) -> R + 'static) -> Self {
        self.push_action(Action::new(Box::new(f), Quantity::Times(1)));
        self
    }

    /// Queues a panic with `message` for the next matched call, standing in
    /// for a stub that throws.
    pub fn then_panic(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.push_action(Action::new(
            Box::new(move |_| panic!("{message}")),
            Quantity::Times(1),
        ));
        self
    }

    /// Terminal behavior: every remaining matched call returns `value`.
    pub fn always_return(mut self, value: R)
    where
        R: Clone,
    {
        self.push_action(Action::new(
            Box::new(move |_| value.clone()),
            Quantity::Forever,
        ));
    }

    /// Terminal behavior: every remaining matched call runs `f`.
    pub fn always_do(mut self, f: impl FnMut(A) -> R + 'static) {
        self.push_action(Action::new(Box::new(f), Quantity::Forever));
    }

    /// Terminal behavior: every remaining matched call panics with
    /// `message`.
    pub fn always_panic(mut self, message: impl Into<String>) {
        let message = message.into();
        self.push_action(Action::new(
            Box::new(move |_| panic!("{message}")),
            Quantity::Forever,
        ));
    }

    fn ensure_handler(&mut self) -> usize {
        match self.handler {
            Some(index) => index,
            None => {
                let matcher = self.matcher.take().unwrap_or_else(ArgMatcher::any);
                let index = self
                    .mock
                    .handlers()
                    .with_body::<A, R, _>(self.method.slot(), |body| body.add_handler(matcher));
                self.handler = Some(index);
                index
            }
        }
    }

    fn push_action(&mut self, action: Action<A, R>) {
        let index = self.ensure_handler();
        self.mock
            .handlers()
            .with_body::<A, R, _>(self.method.slot(), |body| {
                body.append_action(index, action);
            });
    }
}

impl<C: MockableClass, A: MethodArgs, R: 'static> Drop for When<'_, C, A, R> {
    fn drop(&mut self) {
        // A builder abandoned without actions still registers its matcher,
        // with an empty action queue that reports matched calls as
        // unmatched.
        if self.handler.is_none() {
            self.ensure_handler();
        }
    }
}
