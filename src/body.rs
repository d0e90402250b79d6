//! Per-method stub records.

use std::any::Any;
use std::rc::Rc;

use crate::action::{Action, ActionSequence};
use crate::error::{Error, UnexpectedKind};
use crate::invocation::{render_args, ActualInvocation, InvocationRecord};
use crate::method::MethodArgs;

/// Accepts or rejects a call's argument tuple. `test: None` matches anything.
pub(crate) struct ArgMatcher<A> {
    test: Option<Box<dyn Fn(&A) -> bool>>,
    expectation: String,
}

impl<A> ArgMatcher<A> {
    pub(crate) fn any() -> Self {
        Self {
            test: None,
            expectation: "(..)".to_owned(),
        }
    }

    pub(crate) fn new(test: Box<dyn Fn(&A) -> bool>, expectation: String) -> Self {
        Self {
            test: Some(test),
            expectation,
        }
    }

    pub(crate) fn matches(&self, args: &A) -> bool {
        match &self.test {
            Some(test) => test(args),
            None => true,
        }
    }

    pub(crate) fn expectation(&self) -> &str {
        &self.expectation
    }
}

/// Everything recorded about one stubbed method: the registered
/// matcher/action-sequence pairs and the invocations observed so far.
///
/// Matching scans the pairs in reverse registration order, so of several
/// stubs accepting the same arguments the most recently registered one wins.
pub(crate) struct RecordedMethodBody<A, R> {
    class: &'static str,
    method: &'static str,
    slot: usize,
    method_ordinal: u64,
    handlers: Vec<(ArgMatcher<A>, ActionSequence<A, R>)>,
    invocations: Vec<Rc<ActualInvocation<A>>>,
}

impl<A: MethodArgs, R: 'static> RecordedMethodBody<A, R> {
    pub(crate) fn new(
        class: &'static str,
        method: &'static str,
        slot: usize,
        method_ordinal: u64,
    ) -> Self {
        Self {
            class,
            method,
            slot,
            method_ordinal,
            handlers: Vec::new(),
            invocations: Vec::new(),
        }
    }

    /// Registers a new matcher with an empty action queue and returns its
    /// index for later appends.
    pub(crate) fn add_handler(&mut self, matcher: ArgMatcher<A>) -> usize {
        self.handlers.push((matcher, ActionSequence::new()));
        self.handlers.len() - 1
    }

    pub(crate) fn append_action(&mut self, handler: usize, action: Action<A, R>) {
        self.handlers[handler].1.append(action);
    }

    /// Serves one call. Every observed call is recorded first, so a call no
    /// stub ends up serving still shows in the history and in
    /// [`verify_no_other_invocations`](crate::verify_no_other_invocations).
    /// The most recently registered accepting matcher serves the call; an
    /// exhausted action queue or no accepting matcher both surface as an
    /// unmatched-call error.
    pub(crate) fn handle_invocation(&mut self, args: A, ordinal: u64) -> Result<R, Error> {
        self.invocations.push(Rc::new(ActualInvocation::new(
            ordinal,
            self.class,
            self.method,
            self.slot,
            args.clone(),
        )));

        let mut served = None;
        for (matcher, sequence) in self.handlers.iter_mut().rev() {
            if matcher.matches(&args) {
                // No more recorded actions leaves `served` empty, reported
                // exactly like a call no matcher accepted, never as a
                // distinct error type.
                served = sequence.handle(args.clone());
                break;
            }
        }

        served.ok_or_else(|| self.unexpected(&args))
    }

    fn unexpected(&self, args: &A) -> Error {
        let registered: Vec<&str> = self
            .handlers
            .iter()
            .rev()
            .map(|(matcher, _)| matcher.expectation())
            .collect();
        log::debug!(
            "{}::{} (method #{}) rejected {}; registered matchers: [{}]",
            self.class,
            self.method,
            self.method_ordinal,
            render_args(args),
            registered.join(", ")
        );
        Error::UnexpectedCall {
            kind: UnexpectedKind::Unmatched,
            class: self.class,
            method: self.method.to_owned(),
            args: render_args(args),
        }
    }
}

/// Type-erased storage view of a [`RecordedMethodBody`], boxed per slot in
/// the invocation-handler collection.
pub(crate) trait ErasedBody {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn records(&self) -> Vec<Rc<dyn InvocationRecord>>;
}

impl<A: MethodArgs, R: 'static> ErasedBody for RecordedMethodBody<A, R> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn records(&self) -> Vec<Rc<dyn InvocationRecord>> {
        self.invocations
            .iter()
            .map(|inv| Rc::clone(inv) as Rc<dyn InvocationRecord>)
            .collect()
    }
}
