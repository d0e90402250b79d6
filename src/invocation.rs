//! Recorded invocations.

use std::any::Any;
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::method::MethodArgs;

/// One observed call on a mocked instance: its global ordinal, the method it
/// hit, and the captured argument tuple.
pub struct ActualInvocation<A> {
    ordinal: u64,
    class: &'static str,
    method: &'static str,
    slot: usize,
    args: A,
    verified: Cell<bool>,
}

impl<A: MethodArgs> ActualInvocation<A> {
    pub(crate) fn new(
        ordinal: u64,
        class: &'static str,
        method: &'static str,
        slot: usize,
        args: A,
    ) -> Self {
        Self {
            ordinal,
            class,
            method,
            slot,
            args,
            verified: Cell::new(false),
        }
    }

    pub fn args(&self) -> &A {
        &self.args
    }
}

/// Type-erased view of an [`ActualInvocation`], used when verification walks
/// the histories of several mocks with differing signatures.
pub trait InvocationRecord {
    fn ordinal(&self) -> u64;
    fn slot(&self) -> usize;
    fn method(&self) -> &'static str;
    fn is_verified(&self) -> bool;
    fn mark_verified(&self);
    fn describe(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

impl<A: MethodArgs> InvocationRecord for ActualInvocation<A> {
    fn ordinal(&self) -> u64 {
        self.ordinal
    }

    fn slot(&self) -> usize {
        self.slot
    }

    fn method(&self) -> &'static str {
        self.method
    }

    fn is_verified(&self) -> bool {
        self.verified.get()
    }

    fn mark_verified(&self) {
        self.verified.set(true);
    }

    fn describe(&self) -> String {
        format!(
            "#{} {}::{}{}",
            self.ordinal,
            self.class,
            self.method,
            render_args(&self.args)
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Anything that can hand out its full, ordinal-ordered invocation history.
pub trait InvocationsSource {
    fn invocations(&self) -> Vec<Rc<dyn InvocationRecord>>;
}

pub(crate) fn render_args<A: Debug>(args: &A) -> String {
    let rendered = format!("{args:?}");
    // Single-element tuples debug-print with a trailing comma; tidy that up
    // so messages read like call expressions.
    match rendered.strip_suffix(",)") {
        Some(head) => format!("{head})"),
        None => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_render_like_call_expressions() {
        assert_eq!(render_args(&()), "()");
        assert_eq!(render_args(&(4,)), "(4)");
        assert_eq!(render_args(&("grass".to_owned(), 2)), "(\"grass\", 2)");
    }
}
