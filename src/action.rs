//! Stubbed behavior queues.

use std::collections::VecDeque;

/// How many invocations a queued behavior serves before it is spent.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Quantity {
    Times(u64),
    Forever,
}

/// One unit of stubbed behavior: a closure over the captured argument tuple
/// plus the number of calls it may serve.
pub(crate) struct Action<A, R> {
    run: Box<dyn FnMut(A) -> R>,
    quantity: Quantity,
}

impl<A, R> Action<A, R> {
    pub(crate) fn new(run: Box<dyn FnMut(A) -> R>, quantity: Quantity) -> Self {
        Self { run, quantity }
    }

    fn invoke(&mut self, args: A) -> R {
        if let Quantity::Times(n) = &mut self.quantity {
            debug_assert!(*n > 0);
            *n -= 1;
        }
        (self.run)(args)
    }

    fn is_done(&self) -> bool {
        matches!(self.quantity, Quantity::Times(0))
    }
}

/// Ordered queue of [`Action`]s for one stub. Finite actions are popped once
/// exhausted; a `Forever` action at the front serves every remaining call.
pub(crate) struct ActionSequence<A, R> {
    queue: VecDeque<Action<A, R>>,
}

impl<A, R> ActionSequence<A, R> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn append(&mut self, action: Action<A, R>) {
        self.queue.push_back(action);
    }

    /// Runs the front action; `None` means every recorded action is spent,
    /// which callers report through the unexpected-call path rather than as
    /// an error of its own.
    pub(crate) fn handle(&mut self, args: A) -> Option<R> {
        let front = self.queue.front_mut()?;
        let result = front.invoke(args);
        if front.is_done() {
            self.queue.pop_front();
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i32, quantity: Quantity) -> Action<(), i32> {
        Action::new(Box::new(move |_| value), quantity)
    }

    #[test]
    fn finite_actions_pop_in_order() {
        let mut seq = ActionSequence::new();
        seq.append(constant(1, Quantity::Times(2)));
        seq.append(constant(2, Quantity::Times(1)));

        assert_eq!(seq.handle(()), Some(1));
        assert_eq!(seq.handle(()), Some(1));
        assert_eq!(seq.handle(()), Some(2));
        assert_eq!(seq.handle(()), None);
    }

    #[test]
    fn forever_action_never_pops() {
        let mut seq = ActionSequence::new();
        seq.append(constant(7, Quantity::Forever));

        for _ in 0..100 {
            assert_eq!(seq.handle(()), Some(7));
        }
    }
}
