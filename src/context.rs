//! Shared mocking context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Explicit, injectable context shared by the mocks of one test.
///
/// Its only state is a pair of atomic counters handing out globally unique,
/// monotonically increasing method and invocation ordinals, so that call
/// ordering across every mock built from the same context is totally ordered
/// without a lock. There is no hidden process-wide instance; cross-mock
/// verification requires the mocks to share a context.
///
/// Cloning is cheap and yields a handle to the same counters.
#[derive(Clone, Default)]
pub struct MockContext {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    next_method: AtomicU64,
    next_invocation: AtomicU64,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_method_ordinal(&self) -> u64 {
        self.inner.next_method.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_invocation_ordinal(&self) -> u64 {
        self.inner.next_invocation.fetch_add(1, Ordering::Relaxed)
    }
}
