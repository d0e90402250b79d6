//! # VTMock
//!
//! This crate mocks C++-ABI polymorphic classes at runtime by rewriting
//! their virtual tables. No subclassing and no code generation per mock: a
//! mocked instance is an uninitialized, layout-compatible buffer whose
//! vtable slots are patched one by one as methods are stubbed, and a spied
//! instance is a live object whose table is transparently cloned, patched,
//! and later restored.
//!
//! # Usage
//!
//! ## Declaring a class
//! Describe the class's virtual layout once with [`mock_class!`]. Slot
//! indices follow declaration order; `virtual(idx)` pins a method to an
//! explicit slot, leaving unimplemented gaps for the slots skipped over.
//! ```rs
//! mock_class! {
//!     class Animal {
//!         virtual fn legs(&self) -> u32;
//!         virtual(2) fn eat(&self, food: String) -> bool;
//!         virtual(3) destructor;
//!     }
//! }
//! ```
//! This generates the `#[repr(C)]` struct `Animal` (first field `vfptr`),
//! the typed `AnimalVTable` view, calling bridges so `animal.legs()`
//! dispatches through slot 0, and one method descriptor constant per
//! virtual (`Animal::LEGS`, `Animal::EAT`, `Animal::DESTRUCTOR`).
//!
//! ## Stubbing and invoking
//! Mocks are built from an explicit [`MockContext`]; mocks sharing a
//! context share one global invocation order.
//! ```rs
//! let ctx = MockContext::new();
//! let mut mock = Mock::<Animal>::new(&ctx)?;
//! mock.when(Animal::LEGS).then_return(4).always_return(0);
//! mock.when(Animal::EAT)
//!     .with(("grass".to_owned(),))
//!     .always_return(true);
//!
//! let animal = mock.get();
//! assert_eq!(animal.legs(), 4);
//! ```
//! Calling an unstubbed method panics with an `unmocked method call`
//! message; a call no registered matcher accepts panics with an
//! `unmatched method call` message.
//!
//! ## Verifying
//! Verification is `Result`-based. Sequences concatenate with `+` and
//! repeat with `* n`, and count greedy non-overlapping occurrences over the
//! involved mocks' shared history.
//! ```rs
//! verify(mock.called(Animal::LEGS)).exactly(2)?;
//! verify(mock.called(Animal::LEGS) + mock.called(Animal::EAT)).once()?;
//! verify_no_other_invocations(&[&mock])?;
//! ```

pub mod abi;
mod action;
mod body;
pub mod context;
pub mod error;
pub mod fake;
pub mod invocation;
pub mod method;
pub mod mock;
pub mod probe;
pub mod proxy;
pub mod verify;
pub mod vtable;

pub use abi::{Abi, RawSlot, RttiLocator, TypeDescriptor};
pub use context::MockContext;
pub use error::{Error, Result, UnexpectedKind};
pub use fake::FakeObject;
pub use invocation::{ActualInvocation, InvocationRecord, InvocationsSource};
pub use method::{MethodArgs, MockableClass, VirtualMethod};
pub use mock::{Mock, When};
pub use probe::{destructor_offset, method_offset};
pub use proxy::DynamicProxy;
pub use verify::{
    assert_verified, verify, verify_no_other_invocations, Sequence, Step, Verification,
};
pub use vtable::VirtualTable;

pub use vtmock_macros::mock_class;
