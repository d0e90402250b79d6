//! Class-declaration macros for the `vtmock` runtime.
//!
//! [`mock_class!`] turns one C++-style class declaration into everything the
//! runtime needs to fake it: the `#[repr(C)]` struct itself (first field:
//! the `vfptr` word), a `<Name>VTable` struct mirroring the slot layout, the
//! typed dispatch bridges, the layout-contract trait impl, and one method
//! descriptor constant per virtual.
//!
//! ```rs
//! mock_class! {
//!     class Animal {
//!         weight: u32;
//!         virtual fn legs(&self) -> u32;
//!         virtual(2) fn eat(&self, food: String) -> bool;
//!         virtual(3) destructor;
//!     }
//! }
//! ```
//!
//! Slot indices follow declaration order; `virtual(idx)` pins a method to an
//! explicit slot and leaves `unimpl_N` gap fields for the slots skipped
//! over. Marking the class `#[concrete]` additionally generates a
//! `<Name>Virtuals` trait and a `VTBL` constant so real instances can be
//! built (and spied on); a trailing `impl` block with constructors gets its
//! instantiations rewired to point at that table.

use proc_macro::TokenStream;

mod class;
mod parse;
mod util;

/// Declares a mockable class. See the crate docs for the accepted syntax.
#[proc_macro]
pub fn mock_class(input: TokenStream) -> TokenStream {
    class::mock_class_impl(input)
}
