//! Method descriptors generated by `mock_class!`.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::abi::RawSlot;

/// A class whose virtual dispatch can be faked by this crate.
///
/// Implementations are generated by [`mock_class!`](crate::mock_class) and
/// promise a `#[repr(C)]` layout whose first word is the virtual-table
/// pointer (`vfptr`), with every virtual method dispatching through the slot
/// index recorded in the associated metadata.
///
/// # Safety
///
/// Implementing this trait by hand asserts the layout contract above; getting
/// it wrong makes every fake-object and vtable-patching operation unsound.
pub unsafe trait MockableClass: Sized + 'static {
    /// The class name, used in diagnostics.
    const NAME: &'static str;

    /// Total slot count of the class's vtable, including unimplemented gaps
    /// and the destructor slot.
    const VIRTUAL_SLOTS: usize;

    /// The virtual destructor, if the class declares one.
    const DTOR: Option<VirtualMethod<Self, (), ()>> = None;

    /// Slot-indexed method names; `None` marks an unimplemented gap.
    const METHOD_NAMES: &'static [Option<&'static str>];
}

/// Compile-time description of one virtual method of `C`: its slot index,
/// its name, and the monomorphized trampoline that redirects the slot into
/// the invocation-handler chain once the method is stubbed.
///
/// `A` is the argument tuple (receiver excluded), `R` the return type.
/// `mock_class!` emits one associated constant per declared virtual, named
/// after the method in UPPER_SNAKE case (`Foo::LEGS` for `fn legs`).
pub struct VirtualMethod<C, A, R> {
    slot: usize,
    name: &'static str,
    trampoline: RawSlot,
    _marker: PhantomData<fn(C, A) -> R>,
}

impl<C, A, R> VirtualMethod<C, A, R> {
    pub const fn new(slot: usize, name: &'static str, trampoline: RawSlot) -> Self {
        Self {
            slot,
            name,
            trampoline,
            _marker: PhantomData,
        }
    }

    /// Declaration-order index of the method within the vtable.
    pub const fn slot(&self) -> usize {
        self.slot
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) const fn trampoline(&self) -> RawSlot {
        self.trampoline
    }
}

impl<C, A, R> Clone for VirtualMethod<C, A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, A, R> Copy for VirtualMethod<C, A, R> {}

/// Argument tuples a virtual method may take. Arguments are captured by value
/// for recording and matching, so each must be `Clone + Debug + 'static`.
pub trait MethodArgs: Clone + Debug + 'static {
    /// Calls a raw vtable slot with `this` and the unpacked tuple.
    ///
    /// # Safety
    ///
    /// `slot` must point to a function whose ABI signature is exactly
    /// `extern "C-unwind" fn(&C, ..self..) -> R` for the caller's `C`/`R`.
    unsafe fn apply<C, R>(self, slot: RawSlot, this: *const C) -> R;
}

macro_rules! impl_method_args {
    ($(($($name:ident : $ty:ident),*)),* $(,)?) => {
        $(
            impl<$($ty: Clone + Debug + 'static),*> MethodArgs for ($($ty,)*) {
                #[allow(non_snake_case, unused_variables)]
                unsafe fn apply<C, R>(self, slot: RawSlot, this: *const C) -> R {
                    let ($($name,)*) = self;
                    let f: extern "C-unwind" fn(*const C $(, $ty)*) -> R =
                        std::mem::transmute(slot);
                    f(this $(, $name)*)
                }
            }
        )*
    };
}

impl_method_args! {
    (),
    (a0: A0),
    (a0: A0, a1: A1),
    (a0: A0, a1: A1, a2: A2),
    (a0: A0, a1: A1, a2: A2, a3: A3),
}
