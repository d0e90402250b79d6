use std::cell::Cell;
use std::rc::Rc;

use vtmock::{destructor_offset, mock_class, verify, Error, Mock, MockContext, MockableClass};

mock_class! {
    class Disposable {
        virtual fn id(&self) -> u32;
        virtual destructor;
    }
}

mock_class! {
    class Plain {
        virtual fn id(&self) -> u32;
    }
}

#[test]
fn destructor_occupies_its_declared_slot() {
    assert_eq!(Disposable::DESTRUCTOR.slot(), 1);
    assert!(<Disposable as MockableClass>::DTOR.is_some());
    assert!(<Plain as MockableClass>::DTOR.is_none());
}

#[test]
fn destructor_offset_is_probed_like_any_slot() {
    let offset = destructor_offset::<Disposable>(|d| unsafe { d.destruct() }).unwrap();
    assert_eq!(offset, 1);
}

#[test]
fn probing_without_a_destructor_fails() {
    let err = destructor_offset::<Plain>(|_| {}).unwrap_err();
    assert!(matches!(err, Error::NoVirtualDestructor("Plain")));
}

#[test]
fn stubbed_destructor_observes_destruction() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Disposable>::new(&ctx).unwrap();

    let destroyed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&destroyed);
    mock.when_destroyed()
        .unwrap()
        .always_do(move |_| flag.set(true));

    unsafe { mock.get().destruct() };
    assert!(destroyed.get());

    verify(mock.called(Disposable::DESTRUCTOR)).once().unwrap();
}

#[test]
fn when_destroyed_requires_a_virtual_destructor() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Plain>::new(&ctx).unwrap();
    let err = mock.when_destroyed().err().unwrap();
    assert!(matches!(err, Error::NoVirtualDestructor("Plain")));
}
