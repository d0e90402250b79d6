use std::mem;

use vtmock::{
    method_offset, mock_class, Abi, FakeObject, Mock, MockContext, MockableClass, VirtualTable,
};

mock_class! {
    class Widget {
        virtual fn first(&self) -> u32;
        virtual(3) fn fourth(&self) -> u32;
        virtual fn fifth(&self) -> u32;
    }
}

mock_class! {
    class Logger {
        level: u32;
        virtual fn log(&self, line: String);
    }
}

#[test]
fn slot_indices_follow_declaration_and_pins() {
    assert_eq!(Widget::FIRST.slot(), 0);
    assert_eq!(Widget::FOURTH.slot(), 3);
    assert_eq!(Widget::FIFTH.slot(), 4);
    assert_eq!(<Widget as MockableClass>::VIRTUAL_SLOTS, 5);
}

#[test]
fn gaps_have_no_method_name() {
    assert_eq!(
        <Widget as MockableClass>::METHOD_NAMES,
        &[Some("first"), None, None, Some("fourth"), Some("fifth")]
    );
}

#[test]
fn probing_discovers_dispatch_offsets() {
    assert_eq!(method_offset::<Widget>(|w| { w.first(); }), 0);
    assert_eq!(method_offset::<Widget>(|w| { w.fourth(); }), 3);
    assert_eq!(method_offset::<Widget>(|w| { w.fifth(); }), 4);
}

#[test]
fn abi_flavors_reserve_their_cookies() {
    assert_eq!(Abi::Itanium.cookie_count(), 2);
    assert_eq!(Abi::Msvc.cookie_count(), 3);
}

#[test]
fn tables_carry_type_information() {
    let table = VirtualTable::new_for::<Widget>(Abi::Itanium);
    assert_eq!(table.slot_count(), 5);
    assert_eq!(table.type_descriptor().name, "Widget");
    assert_eq!(table.abi(), Abi::Itanium);
}

#[test]
fn fake_objects_match_the_class_layout() {
    let table = VirtualTable::new_for::<Logger>(Abi::host());
    let fake = FakeObject::<Logger>::new(table).unwrap();
    assert_eq!(fake.size(), mem::size_of::<Logger>());

    // vfptr word first, then the data field, padded to word alignment
    assert_eq!(mem::size_of::<Logger>(), 2 * mem::size_of::<usize>());
    assert_eq!(fake.ptr() as usize % mem::align_of::<Logger>(), 0);
}

#[test]
fn fake_data_reads_as_zeroes() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Logger>::new(&ctx).unwrap();
    assert_eq!(mock.get().level, 0);
    assert_eq!(mock.object_size(), Some(mem::size_of::<Logger>()));
}

#[test]
fn mocks_work_under_either_abi() {
    let ctx = MockContext::new();
    for abi in [Abi::Itanium, Abi::Msvc] {
        let mut mock = Mock::<Widget>::with_abi(&ctx, abi).unwrap();
        mock.when(Widget::FOURTH).always_return(44);
        assert_eq!(mock.get().fourth(), 44);
    }
}
