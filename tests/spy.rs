use vtmock::{mock_class, verify, Mock, MockContext, MockableClass};

mock_class! {
    #[concrete]
    #[derive(Default)]
    class Counter {
        count: u32;
        virtual fn value(&self) -> u32;
        virtual fn bump(&mut self, by: u32);
    }
}

impl CounterVirtuals for Counter {
    extern "C-unwind" fn value(this: &Counter) -> u32 {
        this.count
    }

    extern "C-unwind" fn bump(this: &mut Counter, by: u32) {
        this.count += by;
    }
}

#[test]
fn concrete_class_dispatches_without_mocking() {
    let mut counter = Counter::default();
    assert_eq!(counter.value(), 0);
    counter.bump(3);
    counter.bump(4);
    assert_eq!(counter.value(), 7);
}

#[test]
fn spied_method_forwards_and_records() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();
    counter.bump(5);

    let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
    spy.spy_on(Counter::VALUE);

    assert_eq!(spy.get().value(), 5);
    assert_eq!(spy.get().value(), 5);
    verify(spy.called(Counter::VALUE)).twice().unwrap();
}

#[test]
fn spied_mutations_reach_the_real_object() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();

    let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
    spy.spy_on(Counter::VALUE);
    spy.spy_on(Counter::BUMP);

    spy.get().bump(10);
    assert_eq!(spy.get().value(), 10);
    verify(spy.called_with(Counter::BUMP, (10,))).once().unwrap();
}

#[test]
fn stub_overrides_the_real_method() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();
    counter.bump(5);

    let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
    spy.when(Counter::VALUE).always_return(42);

    assert_eq!(spy.get().value(), 42);
}

#[test]
fn unstubbed_methods_run_for_real_and_unrecorded() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();

    {
        let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
        spy.when(Counter::VALUE).always_return(1);

        spy.get().bump(3);
        verify(spy.called(Counter::BUMP)).never().unwrap();
    }

    assert_eq!(counter.value(), 3);
}

#[test]
fn dropping_the_spy_restores_the_original() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();
    counter.bump(5);

    {
        let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
        spy.when(Counter::VALUE).always_return(42);
        assert_eq!(spy.get().value(), 42);
    }

    assert_eq!(counter.value(), 5);
}

#[test]
fn reset_returns_a_spy_to_passthrough() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();
    counter.bump(8);

    let mut spy = unsafe { Mock::spy(&ctx, &mut counter) };
    spy.when(Counter::VALUE).always_return(42);
    assert_eq!(spy.get().value(), 42);

    spy.reset();
    assert_eq!(spy.get().value(), 8);
}

#[test]
fn spies_have_no_fake_buffer() {
    let ctx = MockContext::new();
    let mut counter = Counter::default();
    let spy = unsafe { Mock::spy(&ctx, &mut counter) };
    assert_eq!(spy.object_size(), None);
}

mock_class! {
    #[concrete]
    class Gauge {
        level: u32;
        virtual fn level_of(&self) -> u32;
    }

    impl Gauge {
        fn new(level: u32) -> Self {
            Self { level }
        }
    }
}

impl GaugeVirtuals for Gauge {
    extern "C-unwind" fn level_of(this: &Gauge) -> u32 {
        this.level
    }
}

#[test]
fn hooked_constructors_install_the_vtable() {
    let mut gauge = Gauge::new(7);
    assert_eq!(gauge.level_of(), 7);

    // the constructed instance dispatches through a real table, so it can
    // be spied on like any other concrete object
    let ctx = MockContext::new();
    {
        let mut spy = unsafe { Mock::spy(&ctx, &mut gauge) };
        spy.when(Gauge::LEVEL_OF).always_return(99);
        assert_eq!(spy.get().level_of(), 99);
    }
    assert_eq!(gauge.level_of(), 7);
}

mock_class! {
    #[concrete(no_unimpl)]
    #[derive(Default)]
    class Sparse {
        virtual fn first(&self) -> u32;
        virtual(2) fn third(&self) -> u32;
    }
}

impl SparseVirtuals for Sparse {
    extern "C-unwind" fn first(_this: &Sparse) -> u32 {
        1
    }

    extern "C-unwind" fn third(_this: &Sparse) -> u32 {
        3
    }
}

#[test]
fn no_unimpl_gaps_leave_declared_slots_live() {
    let sparse = Sparse::default();
    assert_eq!(sparse.first(), 1);
    assert_eq!(sparse.third(), 3);
    assert_eq!(<Sparse as MockableClass>::VIRTUAL_SLOTS, 3);
    assert_eq!(
        <Sparse as MockableClass>::METHOD_NAMES,
        &[Some("first"), None, Some("third")]
    );
}
