use std::cell::RefCell;
use std::rc::Rc;

use vtmock::{mock_class, Mock, MockContext};

mock_class! {
    class Animal {
        virtual fn legs(&self) -> u32;
        virtual fn eat(&self, food: String) -> bool;
        virtual fn set_weight(&mut self, kg: u32);
    }
}

#[test]
fn queued_returns_serve_in_order() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS)
        .then_return(4)
        .then_return(2)
        .always_return(0);

    let animal = mock.get();
    assert_eq!(animal.legs(), 4);
    assert_eq!(animal.legs(), 2);
    assert_eq!(animal.legs(), 0);
    assert_eq!(animal.legs(), 0);
}

#[test]
fn repeated_return_counts_down() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS).then_return_times(6, 2).always_return(0);

    let animal = mock.get();
    assert_eq!(animal.legs(), 6);
    assert_eq!(animal.legs(), 6);
    assert_eq!(animal.legs(), 0);
}

#[test]
#[should_panic(expected = "unmocked method call: Animal::legs")]
fn unstubbed_method_panics() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.get().legs();
}

#[test]
#[should_panic(expected = "unmatched method call: Animal::eat(\"meat\")")]
fn unmatched_arguments_panic() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::EAT)
        .with(("grass".to_owned(),))
        .always_return(true);

    mock.get().eat("meat".to_owned());
}

#[test]
#[should_panic(expected = "unmatched method call: Animal::legs()")]
fn exhausted_queue_panics() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS).then_return(4);

    let animal = mock.get();
    assert_eq!(animal.legs(), 4);
    animal.legs();
}

#[test]
fn matchers_route_by_argument() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::EAT)
        .with(("grass".to_owned(),))
        .always_return(true);
    mock.when(Animal::EAT)
        .with(("rock".to_owned(),))
        .always_return(false);

    let animal = mock.get();
    assert!(animal.eat("grass".to_owned()));
    assert!(!animal.eat("rock".to_owned()));
    assert!(animal.eat("grass".to_owned()));
}

#[test]
fn later_stub_wins_on_overlap() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::EAT).always_return(false);
    mock.when(Animal::EAT)
        .with(("grass".to_owned(),))
        .always_return(true);

    let animal = mock.get();
    assert!(animal.eat("grass".to_owned()));
    assert!(!animal.eat("pebbles".to_owned()));
}

#[test]
fn predicate_matcher_inspects_arguments() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::EAT).always_return(false);
    mock.when(Animal::EAT)
        .matching(|(food,)| food.len() > 4)
        .always_return(true);

    let animal = mock.get();
    assert!(animal.eat("grapes".to_owned()));
    assert!(!animal.eat("ant".to_owned()));
}

#[test]
fn actions_observe_captured_arguments() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    mock.when(Animal::SET_WEIGHT)
        .always_do(move |(kg,)| sink.borrow_mut().push(kg));

    let animal = mock.get();
    animal.set_weight(12);
    animal.set_weight(15);
    assert_eq!(*seen.borrow(), vec![12, 15]);
}

#[test]
fn then_do_runs_once_then_falls_through() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS)
        .then_do(|_| 8)
        .always_return(4);

    let animal = mock.get();
    assert_eq!(animal.legs(), 8);
    assert_eq!(animal.legs(), 4);
}

#[test]
#[should_panic(expected = "no legs today")]
fn stubbed_panic_propagates() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS).always_panic("no legs today");
    mock.get().legs();
}

#[test]
fn fake_returns_defaults() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.fake(Animal::LEGS);
    mock.fake(Animal::EAT);

    let animal = mock.get();
    assert_eq!(animal.legs(), 0);
    assert!(!animal.eat("anything".to_owned()));
}

#[test]
#[should_panic(expected = "unmocked method call: Animal::legs")]
fn reset_discards_stubs() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS).always_return(4);
    assert_eq!(mock.get().legs(), 4);

    mock.reset();
    mock.get().legs();
}

#[test]
fn reset_allows_restubbing() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Animal>::new(&ctx).unwrap();
    mock.when(Animal::LEGS).always_return(4);
    assert_eq!(mock.get().legs(), 4);

    mock.reset();
    mock.when(Animal::LEGS).always_return(6);
    assert_eq!(mock.get().legs(), 6);
}
