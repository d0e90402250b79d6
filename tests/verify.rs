use vtmock::{
    mock_class, verify, verify_no_other_invocations, Error, Mock, MockContext,
};

mock_class! {
    class Turnstile {
        virtual fn push(&self) -> bool;
        virtual fn coin(&self, value: u32);
    }
}

mock_class! {
    class Display {
        virtual fn show(&self, message: String);
    }
}

fn exercised_mock(ctx: &MockContext) -> Mock<Turnstile> {
    let mut mock = Mock::<Turnstile>::new(ctx).unwrap();
    mock.when(Turnstile::PUSH).always_return(false);
    mock.when(Turnstile::COIN).always_do(|_| ());
    mock
}

#[test]
fn counts_single_method_calls() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    let turnstile = mock.get();
    turnstile.push();
    turnstile.coin(5);
    turnstile.push();

    verify(mock.called(Turnstile::PUSH)).exactly(2).unwrap();
    verify(mock.called(Turnstile::PUSH)).at_least(1).unwrap();
    verify(mock.called(Turnstile::COIN)).once().unwrap();
    verify(mock.called_with(Turnstile::COIN, (5,))).once().unwrap();
    verify(mock.called_with(Turnstile::COIN, (10,))).never().unwrap();
}

#[test]
fn count_mismatch_reports_details() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    mock.get().push();
    mock.get().push();

    let err = verify(mock.called(Turnstile::PUSH)).exactly(5).unwrap_err();
    match err {
        Error::SequenceVerification {
            sequence,
            expected,
            actual,
            location,
        } => {
            assert_eq!(sequence, "Turnstile::push(..)");
            assert_eq!(expected, "exactly 5");
            assert_eq!(actual, 2);
            assert!(location.contains("verify.rs"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn concatenated_sequences_match_in_order() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    let turnstile = mock.get();
    turnstile.coin(5);
    turnstile.push();
    turnstile.coin(5);
    turnstile.push();

    verify(mock.called(Turnstile::COIN) + mock.called(Turnstile::PUSH))
        .twice()
        .unwrap();
    // the reversed pattern only fits once, between the first push and the
    // second coin
    verify(mock.called(Turnstile::PUSH) + mock.called(Turnstile::COIN))
        .once()
        .unwrap();
}

#[test]
fn interleaved_calls_break_adjacency() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    // the coin call sits between the pushes, so they never run back to back
    let turnstile = mock.get();
    turnstile.push();
    turnstile.coin(5);
    turnstile.push();

    verify(mock.called(Turnstile::PUSH) * 2).never().unwrap();
    verify(
        mock.called(Turnstile::PUSH)
            + mock.called(Turnstile::COIN)
            + mock.called(Turnstile::PUSH),
    )
    .once()
    .unwrap();
}

#[test]
fn calls_on_uninvolved_mocks_are_ignored() {
    let ctx = MockContext::new();
    let mut turnstile = exercised_mock(&ctx);
    let mut display = Mock::<Display>::new(&ctx).unwrap();
    display.when(Display::SHOW).always_do(|_| ());

    turnstile.get().push();
    display.get().show("thank you".to_owned());
    turnstile.get().push();

    // the display call has an ordinal between the pushes, but the sequence
    // names no display method, so that mock's history is out of scope
    verify(turnstile.called(Turnstile::PUSH) * 2).once().unwrap();
}

#[test]
fn repetition_multiplies_the_pattern() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    let turnstile = mock.get();
    for _ in 0..4 {
        turnstile.push();
    }

    verify(mock.called(Turnstile::PUSH) * 2).twice().unwrap();
    verify(2 * mock.called(Turnstile::PUSH)).twice().unwrap();
    verify(mock.called(Turnstile::PUSH) * 3).once().unwrap();
}

#[test]
#[should_panic(expected = "sequence repetition count must be positive")]
fn zero_repetition_is_rejected() {
    let ctx = MockContext::new();
    let mock = exercised_mock(&ctx);
    let _ = mock.called(Turnstile::PUSH) * 0;
}

#[test]
fn ordering_spans_mocks_sharing_a_context() {
    let ctx = MockContext::new();
    let mut turnstile = exercised_mock(&ctx);
    let mut display = Mock::<Display>::new(&ctx).unwrap();
    display.when(Display::SHOW).always_do(|_| ());

    turnstile.get().push();
    display.get().show("locked".to_owned());

    verify(turnstile.called(Turnstile::PUSH) + display.called(Display::SHOW))
        .once()
        .unwrap();
    verify(display.called(Display::SHOW) + turnstile.called(Turnstile::PUSH))
        .never()
        .unwrap();
}

#[test]
fn unverified_remainder_is_reported() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);

    let turnstile = mock.get();
    turnstile.push();
    turnstile.coin(5);

    verify(mock.called(Turnstile::PUSH)).once().unwrap();

    let err = verify_no_other_invocations(&[&mock]).unwrap_err();
    match err {
        Error::NoMoreInvocations { unverified } => {
            assert_eq!(unverified.len(), 1);
            assert!(unverified[0].contains("Turnstile::coin(5)"));
        }
        other => panic!("unexpected error: {other}"),
    }

    verify(mock.called(Turnstile::COIN)).once().unwrap();
    verify_no_other_invocations(&[&mock]).unwrap();
}

#[test]
fn rejected_calls_still_enter_the_history() {
    let ctx = MockContext::new();
    let mut mock = Mock::<Turnstile>::new(&ctx).unwrap();
    mock.when(Turnstile::COIN).with((10,)).always_do(|_| ());

    // the call panics as unmatched, but the invocation is recorded first
    let rejected = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        mock.get().coin(3);
    }));
    assert!(rejected.is_err());

    let err = verify_no_other_invocations(&[&mock]).unwrap_err();
    match err {
        Error::NoMoreInvocations { unverified } => {
            assert_eq!(unverified.len(), 1);
            assert!(unverified[0].contains("Turnstile::coin(3)"));
        }
        other => panic!("unexpected error: {other}"),
    }

    verify(mock.called_with(Turnstile::COIN, (3,))).once().unwrap();
    verify_no_other_invocations(&[&mock]).unwrap();
}

#[test]
fn failed_verification_leaves_history_unconsumed() {
    let ctx = MockContext::new();
    let mut mock = exercised_mock(&ctx);
    mock.get().push();

    assert!(verify(mock.called(Turnstile::PUSH)).twice().is_err());
    assert!(verify_no_other_invocations(&[&mock]).is_err());

    verify(mock.called(Turnstile::PUSH)).once().unwrap();
    verify_no_other_invocations(&[&mock]).unwrap();
}
