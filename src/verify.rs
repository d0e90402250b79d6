//! Sequence verification over recorded invocations.
//!
//! A [`Sequence`] is an ordered pattern of expectation steps, built from
//! [`Mock::called`](crate::Mock::called) and friends and combined with `+`
//! (concatenation) and `* n` (repetition). [`verify`] counts how many times
//! the whole pattern occurs, greedily and without overlap, in the combined
//! invocation history of every mock the sequence touches, ordered by global
//! invocation ordinal. A call to any method of an involved mock sits in that
//! history, so an interleaved call the pattern never mentions still breaks
//! adjacency.

use std::ops::{Add, Mul};
use std::panic::Location;
use std::rc::Rc;

use log::debug;

use crate::error::{Error, Result};
use crate::invocation::{InvocationRecord, InvocationsSource};
use crate::proxy::InvocationHandlerCollection;

/// One expectation in a sequence: a method of one specific mock plus an
/// argument acceptance test.
#[derive(Clone)]
pub struct Step {
    coll: Rc<InvocationHandlerCollection>,
    slot: usize,
    accepts: Rc<dyn Fn(&dyn InvocationRecord) -> bool>,
    describe: String,
}

impl Step {
    pub(crate) fn new(
        coll: Rc<InvocationHandlerCollection>,
        slot: usize,
        accepts: Rc<dyn Fn(&dyn InvocationRecord) -> bool>,
        describe: String,
    ) -> Self {
        Self {
            coll,
            slot,
            accepts,
            describe,
        }
    }

    fn coll_addr(&self) -> usize {
        Rc::as_ptr(&self.coll) as usize
    }

    fn matches(&self, coll_addr: usize, record: &dyn InvocationRecord) -> bool {
        self.coll_addr() == coll_addr && self.slot == record.slot() && (self.accepts)(record)
    }
}

/// An ordered call pattern across one or more mocks.
#[derive(Clone)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub(crate) fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn describe(&self) -> String {
        let parts: Vec<&str> = self.steps.iter().map(|step| step.describe.as_str()).collect();
        parts.join(", ")
    }

    /// The invocations the pattern is matched against: every record of every
    /// involved mock, whatever method it hit, ordered by global ordinal.
    /// Only calls on mocks the sequence never touches are invisible to it.
    fn relevant_invocations(&self) -> Vec<(usize, Rc<dyn InvocationRecord>)> {
        let mut colls: Vec<&Rc<InvocationHandlerCollection>> = Vec::new();
        for step in &self.steps {
            if !colls.iter().any(|coll| Rc::ptr_eq(coll, &step.coll)) {
                colls.push(&step.coll);
            }
        }

        let mut relevant = Vec::new();
        for coll in colls {
            let addr = Rc::as_ptr(coll) as usize;
            for record in coll.records() {
                relevant.push((addr, record));
            }
        }
        relevant.sort_by_key(|(_, record)| record.ordinal());
        relevant
    }

    /// Greedy non-overlapping scan: at each position either the whole
    /// pattern matches consecutively (count it, skip past it) or the scan
    /// advances one invocation.
    fn count_occurrences(&self) -> (u64, Vec<Rc<dyn InvocationRecord>>) {
        let relevant = self.relevant_invocations();
        let width = self.steps.len();
        let mut count = 0;
        let mut matched = Vec::new();
        let mut at = 0;

        while at + width <= relevant.len() {
            let window = &relevant[at..at + width];
            let hit = self
                .steps
                .iter()
                .zip(window)
                .all(|(step, (addr, record))| step.matches(*addr, record.as_ref()));
            if hit {
                matched.extend(window.iter().map(|(_, record)| Rc::clone(record)));
                count += 1;
                at += width;
            } else {
                at += 1;
            }
        }

        (count, matched)
    }
}

impl Add for Sequence {
    type Output = Sequence;

    fn add(mut self, mut rhs: Sequence) -> Sequence {
        self.steps.append(&mut rhs.steps);
        self
    }
}

impl Mul<usize> for Sequence {
    type Output = Sequence;

    /// Repeats the pattern `times` times in a row. Panics when `times` is
    /// zero; use [`Verification::never`] to assert absence.
    fn mul(self, times: usize) -> Sequence {
        assert!(times > 0, "sequence repetition count must be positive");
        let steps = std::iter::repeat(self.steps)
            .take(times)
            .flatten()
            .collect();
        Sequence { steps }
    }
}

impl Mul<Sequence> for usize {
    type Output = Sequence;

    fn mul(self, sequence: Sequence) -> Sequence {
        sequence * self
    }
}

/// Starts verifying how often `sequence` occurred. The caller's source
/// location is captured here so failure messages point at the test line.
#[track_caller]
pub fn verify(sequence: Sequence) -> Verification {
    Verification {
        sequence,
        location: Location::caller(),
    }
}

enum CountKind {
    Exact,
    AtLeast,
}

/// Pending verification of one sequence; consumed by a count assertion.
#[must_use = "a verification does nothing until a count assertion is called"]
pub struct Verification {
    sequence: Sequence,
    location: &'static Location<'static>,
}

impl Verification {
    pub fn once(self) -> Result<()> {
        self.check(CountKind::Exact, 1)
    }

    pub fn twice(self) -> Result<()> {
        self.check(CountKind::Exact, 2)
    }

    pub fn exactly(self, times: u64) -> Result<()> {
        self.check(CountKind::Exact, times)
    }

    pub fn at_least(self, times: u64) -> Result<()> {
        self.check(CountKind::AtLeast, times)
    }

    pub fn never(self) -> Result<()> {
        self.check(CountKind::Exact, 0)
    }

    fn check(self, kind: CountKind, expected: u64) -> Result<()> {
        let (actual, matched) = self.sequence.count_occurrences();
        let ok = match kind {
            CountKind::Exact => actual == expected,
            CountKind::AtLeast => actual >= expected,
        };
        debug!(
            "sequence [{}] matched {actual} time(s) at {}",
            self.sequence.describe(),
            self.location
        );

        if !ok {
            let expected = match kind {
                CountKind::Exact => format!("exactly {expected}"),
                CountKind::AtLeast => format!("at least {expected}"),
            };
            return Err(Error::SequenceVerification {
                sequence: self.sequence.describe(),
                expected,
                actual,
                location: self.location.to_string(),
            });
        }

        for record in matched {
            record.mark_verified();
        }
        Ok(())
    }
}

/// Asserts that every recorded invocation of the given sources was consumed
/// by an earlier successful verification.
pub fn verify_no_other_invocations(sources: &[&dyn InvocationsSource]) -> Result<()> {
    let mut unverified: Vec<(u64, String)> = Vec::new();
    for source in sources {
        for record in source.invocations() {
            if !record.is_verified() {
                unverified.push((record.ordinal(), record.describe()));
            }
        }
    }

    if unverified.is_empty() {
        return Ok(());
    }

    unverified.sort_by_key(|(ordinal, _)| *ordinal);
    Err(Error::NoMoreInvocations {
        unverified: unverified.into_iter().map(|(_, line)| line).collect(),
    })
}

/// Panic adapter for [`verify`]-style results, for tests that prefer a
/// failure to a `Result`.
pub fn assert_verified(result: Result<()>) {
    if let Err(err) = result {
        panic!("{err}");
    }
}
