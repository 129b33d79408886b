#![forbid(unsafe_code)]

use crate::scenarios::Assertion;
use lc3diff_trace::{Register, RegisterSnapshot, normalize_hex_word};
use serde::{Deserialize, Serialize};

/// One register that failed an assertion. `backend` names which snapshot the
/// `actual` value came from, since literal assertions are checked on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDiff {
    pub register: Register,
    pub backend: String,
    pub expected: String,
    pub actual: String,
}

/// Outcome of evaluating every assertion of one scenario. A failed verdict
/// carries the diff for every register that disagreed, not just the first,
/// so one run is enough to see the whole divergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(Vec<RegisterDiff>),
}

impl Verdict {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub fn diffs(&self) -> &[RegisterDiff] {
        match self {
            Self::Passed => &[],
            Self::Failed(diffs) => diffs,
        }
    }
}

/// Evaluates a scenario's assertions against the two snapshots. A scenario
/// passes only if every declared assertion holds.
///
/// Literal expectations are normalized to lowercase hex before comparison.
/// A literal that is not a 4-hex-digit word can never match and shows up in
/// the diff as written.
#[must_use]
pub fn evaluate(
    assertions: &[Assertion],
    reference: &RegisterSnapshot,
    candidate: &RegisterSnapshot,
) -> Verdict {
    let mut diffs = Vec::new();

    for assertion in assertions {
        match assertion {
            Assertion::RegisterEquals { register, expected } => {
                let want = normalize_hex_word(expected).unwrap_or_else(|| expected.clone());
                push_literal_diff(&mut diffs, *register, "reference", &want, reference);
                push_literal_diff(&mut diffs, *register, "candidate", &want, candidate);
            }
            Assertion::BackendsAgree { register } => {
                let want = reference.get(*register);
                let got = candidate.get(*register);
                if want != got {
                    diffs.push(RegisterDiff {
                        register: *register,
                        backend: "candidate".to_string(),
                        expected: want.to_string(),
                        actual: got.to_string(),
                    });
                }
            }
        }
    }

    if diffs.is_empty() {
        Verdict::Passed
    } else {
        Verdict::Failed(diffs)
    }
}

fn push_literal_diff(
    diffs: &mut Vec<RegisterDiff>,
    register: Register,
    backend: &str,
    expected: &str,
    snapshot: &RegisterSnapshot,
) {
    let actual = snapshot.get(register);
    if actual != expected {
        diffs.push(RegisterDiff {
            register,
            backend: backend.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
}
