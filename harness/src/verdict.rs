// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::{
    circuit::CircuitSpec,
    engine::RunState,
    signal::{InputVector, OutputVector, TestCase, describe_value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Pass,
    Fail,
}

/// One output whose sampled value differs from the golden model. `None`
/// means the value was missing altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMismatch {
    pub signal: &'static str,
    pub expected: Option<u64>,
    pub actual: Option<u64>,
}

/// The result of checking one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub circuit: &'static str,
    pub case: TestCase,
    pub expected: OutputVector,
    pub actual: OutputVector,
    pub mismatches: Vec<FieldMismatch>,
    pub diagnostic: String,
}

impl Verdict {
    /// Compares `actual` against `expected` on every output `spec` declares.
    pub fn compare(
        spec: &CircuitSpec,
        case: TestCase,
        expected: OutputVector,
        actual: OutputVector,
    ) -> Self {
        let mismatches = spec
            .outputs()
            .iter()
            .filter_map(|signal| {
                let expected = expected.get(signal.name);
                let actual = actual.get(signal.name);
                (expected != actual).then_some(FieldMismatch {
                    signal: signal.name,
                    expected,
                    actual,
                })
            })
            .collect::<Vec<_>>();

        let diagnostic =
            diagnose(spec, &case, &expected, &actual, &mismatches);

        Self {
            circuit: spec.name(),
            case,
            expected,
            actual,
            mismatches,
            diagnostic,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.mismatches.is_empty() {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome() == Outcome::Pass
    }

    pub fn inputs(&self) -> &InputVector {
        &self.case.inputs
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.diagnostic.fmt(f)
    }
}

fn diagnose(
    spec: &CircuitSpec,
    case: &TestCase,
    expected: &OutputVector,
    actual: &OutputVector,
    mismatches: &[FieldMismatch],
) -> String {
    let inputs = case.inputs.describe(spec.inputs());
    let prefix = match &case.label {
        Some(label) => format!("[{} #{} {}] ", spec.name(), case.index, label),
        None => format!("[{} #{}] ", spec.name(), case.index),
    };

    if mismatches.is_empty() {
        return format!(
            "{prefix}Test passed for {inputs}: {}",
            actual.describe(spec.outputs())
        );
    }

    let render = |signal: &str, value: Option<u64>| match value {
        Some(value) => describe_value(signal, value, spec.outputs()),
        None => format!("{signal}=<missing>"),
    };
    let fields = mismatches
        .iter()
        .map(|mismatch| {
            format!(
                "expected {}, got {}",
                render(mismatch.signal, mismatch.expected),
                render(mismatch.signal, mismatch.actual)
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "{prefix}Test failed for {inputs}: {fields}\n    expected: {}\n    actual:   {}",
        expected.describe(spec.outputs()),
        actual.describe(spec.outputs())
    )
}

/// Everything the reporting side needs about one finished (or aborted) run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The circuit with its parameters, e.g. `barrel_shifter #(N=8, D_WIDTH=3)`.
    pub circuit: String,
    pub state: RunState,
    pub verdicts: Vec<Verdict>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }

    pub fn failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|verdict| !verdict.passed())
    }
}
