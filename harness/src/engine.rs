// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The comparison engine: drives every test case through a [`DutAdapter`] and
//! the golden model and records a [`Verdict`] for each.

use std::fmt;

use snafu::{ResultExt, Snafu, ensure};

use crate::{
    adapter::{AdapterError, DutAdapter},
    circuit::CircuitSpec,
    signal::{TestCase, VectorError},
    verdict::{RunReport, Verdict},
};

/// `NotStarted -> Running -> {Passed | Failed}`. Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    NotStarted,
    Running,
    Passed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => "not started",
            RunState::Running => "running",
            RunState::Passed => "passed",
            RunState::Failed => "failed",
        }
        .fmt(f)
    }
}

/// What a run does when a test case mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Stop at the first mismatch.
    #[default]
    FailFast,
    /// Check every test case, then fail if any mismatched.
    CollectAll,
}

/// Optional configuration for a [`Run`]. Usually, you can just use
/// [`RunOptions::default()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub policy: MismatchPolicy,

    /// Whether to use the log crate.
    pub log: bool,
}

impl RunOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }

    pub fn collect_all(self) -> Self {
        Self {
            policy: MismatchPolicy::CollectAll,
            ..self
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RunError {
    #[snafu(display(
        "Adapter {adapter} cannot stand in for circuit {circuit}: {reason}"
    ))]
    Interface {
        circuit: String,
        adapter: String,
        reason: String,
    },
    #[snafu(display(
        "Test case {case} does not fit the declaration of circuit {circuit}"
    ))]
    VectorConstraint {
        circuit: String,
        case: String,
        source: VectorError,
    },
    #[snafu(display("Adapter failed on test case {case} of circuit {circuit}"))]
    Adapter {
        circuit: String,
        case: String,
        source: AdapterError,
    },
    #[snafu(display(
        "{failures} test case(s) mismatched the golden model, first:\n{verdict}"
    ))]
    Mismatch {
        verdict: Box<Verdict>,
        failures: usize,
    },
    #[snafu(display("Run of circuit {circuit} has already {state}"))]
    AlreadyFinished { circuit: String, state: RunState },
}

/// Checks that `adapter` exposes exactly the ports `spec` declares.
pub fn check_interface<A: DutAdapter + ?Sized>(
    spec: &CircuitSpec,
    adapter: &A,
) -> Result<(), RunError> {
    let interface_error = |reason: String| RunError::Interface {
        circuit: spec.to_string(),
        adapter: adapter.name().to_string(),
        reason,
    };

    let declared = spec.ports();
    for port in &declared {
        let Some(offered) =
            adapter.ports().iter().find(|offered| offered.name == port.name)
        else {
            return Err(interface_error(format!("missing {port}")));
        };
        if offered != port {
            return Err(interface_error(format!(
                "has {offered}, expected {port}"
            )));
        }
    }
    if let Some(extra) = adapter
        .ports()
        .iter()
        .find(|offered| !declared.iter().any(|port| port.name == offered.name))
    {
        return Err(interface_error(format!("unexpected {extra}")));
    }
    Ok(())
}

/// One pass of test cases over one circuit, against one adapter.
pub struct Run<'spec, A> {
    spec: &'spec CircuitSpec,
    adapter: A,
    options: RunOptions,
    state: RunState,
    verdicts: Vec<Verdict>,
}

impl<'spec, A: DutAdapter> Run<'spec, A> {
    /// Validates `adapter` against `spec` before anything is driven.
    pub fn new(
        spec: &'spec CircuitSpec,
        adapter: A,
        options: RunOptions,
    ) -> Result<Self, RunError> {
        if options.log {
            log::info!("Validating adapter {} against {}", adapter.name(), spec);
        }
        check_interface(spec, &adapter)?;

        Ok(Self {
            spec,
            adapter,
            options,
            state: RunState::NotStarted,
            verdicts: vec![],
        })
    }

    pub fn spec(&self) -> &CircuitSpec {
        self.spec
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Verdicts recorded so far, in the order the test cases were applied.
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Applies every test case in `cases`. A run executes once; afterwards it
    /// can only be reported.
    pub fn execute<I: IntoIterator<Item = TestCase>>(
        &mut self,
        cases: I,
    ) -> Result<(), RunError> {
        ensure!(
            self.state == RunState::NotStarted,
            AlreadyFinishedSnafu {
                circuit: self.spec.name(),
                state: self.state,
            }
        );
        self.state = RunState::Running;

        let mut first_failure = None;
        let mut failures: usize = 0;
        for case in cases {
            let verdict = match self.check(case) {
                Ok(verdict) => verdict,
                Err(error) => {
                    self.state = RunState::Failed;
                    return Err(error);
                }
            };

            if verdict.passed() {
                if self.options.log {
                    log::info!("{verdict}");
                }
            } else {
                if self.options.log {
                    log::error!("{verdict}");
                }
                failures += 1;
                if first_failure.is_none() {
                    first_failure = Some(verdict.clone());
                }
            }
            self.verdicts.push(verdict);

            if failures > 0 && self.options.policy == MismatchPolicy::FailFast {
                break;
            }
        }

        match first_failure {
            Some(verdict) => {
                self.state = RunState::Failed;
                MismatchSnafu {
                    verdict: Box::new(verdict),
                    failures,
                }
                .fail()
            }
            None => {
                self.state = RunState::Passed;
                if self.options.log {
                    log::info!(
                        "{} passed {} test case(s)",
                        self.spec,
                        self.verdicts.len()
                    );
                }
                Ok(())
            }
        }
    }

    /// Drive, settle, sample, and compare one test case.
    fn check(&mut self, case: TestCase) -> Result<Verdict, RunError> {
        let circuit = self.spec.name();
        let label = case.to_string();

        case.inputs
            .validate(circuit, self.spec.inputs())
            .context(VectorConstraintSnafu {
                circuit,
                case: label.as_str(),
            })?;

        if self.options.log {
            log::debug!("Driving {} on {}", case.inputs, self.adapter.name());
        }
        self.adapter.set_inputs(&case.inputs).context(AdapterSnafu {
            circuit,
            case: label.as_str(),
        })?;
        self.adapter.settle().context(AdapterSnafu {
            circuit,
            case: label.as_str(),
        })?;
        let actual = self.adapter.read_outputs().context(AdapterSnafu {
            circuit,
            case: label.as_str(),
        })?;

        let expected =
            self.spec
                .expected(&case.inputs)
                .context(VectorConstraintSnafu {
                    circuit,
                    case: label.as_str(),
                })?;

        Ok(Verdict::compare(self.spec, case, expected, actual))
    }

    /// Hands the recorded verdicts to the reporting side.
    pub fn into_report(self) -> RunReport {
        RunReport {
            circuit: self.spec.to_string(),
            state: self.state,
            verdicts: self.verdicts,
        }
    }
}
