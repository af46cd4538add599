// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use arith_verify_harness::{
    behavioral::{BehavioralAdapter, RippleCarryAdder},
    prelude::*,
};
use snafu::{ResultExt, Whatever};

/// Wraps a working adapter and forces one output bit high, the way a
/// stuck-at-1 fault on a wire would.
struct StuckAtOne<A> {
    inner: A,
    signal: &'static str,
    bit: u32,
}

impl<A: DutAdapter> DutAdapter for StuckAtOne<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ports(&self) -> &[Port] {
        self.inner.ports()
    }

    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError> {
        self.inner.set_inputs(inputs)
    }

    fn settle(&mut self) -> Result<(), AdapterError> {
        self.inner.settle()
    }

    fn read_outputs(&self) -> Result<OutputVector, AdapterError> {
        Ok(self
            .inner
            .read_outputs()?
            .iter()
            .map(|(name, value)| {
                if name == self.signal {
                    (name, value | (1 << self.bit))
                } else {
                    (name, value)
                }
            })
            .collect())
    }
}

fn eight() -> BitWidth {
    BitWidth::new(8).expect("8 is a valid width")
}

fn faulty_adder() -> StuckAtOne<BehavioralAdapter<RippleCarryAdder>> {
    StuckAtOne {
        inner: BehavioralAdapter::new(RippleCarryAdder::new(eight())),
        signal: "s",
        bit: 0,
    }
}

#[test]
fn fail_fast_stops_at_first_mismatch() {
    let spec = CircuitSpec::ripple_carry_adder(eight());
    let mut run = Run::new(&spec, faulty_adder(), RunOptions::default_logging())
        .expect("stuck-at fault keeps the interface");

    // the first targeted vector is all zero, so s should be 0 but reads 1
    let error = run
        .execute(vectors::targeted(&spec).expect("valid targets"))
        .expect_err("fault must be caught");
    let RunError::Mismatch { verdict, failures } = &error else {
        panic!("expected a mismatch, got {error}");
    };
    assert_eq!(*failures, 1);
    assert_eq!(verdict.case.index, 0);
    assert_eq!(verdict.outcome(), Outcome::Fail);
    assert_eq!(verdict.mismatches.len(), 1);
    assert_eq!(verdict.mismatches[0].signal, "s");
    assert_eq!(verdict.mismatches[0].expected, Some(0));
    assert_eq!(verdict.mismatches[0].actual, Some(1));
    assert!(
        verdict.diagnostic.contains(
            "expected s=0 (0b00000000), got s=1 (0b00000001)"
        ),
        "{}",
        verdict.diagnostic
    );
    assert!(verdict.diagnostic.contains("x=0 (0b00000000), y=0 (0b00000000), cin=0 (0b0)"));

    assert_eq!(run.state(), RunState::Failed);
    assert_eq!(run.verdicts().len(), 1);
}

#[test]
fn collect_all_records_every_failure() {
    let spec = CircuitSpec::ripple_carry_adder(eight());
    let mut run = Run::new(&spec, faulty_adder(), RunOptions::default().collect_all())
        .expect("stuck-at fault keeps the interface");

    let cases = vectors::targeted(&spec).expect("valid targets");
    let total = cases.len();
    // bit 0 of the sum is wrong exactly when the true sum is even
    let even_sums = vectors::targeted(&spec)
        .expect("valid targets")
        .filter(|case| {
            let expected = spec.expected(&case.inputs).expect("golden model");
            expected.get("s").expect("sum") % 2 == 0
        })
        .count();

    let error = run.execute(cases).expect_err("fault must be caught");
    assert!(matches!(error, RunError::Mismatch { failures, .. } if failures == even_sums));

    let report = run.into_report();
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.verdicts.len(), total);
    assert_eq!(report.failures().count(), even_sums);
}

#[test]
fn rejects_adapter_with_wrong_shift_width() {
    // a shifter built for N = 16 has a 4-bit distance, not the 3 bits of N = 8
    let spec = CircuitSpec::barrel_shifter(eight());
    let adapter = behavioral::for_kind(
        CircuitKind::BarrelShifter,
        BitWidth::new(16).expect("valid width"),
    );
    let error = Run::new(&spec, adapter, RunOptions::default())
        .err()
        .expect("interface mismatch");
    assert!(matches!(error, RunError::Interface { .. }), "{error}");
}

#[test]
fn rejects_adapter_for_another_circuit() {
    let spec = CircuitSpec::full_adder();
    let adapter = behavioral::for_kind(CircuitKind::BarrelShifter, eight());
    assert!(matches!(
        Run::new(&spec, adapter, RunOptions::default()),
        Err(RunError::Interface { .. })
    ));
}

#[test]
fn out_of_range_vector_aborts_before_driving() {
    let spec = CircuitSpec::ripple_carry_adder(eight());
    let mut adapter = BehavioralAdapter::new(RippleCarryAdder::new(eight()));
    let mut run =
        Run::new(&spec, &mut adapter, RunOptions::default()).expect("matching interface");

    let bad = TestCase::new(
        0,
        InputVector::new().with("x", 0x100).with("y", 0).with("cin", 0),
    );
    let error = run.execute([bad]).expect_err("x does not fit 8 bits");
    assert!(matches!(
        error,
        RunError::VectorConstraint {
            source: VectorError::OutOfRange { value: 0x100, .. },
            ..
        }
    ));
    assert_eq!(run.state(), RunState::Failed);
    assert!(run.verdicts().is_empty());
    drop(run);

    // the adapter never saw the vector, so it still has nothing to read
    assert!(matches!(
        adapter.read_outputs(),
        Err(AdapterError::NotReady { .. })
    ));
}

#[test]
fn adapter_rejects_protocol_misuse() {
    let mut adapter = BehavioralAdapter::new(RippleCarryAdder::new(eight()));

    let unknown = adapter.set_inputs(&InputVector::new().with("q", 1));
    assert!(matches!(unknown, Err(AdapterError::UnknownSignal { .. })));

    let output_as_input = adapter.set_inputs(&InputVector::new().with("s", 1));
    assert!(matches!(output_as_input, Err(AdapterError::UnknownSignal { .. })));

    let too_wide = adapter.set_inputs(&InputVector::new().with("cin", 2));
    assert!(matches!(
        too_wide,
        Err(AdapterError::OutOfRange { value: 2, .. })
    ));
}

#[test]
#[snafu::report]
fn finished_runs_cannot_restart() -> Result<(), Whatever> {
    let spec = CircuitSpec::full_adder();
    let mut run = Run::new(
        &spec,
        behavioral::for_kind(spec.kind(), spec.width()),
        RunOptions::default(),
    )
    .whatever_context("setup")?;
    run.execute(vectors::exhaustive(&spec).whatever_context("exhaustive")?)
        .whatever_context("full adder")?;
    assert_eq!(run.state(), RunState::Passed);

    let again = run.execute(vectors::targeted(&spec).whatever_context("targeted")?);
    assert!(matches!(
        again,
        Err(RunError::AlreadyFinished {
            state: RunState::Passed,
            ..
        })
    ));
    Ok(())
}

#[test]
#[snafu::report]
fn repeated_vectors_read_back_identically() -> Result<(), Whatever> {
    let spec = CircuitSpec::barrel_shifter(eight());
    let mut adapter = behavioral::for_kind(spec.kind(), spec.width());

    for case in vectors::random(&spec, &VectorContext::seeded(0xC0FFEE).with_count(50)) {
        adapter.set_inputs(&case.inputs).whatever_context("set_inputs")?;
        adapter.settle().whatever_context("settle")?;
        let first = adapter.read_outputs().whatever_context("first read")?;

        adapter.set_inputs(&case.inputs).whatever_context("set_inputs")?;
        adapter.settle().whatever_context("settle")?;
        let second = adapter.read_outputs().whatever_context("second read")?;

        assert_eq!(first, second, "{}", case.inputs);
    }
    Ok(())
}
