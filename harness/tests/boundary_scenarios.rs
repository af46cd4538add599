// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::env;

use arith_verify_harness::{golden, prelude::*};
use snafu::{ResultExt, Whatever};
use test_case::test_case;

fn init_logging() {
    if env::var("RUST_LOG").is_ok() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

fn eight() -> BitWidth {
    BitWidth::new(8).expect("8 is a valid width")
}

/// Drives `inputs` through a fresh stand-in for `spec` and returns what it
/// read back.
fn apply(spec: &CircuitSpec, inputs: InputVector) -> Result<OutputVector, Whatever> {
    let mut adapter = behavioral::for_kind(spec.kind(), spec.width());
    adapter.set_inputs(&inputs).whatever_context("set_inputs")?;
    adapter.settle().whatever_context("settle")?;
    adapter.read_outputs().whatever_context("read_outputs")
}

#[test]
#[snafu::report]
fn full_adder_exhaustive() -> Result<(), Whatever> {
    init_logging();

    let spec = CircuitSpec::full_adder();
    let adapter = behavioral::for_kind(spec.kind(), spec.width());
    let mut run = Run::new(&spec, adapter, RunOptions::default_logging())
        .whatever_context("Failed to set up full adder run")?;
    run.execute(vectors::exhaustive(&spec).whatever_context("exhaustive")?)
        .whatever_context("Full adder mismatched")?;

    let report = run.into_report();
    assert!(report.passed());
    assert_eq!(report.verdicts.len(), 8);

    let last = report.verdicts.last().expect("eight verdicts");
    assert_eq!(
        last.inputs(),
        &InputVector::new().with("x", 1).with("y", 1).with("cin", 1)
    );
    assert_eq!(last.actual, OutputVector::new().with("s", 1).with("cout", 1));

    Ok(())
}

#[test_case(0xFF, 0x01, 0 => (0x00, 1); "overflow from maximum operand")]
#[test_case(0xFF, 0xFF, 1 => (0xFF, 1); "maximum operands with carry-in")]
#[test_case(0x00, 0xFF, 1 => (0x00, 1); "overflow from carry-in")]
#[test_case(0x12, 0x9A, 1 => (0xAD, 0); "mixed operands with carry-in")]
fn ripple_carry_adder_boundaries(x: u64, y: u64, cin: u64) -> (u64, u64) {
    let spec = CircuitSpec::ripple_carry_adder(eight());
    let inputs = InputVector::new().with("x", x).with("y", y).with("cin", cin);

    let expected = spec.expected(&inputs).expect("golden model");
    let actual = apply(&spec, inputs).expect("stand-in adapter");
    assert_eq!(expected, actual);

    (
        actual.get("s").expect("sum"),
        actual.get("cout").expect("carry-out"),
    )
}

#[test_case(0x80, 1 => 0x00; "most significant bit shifted out")]
#[test_case(0x01, 7 => 0x80; "maximum shift distance")]
#[test_case(0xA5, 0 => 0xA5; "shift by zero is identity")]
#[test_case(0xFF, 4 => 0xF0; "all bits set shifted by half the width")]
fn barrel_shifter_boundaries(x: u64, d: u64) -> u64 {
    let spec = CircuitSpec::barrel_shifter(eight());
    assert_eq!(spec.parameter("D_WIDTH"), Some(3));
    let inputs = InputVector::new().with("x", x).with("d", d);

    let expected = spec.expected(&inputs).expect("golden model");
    let actual = apply(&spec, inputs).expect("stand-in adapter");
    assert_eq!(expected, actual);

    actual.get("z").expect("shifted value")
}

#[test_case(CircuitKind::FullAdder; "full adder")]
#[test_case(CircuitKind::RippleCarryAdder; "ripple carry adder")]
#[test_case(CircuitKind::BarrelShifter; "barrel shifter")]
fn random_run_has_no_mismatches(kind: CircuitKind) {
    init_logging();

    let spec = kind.spec(eight());
    let adapter = behavioral::for_kind(kind, spec.width());
    let mut run = Run::new(&spec, adapter, RunOptions::default()).expect("matching interface");
    let sequence = vectors::random(&spec, &VectorContext::default());
    let seed = sequence.seed().expect("random sequences report their seed");

    if let Err(error) = run.execute(sequence) {
        panic!("seed {seed}: {error}");
    }
    let report = run.into_report();
    assert_eq!(report.verdicts.len(), 100);
    assert_eq!(report.failures().count(), 0);
}

#[test]
#[snafu::report]
fn targeted_runs_pass_at_odd_widths() -> Result<(), Whatever> {
    for bits in [1, 2, 3, 5, 7, 12, 31, 33, 63, 64] {
        let width = BitWidth::new(bits).whatever_context("width")?;
        for kind in CircuitKind::ALL {
            let spec = kind.spec(width);
            let adapter = behavioral::for_kind(kind, width);
            let mut run = Run::new(&spec, adapter, RunOptions::default())
                .whatever_context(format!("Failed to set up {spec}"))?;
            run.execute(vectors::targeted(&spec).whatever_context("targeted")?)
                .whatever_context(format!("{spec} mismatched"))?;
        }
    }
    Ok(())
}

#[test]
fn shifter_exhaustive_matches_law_at_width_five() {
    // D_WIDTH = 3 lets d reach 7, past the width
    let width = BitWidth::new(5).expect("valid width");
    let spec = CircuitSpec::barrel_shifter(width);
    let adapter = behavioral::for_kind(spec.kind(), width);
    let mut run = Run::new(&spec, adapter, RunOptions::default()).expect("matching interface");
    run.execute(vectors::exhaustive(&spec).expect("small input space"))
        .expect("stand-in shifter agrees with golden model");

    let report = run.into_report();
    assert_eq!(report.verdicts.len(), 1 << 8);
    for verdict in &report.verdicts {
        let x = verdict.inputs().get("x").expect("x");
        let d = verdict.inputs().get("d").expect("d");
        assert_eq!(
            verdict.actual.get("z"),
            Some(golden::barrel_shift(x, d, width))
        );
        if d >= 5 {
            assert_eq!(verdict.actual.get("z"), Some(0));
        }
    }
}
