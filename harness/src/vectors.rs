// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Input vector generation.
//!
//! Three strategies share one shape: each produces a [`VectorSequence`], a
//! lazy iterator of [`TestCase`]s whose length is known before the first
//! vector is drawn. Every vector is in range by construction.

use std::{collections::HashSet, fmt, str::FromStr};

use rand::{SeedableRng, rngs::StdRng};
use snafu::{Snafu, ensure};

use crate::{
    bits::{BitWidth, random_unsigned, wrap},
    circuit::{CircuitKind, CircuitSpec},
    signal::{InputSpaceTooLargeSnafu, InputVector, Signal, TestCase, VectorError},
};

/// How many random vectors a run draws unless told otherwise.
pub const DEFAULT_RANDOM_COUNT: usize = 100;

/// Exhaustive enumeration refuses circuits with more input bits than this.
pub const EXHAUSTIVE_LIMIT_BITS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorMode {
    /// Every combination of input values.
    Exhaustive,
    /// A curated list of boundary conditions.
    Targeted,
    /// Independent uniform draws.
    Random,
}

impl VectorMode {
    pub const ALL: [VectorMode; 3] =
        [VectorMode::Exhaustive, VectorMode::Targeted, VectorMode::Random];

    pub fn name(self) -> &'static str {
        match self {
            VectorMode::Exhaustive => "exhaustive",
            VectorMode::Targeted => "targeted",
            VectorMode::Random => "random",
        }
    }

    /// The modes a circuit runs unless told otherwise: exhaustive
    /// for the full adder, targeted then random for the wider circuits.
    pub fn defaults_for(kind: CircuitKind) -> &'static [VectorMode] {
        match kind {
            CircuitKind::FullAdder => &[VectorMode::Exhaustive],
            CircuitKind::RippleCarryAdder | CircuitKind::BarrelShifter => {
                &[VectorMode::Targeted, VectorMode::Random]
            }
        }
    }
}

impl fmt::Display for VectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Debug, Snafu)]
#[snafu(display(
    "Unknown vector mode `{name}` (expected exhaustive, targeted or random)"
))]
pub struct UnknownModeError {
    name: String,
}

impl FromStr for VectorMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VectorMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| UnknownModeError { name: s.to_string() })
    }
}

/// Parameters for random generation, threaded explicitly into each sequence
/// instead of drawing from process-wide random state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorContext {
    /// Fixes the random sequence. When `None`, a seed is drawn from entropy
    /// and reported through [`VectorSequence::seed`].
    pub seed: Option<u64>,

    /// The number of random vectors to draw.
    pub count: usize,
}

impl Default for VectorContext {
    fn default() -> Self {
        Self {
            seed: None,
            count: DEFAULT_RANDOM_COUNT,
        }
    }
}

impl VectorContext {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn with_count(self, count: usize) -> Self {
        Self { count, ..self }
    }
}

enum Source {
    Exhaustive { signals: Vec<Signal> },
    Targeted(std::vec::IntoIter<TestCase>),
    Random { signals: Vec<Signal>, rng: StdRng },
}

/// A finite, single-use sequence of test cases.
pub struct VectorSequence {
    mode: VectorMode,
    source: Source,
    seed: Option<u64>,
    next_index: usize,
    len: usize,
}

impl VectorSequence {
    pub fn mode(&self) -> VectorMode {
        self.mode
    }

    /// The seed a random sequence was drawn with.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Iterator for VectorSequence {
    type Item = TestCase;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.len {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;

        match &mut self.source {
            Source::Exhaustive { signals } => {
                Some(TestCase::new(index, decode_combination(signals, index as u64)))
            }
            Source::Targeted(cases) => cases.next(),
            Source::Random { signals, rng } => {
                let inputs = signals
                    .iter()
                    .map(|signal| (signal.name, random_unsigned(rng, signal.width)))
                    .collect();
                Some(TestCase::new(index, inputs))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VectorSequence {}

/// Splits `combination` into one field per signal, the first declared signal
/// taking the most significant bits.
fn decode_combination(signals: &[Signal], combination: u64) -> InputVector {
    let mut offset: u32 = signals.iter().map(|signal| signal.width.bits()).sum();
    signals
        .iter()
        .map(|signal| {
            offset -= signal.width.bits();
            let value = wrap(u128::from(combination >> offset), signal.width);
            (signal.name, value)
        })
        .collect()
}

/// Every combination of `spec`'s inputs in lexicographic order.
pub fn exhaustive(spec: &CircuitSpec) -> Result<VectorSequence, VectorError> {
    let bits: u32 = spec.inputs().iter().map(|signal| signal.width.bits()).sum();
    ensure!(
        bits <= EXHAUSTIVE_LIMIT_BITS,
        InputSpaceTooLargeSnafu {
            circuit: spec.name(),
            bits,
            limit: EXHAUSTIVE_LIMIT_BITS,
        }
    );

    Ok(VectorSequence {
        mode: VectorMode::Exhaustive,
        source: Source::Exhaustive {
            signals: spec.inputs().to_vec(),
        },
        seed: None,
        next_index: 0,
        len: 1usize << bits,
    })
}

/// The curated boundary vectors for `spec`'s circuit.
pub fn targeted(spec: &CircuitSpec) -> Result<VectorSequence, VectorError> {
    let candidates = match spec.kind() {
        CircuitKind::FullAdder => full_adder_targets(),
        CircuitKind::RippleCarryAdder => ripple_carry_adder_targets(spec.width()),
        CircuitKind::BarrelShifter => barrel_shifter_targets(spec.width()),
    };
    let cases = select_targets(spec, candidates)?;

    Ok(VectorSequence {
        mode: VectorMode::Targeted,
        len: cases.len(),
        source: Source::Targeted(cases.into_iter()),
        seed: None,
        next_index: 0,
    })
}

/// Narrow widths can fold two constants onto the same vector, or ask for a
/// shift distance `d` cannot hold. Those candidates are dropped; any other
/// invalid candidate is an error.
fn select_targets(
    spec: &CircuitSpec,
    candidates: Vec<Target>,
) -> Result<Vec<TestCase>, VectorError> {
    let distance = spec.input("d");
    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(candidates.len());
    for (label, inputs) in candidates {
        if let Some(distance) = distance {
            if inputs.get("d").is_some_and(|d| !distance.width.contains(d)) {
                continue;
            }
        }
        inputs.validate(spec.name(), spec.inputs())?;
        if seen.insert(inputs.clone()) {
            cases.push(TestCase::labeled(cases.len(), label, inputs));
        }
    }
    Ok(cases)
}

/// `context.count` vectors with every input drawn uniformly from its range.
pub fn random(spec: &CircuitSpec, context: &VectorContext) -> VectorSequence {
    let seed = context.seed.unwrap_or_else(rand::random);
    VectorSequence {
        mode: VectorMode::Random,
        source: Source::Random {
            signals: spec.inputs().to_vec(),
            rng: StdRng::seed_from_u64(seed),
        },
        seed: Some(seed),
        next_index: 0,
        len: context.count,
    }
}

/// Dispatches to [`exhaustive`], [`targeted`] or [`random`].
pub fn generate(
    spec: &CircuitSpec,
    mode: VectorMode,
    context: &VectorContext,
) -> Result<VectorSequence, VectorError> {
    match mode {
        VectorMode::Exhaustive => exhaustive(spec),
        VectorMode::Targeted => targeted(spec),
        VectorMode::Random => Ok(random(spec, context)),
    }
}

type Target = (&'static str, InputVector);

fn adder_inputs(x: u64, y: u64, cin: u64) -> InputVector {
    InputVector::with_capacity(3)
        .with("x", x)
        .with("y", y)
        .with("cin", cin)
}

fn full_adder_targets() -> Vec<Target> {
    vec![
        ("all zero", adder_inputs(0, 0, 0)),
        ("single operand", adder_inputs(1, 0, 0)),
        ("carry from carry-in", adder_inputs(0, 1, 1)),
        ("carry generate", adder_inputs(1, 1, 0)),
        ("all set", adder_inputs(1, 1, 1)),
    ]
}

fn ripple_carry_adder_targets(width: BitWidth) -> Vec<Target> {
    let max = width.max_value();
    let reduce = |value: u64| wrap(u128::from(value), width);
    let alternating = reduce(0x5555_5555_5555_5555);
    vec![
        ("all zero", adder_inputs(0, 0, 0)),
        ("unit operands", adder_inputs(1, 1, 0)),
        ("unit operands with carry-in", adder_inputs(1, 1, 1)),
        ("overflow from maximum operand", adder_inputs(max, 1, 0)),
        ("overflow from carry-in", adder_inputs(0, max, 1)),
        ("mixed operands with carry-in", adder_inputs(reduce(0x12), reduce(0x9A), 1)),
        ("maximum operands with carry-in", adder_inputs(max, max, 1)),
        (
            "carry propagates through every bit",
            adder_inputs(alternating, !alternating & max, 1),
        ),
    ]
}

fn barrel_shifter_targets(width: BitWidth) -> Vec<Target> {
    let shift = |x: u64, d: u64| InputVector::with_capacity(2).with("x", x).with("d", d);
    let n = u64::from(width.bits());
    let widest_distance = width.shift_amount().max_value();
    vec![
        ("shift by zero is identity", shift(0x01, 0)),
        ("shift by one", shift(0x01, 1)),
        ("shift by two", shift(0x01, 2)),
        ("all bits set shifted by half the width", shift(width.max_value(), n / 2)),
        ("most significant bit shifted out", shift(width.msb(), 1)),
        ("maximum shift distance", shift(0x01, n - 1)),
        ("largest encodable distance", shift(width.max_value(), widest_distance)),
    ]
}
