// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Static descriptions of the circuits the harness knows how to check.

use std::{fmt, str::FromStr};

use snafu::Snafu;

use crate::{
    bits::BitWidth,
    golden,
    signal::{InputVector, OutputVector, Port, Signal, VectorError},
};

/// Computes the expected outputs of a circuit for one input vector.
pub type GoldenModel =
    fn(&CircuitSpec, &InputVector) -> Result<OutputVector, VectorError>;

/// The families of circuit the harness ships golden models for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitKind {
    FullAdder,
    RippleCarryAdder,
    BarrelShifter,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 3] = [
        CircuitKind::FullAdder,
        CircuitKind::RippleCarryAdder,
        CircuitKind::BarrelShifter,
    ];

    /// The source-level module name.
    pub fn name(self) -> &'static str {
        match self {
            CircuitKind::FullAdder => "full_adder",
            CircuitKind::RippleCarryAdder => "ripple_carry_adder",
            CircuitKind::BarrelShifter => "barrel_shifter",
        }
    }

    /// Builds the spec for this kind at data width `width`. The full adder is
    /// always one bit wide and ignores `width`.
    pub fn spec(self, width: BitWidth) -> CircuitSpec {
        match self {
            CircuitKind::FullAdder => CircuitSpec::full_adder(),
            CircuitKind::RippleCarryAdder => {
                CircuitSpec::ripple_carry_adder(width)
            }
            CircuitKind::BarrelShifter => CircuitSpec::barrel_shifter(width),
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Debug, Snafu)]
#[snafu(display(
    "Unknown circuit `{name}` (expected one of full_adder, ripple_carry_adder, barrel_shifter)"
))]
pub struct UnknownCircuitError {
    name: String,
}

impl FromStr for CircuitKind {
    type Err = UnknownCircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CircuitKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownCircuitError { name: s.to_string() })
    }
}

/// A circuit type: its signals, parameters and golden model. Built once and
/// only ever read afterwards.
#[derive(Debug, Clone)]
pub struct CircuitSpec {
    kind: CircuitKind,
    width: BitWidth,
    parameters: Vec<(&'static str, u64)>,
    inputs: Vec<Signal>,
    outputs: Vec<Signal>,
    golden: GoldenModel,
}

impl CircuitSpec {
    /// Inputs `x`, `y`, `cin` and outputs `s`, `cout`, all one bit.
    pub fn full_adder() -> Self {
        let bit = BitWidth::ONE;
        Self {
            kind: CircuitKind::FullAdder,
            width: bit,
            parameters: vec![],
            inputs: vec![
                Signal::new("x", bit),
                Signal::new("y", bit),
                Signal::new("cin", bit),
            ],
            outputs: vec![Signal::new("s", bit), Signal::new("cout", bit)],
            golden: golden::full_adder_model,
        }
    }

    /// Inputs `x`, `y` of width `N` and one-bit `cin`; outputs `s` of width
    /// `N` and one-bit `cout`.
    pub fn ripple_carry_adder(width: BitWidth) -> Self {
        Self {
            kind: CircuitKind::RippleCarryAdder,
            width,
            parameters: vec![("N", u64::from(width.bits()))],
            inputs: vec![
                Signal::new("x", width),
                Signal::new("y", width),
                Signal::new("cin", BitWidth::ONE),
            ],
            outputs: vec![
                Signal::new("s", width),
                Signal::new("cout", BitWidth::ONE),
            ],
            golden: golden::ripple_carry_adder_model,
        }
    }

    /// Input `x` of width `N` and shift distance `d` of width
    /// `D_WIDTH = ceil(log2(N))`; output `z` of width `N`.
    pub fn barrel_shifter(width: BitWidth) -> Self {
        let shift_width = width.shift_amount();
        Self {
            kind: CircuitKind::BarrelShifter,
            width,
            parameters: vec![
                ("N", u64::from(width.bits())),
                ("D_WIDTH", u64::from(shift_width.bits())),
            ],
            inputs: vec![Signal::new("x", width), Signal::new("d", shift_width)],
            outputs: vec![Signal::new("z", width)],
            golden: golden::barrel_shifter_model,
        }
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The data width `N`.
    pub fn width(&self) -> BitWidth {
        self.width
    }

    pub fn parameters(&self) -> &[(&'static str, u64)] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<u64> {
        self.parameters
            .iter()
            .find(|(parameter, _)| *parameter == name)
            .map(|(_, value)| *value)
    }

    pub fn inputs(&self) -> &[Signal] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<Signal> {
        self.inputs.iter().copied().find(|signal| signal.name == name)
    }

    /// Inputs followed by outputs, in declaration order.
    pub fn ports(&self) -> Vec<Port> {
        self.inputs
            .iter()
            .copied()
            .map(Port::input)
            .chain(self.outputs.iter().copied().map(Port::output))
            .collect()
    }

    /// Every declared signal, inputs first.
    pub fn signals(&self) -> Vec<Signal> {
        self.inputs.iter().chain(&self.outputs).copied().collect()
    }

    /// Runs the golden model on `inputs`.
    pub fn expected(
        &self,
        inputs: &InputVector,
    ) -> Result<OutputVector, VectorError> {
        (self.golden)(self, inputs)
    }
}

impl fmt::Display for CircuitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if !self.parameters.is_empty() {
            let parameters = self
                .parameters
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " #({parameters})")?;
        }
        Ok(())
    }
}
