// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Gate-level stand-ins for the circuits under test.
//!
//! These models are built the way the hardware is, bit by bit out of gates
//! and multiplexers, and deliberately share no arithmetic with
//! [`crate::golden`]. Wrapped in a [`BehavioralAdapter`] they let the harness
//! be exercised without an external simulator.

use snafu::OptionExt;

use crate::{
    adapter::{
        AdapterError, DutAdapter, NotReadySnafu, check_input, output_ports,
    },
    bits::BitWidth,
    circuit::CircuitKind,
    signal::{InputVector, OutputVector, Port, PortDirection, Signal},
};

/// A circuit with no state: its outputs are a function of its inputs alone.
pub trait Combinational {
    fn name(&self) -> &'static str;

    fn ports(&self) -> Vec<Port>;

    /// Computes the outputs. `inputs` assigns every input port with an
    /// in-range value.
    fn evaluate(&self, inputs: &InputVector) -> OutputVector;
}

fn bits_of(value: u64, width: BitWidth) -> Vec<bool> {
    (0..width.bits()).map(|bit| (value >> bit) & 1 == 1).collect()
}

fn value_of(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .fold(0, |value, (bit, set)| value | (u64::from(*set) << bit))
}

/// One-bit full adder out of two half adders and an OR gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAdderCell;

impl FullAdderCell {
    /// `(sum, carry_out)`.
    pub fn add(x: bool, y: bool, cin: bool) -> (bool, bool) {
        let propagate = x ^ y;
        let generate = x & y;
        (propagate ^ cin, generate | (propagate & cin))
    }
}

impl Combinational for FullAdderCell {
    fn name(&self) -> &'static str {
        CircuitKind::FullAdder.name()
    }

    fn ports(&self) -> Vec<Port> {
        let bit = BitWidth::ONE;
        vec![
            Port::input(Signal::new("x", bit)),
            Port::input(Signal::new("y", bit)),
            Port::input(Signal::new("cin", bit)),
            Port::output(Signal::new("s", bit)),
            Port::output(Signal::new("cout", bit)),
        ]
    }

    fn evaluate(&self, inputs: &InputVector) -> OutputVector {
        let bit = |name: &str| inputs.get(name).unwrap_or(0) & 1 == 1;
        let (sum, cout) = Self::add(bit("x"), bit("y"), bit("cin"));
        OutputVector::with_capacity(2)
            .with("s", u64::from(sum))
            .with("cout", u64::from(cout))
    }
}

/// `N` full-adder cells with each carry-out wired to the next carry-in.
#[derive(Debug, Clone, Copy)]
pub struct RippleCarryAdder {
    width: BitWidth,
}

impl RippleCarryAdder {
    pub fn new(width: BitWidth) -> Self {
        Self { width }
    }
}

impl Combinational for RippleCarryAdder {
    fn name(&self) -> &'static str {
        CircuitKind::RippleCarryAdder.name()
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Signal::new("x", self.width)),
            Port::input(Signal::new("y", self.width)),
            Port::input(Signal::new("cin", BitWidth::ONE)),
            Port::output(Signal::new("s", self.width)),
            Port::output(Signal::new("cout", BitWidth::ONE)),
        ]
    }

    fn evaluate(&self, inputs: &InputVector) -> OutputVector {
        let x = bits_of(inputs.get("x").unwrap_or(0), self.width);
        let y = bits_of(inputs.get("y").unwrap_or(0), self.width);
        let mut carry = inputs.get("cin").unwrap_or(0) & 1 == 1;

        let mut sum = Vec::with_capacity(x.len());
        for (x, y) in x.into_iter().zip(y) {
            let (bit, carry_out) = FullAdderCell::add(x, y, carry);
            sum.push(bit);
            carry = carry_out;
        }

        OutputVector::with_capacity(2)
            .with("s", value_of(&sum))
            .with("cout", u64::from(carry))
    }
}

/// A logarithmic left shifter: stage `k` shifts by `2^k` when bit `k` of the
/// distance is set, each stage a row of 2:1 multiplexers.
#[derive(Debug, Clone, Copy)]
pub struct BarrelShifter {
    width: BitWidth,
}

impl BarrelShifter {
    pub fn new(width: BitWidth) -> Self {
        Self { width }
    }
}

impl Combinational for BarrelShifter {
    fn name(&self) -> &'static str {
        CircuitKind::BarrelShifter.name()
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Signal::new("x", self.width)),
            Port::input(Signal::new("d", self.width.shift_amount())),
            Port::output(Signal::new("z", self.width)),
        ]
    }

    fn evaluate(&self, inputs: &InputVector) -> OutputVector {
        let distance = inputs.get("d").unwrap_or(0);
        let mut lanes = bits_of(inputs.get("x").unwrap_or(0), self.width);

        for stage in 0..self.width.shift_amount().bits() {
            if (distance >> stage) & 1 == 0 {
                continue;
            }
            let amount = 1usize << stage;
            lanes = (0..lanes.len())
                .map(|lane| lane >= amount && lanes[lane - amount])
                .collect();
        }

        OutputVector::with_capacity(1).with("z", value_of(&lanes))
    }
}

/// Adapts a [`Combinational`] model to the [`DutAdapter`] protocol: inputs
/// are latched by `set_inputs` and only reach the outputs on `settle`.
pub struct BehavioralAdapter<C> {
    circuit: C,
    ports: Vec<Port>,
    pinned: InputVector,
    outputs: Option<OutputVector>,
}

impl<C: Combinational> BehavioralAdapter<C> {
    /// Every input starts out driven low.
    pub fn new(circuit: C) -> Self {
        let ports = circuit.ports();
        let pinned = ports
            .iter()
            .filter(|port| port.direction == PortDirection::Input)
            .map(|port| (port.name, 0))
            .collect();
        Self {
            circuit,
            ports,
            pinned,
            outputs: None,
        }
    }

    pub fn circuit(&self) -> &C {
        &self.circuit
    }
}

/// A boxed stand-in for `kind` at data width `width`.
pub fn for_kind(kind: CircuitKind, width: BitWidth) -> Box<dyn DutAdapter> {
    match kind {
        CircuitKind::FullAdder => Box::new(BehavioralAdapter::new(FullAdderCell)),
        CircuitKind::RippleCarryAdder => {
            Box::new(BehavioralAdapter::new(RippleCarryAdder::new(width)))
        }
        CircuitKind::BarrelShifter => {
            Box::new(BehavioralAdapter::new(BarrelShifter::new(width)))
        }
    }
}

impl<C: Combinational> DutAdapter for BehavioralAdapter<C> {
    fn name(&self) -> &str {
        self.circuit.name()
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError> {
        for (signal, value) in inputs.iter() {
            check_input(self.circuit.name(), &self.ports, signal, value)?;
        }
        self.pinned = self
            .pinned
            .iter()
            .map(|(signal, previous)| {
                (signal, inputs.get(signal).unwrap_or(previous))
            })
            .collect();
        Ok(())
    }

    fn settle(&mut self) -> Result<(), AdapterError> {
        self.outputs = Some(self.circuit.evaluate(&self.pinned));
        Ok(())
    }

    fn read_outputs(&self) -> Result<OutputVector, AdapterError> {
        let outputs = self.outputs.as_ref().context(NotReadySnafu {
            circuit: self.circuit.name(),
        })?;
        output_ports(&self.ports)
            .map(|port| {
                outputs.get(port.name).map(|value| (port.name, value)).ok_or_else(
                    || AdapterError::MissingOutput {
                        circuit: self.circuit.name().to_string(),
                        signal: port.name.to_string(),
                    },
                )
            })
            .collect()
    }
}
