// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Named signals and the vectors of values assigned to them.

use std::fmt;

use snafu::{OptionExt, Snafu, ensure};

use crate::bits::{BitWidth, format_binary};

/// <https://www.digikey.com/en/maker/blogs/2024/verilog-ports-part-7-of-our-verilog-journey>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
        .fmt(f)
    }
}

/// A declared signal of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal {
    pub name: &'static str,
    pub width: BitWidth,
}

impl Signal {
    pub const fn new(name: &'static str, width: BitWidth) -> Self {
        Self { name, width }
    }
}

/// A signal as seen from outside a circuit: a [`Signal`] plus the direction
/// data flows through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    pub name: &'static str,
    pub width: BitWidth,
    pub direction: PortDirection,
}

impl Port {
    pub fn input(signal: Signal) -> Self {
        Self {
            name: signal.name,
            width: signal.width,
            direction: PortDirection::Input,
        }
    }

    pub fn output(signal: Signal) -> Self {
        Self {
            name: signal.name,
            width: signal.width,
            direction: PortDirection::Output,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}:0] {}", self.direction, self.width.bits() - 1, self.name)
    }
}

/// A vector that does not agree with the signals it was built for.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum VectorError {
    #[snafu(display("Vector assigns {signal}, which circuit {circuit} does not declare"))]
    UnknownSignal {
        circuit: &'static str,
        signal: &'static str,
    },
    #[snafu(display("Vector for circuit {circuit} does not assign {signal}"))]
    MissingSignal {
        circuit: &'static str,
        signal: &'static str,
    },
    #[snafu(display("Vector for circuit {circuit} assigns {signal} more than once"))]
    DuplicateSignal {
        circuit: &'static str,
        signal: &'static str,
    },
    #[snafu(display(
        "Vector assigns {value} to {signal} on circuit {circuit}, but {signal} is only {width} bit(s) wide"
    ))]
    OutOfRange {
        circuit: &'static str,
        signal: &'static str,
        value: u64,
        width: BitWidth,
    },
    #[snafu(display(
        "Exhaustive enumeration of circuit {circuit} would need {bits} input bits, more than the limit of {limit}"
    ))]
    InputSpaceTooLarge {
        circuit: &'static str,
        bits: u32,
        limit: u32,
    },
}

/// An ordered assignment of values to named signals.
///
/// Order is the order assignments were made in, which for every vector the
/// harness builds is the declaration order of the circuit's signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SignalVector {
    entries: Vec<(&'static str, u64)>,
}

/// Values driven onto a circuit's inputs.
pub type InputVector = SignalVector;

/// Values sampled from a circuit's outputs.
pub type OutputVector = SignalVector;

impl SignalVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style [`SignalVector::push`].
    pub fn with(mut self, name: &'static str, value: u64) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: &'static str, value: u64) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `signal`, failing if the vector does not assign it.
    pub fn require(
        &self,
        circuit: &'static str,
        signal: &'static str,
    ) -> Result<u64, VectorError> {
        self.get(signal)
            .context(MissingSignalSnafu { circuit, signal })
    }

    /// Checks that this vector assigns exactly the `signals` of `circuit`,
    /// once each, with every value in range.
    pub fn validate(
        &self,
        circuit: &'static str,
        signals: &[Signal],
    ) -> Result<(), VectorError> {
        for (position, (name, value)) in self.entries.iter().enumerate() {
            let signal = signals
                .iter()
                .find(|signal| signal.name == *name)
                .context(UnknownSignalSnafu {
                    circuit,
                    signal: *name,
                })?;
            ensure!(
                !self.entries[..position]
                    .iter()
                    .any(|(earlier, _)| earlier == name),
                DuplicateSignalSnafu {
                    circuit,
                    signal: *name
                }
            );
            ensure!(
                signal.width.contains(*value),
                OutOfRangeSnafu {
                    circuit,
                    signal: *name,
                    value: *value,
                    width: signal.width,
                }
            );
        }
        for signal in signals {
            self.require(circuit, signal.name)?;
        }
        Ok(())
    }

    /// Renders every value raw and in fixed-width binary using the widths in
    /// `signals`, e.g. `x=255 (0b11111111), cin=0 (0b0)`.
    pub fn describe(&self, signals: &[Signal]) -> String {
        self.entries
            .iter()
            .map(|(name, value)| describe_value(name, *value, signals))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `name=value (0b...)`, or just `name=value` when `name` is not among
/// `signals`.
pub fn describe_value(name: &str, value: u64, signals: &[Signal]) -> String {
    match signals.iter().find(|signal| signal.name == name) {
        Some(signal) => {
            format!("{name}={value} ({})", format_binary(value, signal.width))
        }
        None => format!("{name}={value}"),
    }
}

impl FromIterator<(&'static str, u64)> for SignalVector {
    fn from_iter<T: IntoIterator<Item = (&'static str, u64)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SignalVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// One input vector to apply, created once and consumed by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Position within the sequence that produced it.
    pub index: usize,
    pub label: Option<String>,
    pub inputs: InputVector,
}

impl TestCase {
    pub fn new(index: usize, inputs: InputVector) -> Self {
        Self {
            index,
            label: None,
            inputs,
        }
    }

    pub fn labeled(
        index: usize,
        label: impl Into<String>,
        inputs: InputVector,
    ) -> Self {
        Self {
            index,
            label: Some(label.into()),
            inputs,
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if let Some(label) = &self.label {
            write!(f, " ({label})")?;
        }
        Ok(())
    }
}
