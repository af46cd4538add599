// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The boundary between the comparison engine and whatever realizes the
//! circuit under test.

use std::error::Error;

use snafu::{OptionExt, Snafu, ensure};

use crate::{
    bits::BitWidth,
    signal::{InputVector, OutputVector, Port, PortDirection},
};

/// Misuse of a [`DutAdapter`], or a failure inside its backend. These are
/// never retried: the circuits are combinational, so the same call would fail
/// the same way again.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AdapterError {
    #[snafu(display(
        "Signal {signal} is not an input of circuit {circuit}"
    ))]
    UnknownSignal { circuit: String, signal: String },
    #[snafu(display(
        "Value {value} does not fit input {signal} of circuit {circuit}, which is {width} bit(s) wide"
    ))]
    OutOfRange {
        circuit: String,
        signal: String,
        value: u64,
        width: BitWidth,
    },
    #[snafu(display(
        "Circuit {circuit} has not settled since it was created, so it has no outputs to read"
    ))]
    NotReady { circuit: String },
    #[snafu(display("Circuit {circuit} did not produce output {signal}"))]
    MissingOutput { circuit: String, signal: String },
    #[snafu(display("Backend for circuit {circuit} failed: {source}"))]
    Backend {
        circuit: String,
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Drives and samples one instance of a circuit under test.
///
/// The engine only ever calls [`DutAdapter::set_inputs`], then
/// [`DutAdapter::settle`], then [`DutAdapter::read_outputs`], one vector at a
/// time. Implement this once per way of realizing a circuit.
pub trait DutAdapter {
    /// The name of the circuit instance, used in diagnostics.
    fn name(&self) -> &str;

    /// The interface the adapter exposes.
    fn ports(&self) -> &[Port];

    /// Assigns every input named in `inputs`. Inputs not named keep their
    /// previous value.
    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError>;

    /// Advances the circuit by one evaluation step, after which its outputs
    /// reflect the inputs applied so far.
    fn settle(&mut self) -> Result<(), AdapterError>;

    /// Samples every output port.
    fn read_outputs(&self) -> Result<OutputVector, AdapterError>;
}

impl<A: DutAdapter + ?Sized> DutAdapter for &mut A {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ports(&self) -> &[Port] {
        (**self).ports()
    }

    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError> {
        (**self).set_inputs(inputs)
    }

    fn settle(&mut self) -> Result<(), AdapterError> {
        (**self).settle()
    }

    fn read_outputs(&self) -> Result<OutputVector, AdapterError> {
        (**self).read_outputs()
    }
}

impl<A: DutAdapter + ?Sized> DutAdapter for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ports(&self) -> &[Port] {
        (**self).ports()
    }

    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError> {
        (**self).set_inputs(inputs)
    }

    fn settle(&mut self) -> Result<(), AdapterError> {
        (**self).settle()
    }

    fn read_outputs(&self) -> Result<OutputVector, AdapterError> {
        (**self).read_outputs()
    }
}

/// Finds the input port `signal` among `ports` and checks that `value` fits
/// it. Adapters call this before touching their backend.
pub fn check_input(
    circuit: &str,
    ports: &[Port],
    signal: &str,
    value: u64,
) -> Result<Port, AdapterError> {
    let port = ports
        .iter()
        .copied()
        .find(|port| {
            port.name == signal && port.direction == PortDirection::Input
        })
        .context(UnknownSignalSnafu { circuit, signal })?;
    ensure!(
        port.width.contains(value),
        OutOfRangeSnafu {
            circuit,
            signal,
            value,
            width: port.width,
        }
    );
    Ok(port)
}

/// The output ports among `ports`, in declaration order.
pub fn output_ports(ports: &[Port]) -> impl Iterator<Item = Port> + '_ {
    ports
        .iter()
        .copied()
        .filter(|port| port.direction == PortDirection::Output)
}
