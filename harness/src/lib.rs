// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! This crate checks fixed-width arithmetic circuits against golden models.
//!
//! A [`circuit::CircuitSpec`] describes the circuit, a
//! [`vectors::VectorSequence`] supplies inputs, a [`adapter::DutAdapter`]
//! realizes the circuit, and an [`engine::Run`] ties them together:
//!
//! ```
//! use arith_verify_harness::prelude::*;
//!
//! let spec = CircuitSpec::ripple_carry_adder(BitWidth::new(8)?);
//! let adapter = behavioral::for_kind(spec.kind(), spec.width());
//! let mut run = Run::new(&spec, adapter, RunOptions::default())?;
//! run.execute(vectors::targeted(&spec)?)?;
//! assert!(run.into_report().passed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! For an example of how to put a simulator behind the harness, see
//! `VerilatedAdapter` (under the "verilator/" directory), which implements
//! [`adapter::DutAdapter`] over a prebuilt Verilator model.

pub mod adapter;
pub mod behavioral;
pub mod bits;
pub mod circuit;
pub mod engine;
pub mod golden;
pub mod signal;
pub mod verdict;
pub mod vectors;

pub mod prelude {
    pub use crate::{
        adapter::{AdapterError, DutAdapter},
        behavioral,
        bits::{BitWidth, WidthError},
        circuit::{CircuitKind, CircuitSpec},
        engine::{MismatchPolicy, Run, RunError, RunOptions, RunState},
        signal::{
            InputVector, OutputVector, Port, PortDirection, Signal, TestCase,
            VectorError,
        },
        verdict::{Outcome, RunReport, Verdict},
        vectors::{self, VectorContext, VectorMode, VectorSequence},
    };
}
