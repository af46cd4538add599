// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! This crate puts a Verilator model behind the harness's
//! [`DutAdapter`].
//!
//! The model must already be compiled into a shared library that exports, for
//! a top module `top`:
//!
//! - `ffi_new_V{top}` and `ffi_delete_V{top}`,
//! - `ffi_V{top}_eval`,
//! - `ffi_V{top}_pin_{port}` for every input port,
//! - `ffi_V{top}_read_{port}` for every output port.
//!
//! Each accessor takes or returns the Verilator data type for the port's width
//! (see [`types`]).

use std::{collections::HashMap, ffi};

use arith_verify_harness::{
    adapter::{self, AdapterError, DutAdapter},
    signal::{InputVector, OutputVector, Port},
};
use camino::Utf8Path;
use dynamic::{AsDynamicVerilatedModel, DynamicVerilatedModel, VerilatorValue};
use libloading::Library;
use snafu::{ResultExt, Whatever, whatever};

pub mod dynamic;

/// Verilator-defined types for C FFI.
pub mod types {
    /// From the Verilator documentation: "Data representing 'bit' of 1-8 packed
    /// bits."
    pub type CData = u8;

    /// From the Verilator documentation: "Data representing 'bit' of 9-16
    /// packed bits"
    pub type SData = u16;

    /// From the Verilator documentation: "Data representing 'bit' of 17-32
    /// packed bits."
    pub type IData = u32;

    /// From the Verilator documentation: "Data representing 'bit' of 33-64
    /// packed bits."
    pub type QData = u64;
}

/// Optional configuration for loading a [`VerilatedAdapter`]. Usually, you can
/// just use [`VerilatedAdapterOptions::default()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VerilatedAdapterOptions {
    /// Whether to use the log crate.
    pub log: bool,
}

impl VerilatedAdapterOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self { log: true }
    }
}

/// A [`DutAdapter`] over one instance of a verilated top module.
pub struct VerilatedAdapter {
    model: DynamicVerilatedModel,
    top: String,
    ports: Vec<Port>,
    settled: bool,
    log: bool,
}

impl VerilatedAdapter {
    /// Opens the shared library at `library_path` and instantiates `top`. You
    /// must guarantee that `ports` is exactly the interface `top` was verilated
    /// with; the engine checks it against the circuit specification, but only
    /// the library knows what it really exports.
    pub fn load(
        library_path: &Utf8Path,
        top: &str,
        ports: &[Port],
        options: VerilatedAdapterOptions,
    ) -> Result<Self, Whatever> {
        if top.chars().any(|c| c == '\\' || c == ' ') {
            whatever!("Escaped module names are not supported");
        }

        if options.log {
            log::info!("Validating model library");
        }
        if !library_path.is_file() {
            whatever!(
                "Library {} does not exist or is not a file. Note that if it's a relative path, you must be in the correct directory",
                library_path
            );
        }

        if options.log {
            log::info!("Opening the dynamic library {}", library_path);
        }
        let library = unsafe { Library::new(library_path) }
            .whatever_context("Failed to load verilator dynamic library")?;

        let new_main: extern "C" fn() -> *mut ffi::c_void =
            *unsafe { library.get(format!("ffi_new_V{top}").as_bytes()) }
                .whatever_context(format!(
                    "Failed to load constructor for module {}",
                    top
                ))?;
        let delete_main =
            *unsafe { library.get(format!("ffi_delete_V{top}").as_bytes()) }
                .whatever_context(format!(
                    "Failed to load destructor for module {}",
                    top
                ))?;
        let eval_main =
            *unsafe { library.get(format!("ffi_V{top}_eval").as_bytes()) }
                .whatever_context(format!(
                    "Failed to load evaluator for module {}",
                    top
                ))?;

        let main = new_main();
        if main.is_null() {
            whatever!("Constructor for module {} returned null", top);
        }

        let port_map: HashMap<String, _> = ports
            .iter()
            .map(|port| {
                (
                    port.name.to_string(),
                    (port.width.bits() as usize, port.direction),
                )
            })
            .collect();

        if options.log {
            log::info!("Instantiated {} with {} port(s)", top, port_map.len());
        }

        Ok(Self {
            model: DynamicVerilatedModel {
                ports: port_map,
                name: top.to_string(),
                main,
                delete_main,
                eval_main,
                library,
            },
            top: top.to_string(),
            ports: ports.to_vec(),
            settled: false,
            log: options.log,
        })
    }

    /// The underlying model, for driving ports directly.
    pub fn model_mut(&mut self) -> &mut DynamicVerilatedModel {
        &mut self.model
    }

    fn backend_error(
        &self,
        source: dynamic::DynamicVerilatedModelError,
    ) -> AdapterError {
        AdapterError::Backend {
            circuit: self.top.clone(),
            source: Box::new(source),
        }
    }
}

impl DutAdapter for VerilatedAdapter {
    fn name(&self) -> &str {
        &self.top
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn set_inputs(&mut self, inputs: &InputVector) -> Result<(), AdapterError> {
        // nothing is pinned unless the whole vector is acceptable
        let pins = inputs
            .iter()
            .map(|(signal, value)| {
                let port =
                    adapter::check_input(&self.top, &self.ports, signal, value)?;
                Ok((signal, VerilatorValue::fit(value, port.width)))
            })
            .collect::<Result<Vec<_>, AdapterError>>()?;

        for (signal, value) in pins {
            if self.log {
                log::debug!("Pinning {}.{} = {}", self.top, signal, value);
            }
            self.model
                .pin(signal, value)
                .map_err(|error| self.backend_error(error))?;
        }
        Ok(())
    }

    fn settle(&mut self) -> Result<(), AdapterError> {
        self.model.eval();
        self.settled = true;
        Ok(())
    }

    fn read_outputs(&self) -> Result<OutputVector, AdapterError> {
        if !self.settled {
            return Err(AdapterError::NotReady {
                circuit: self.top.clone(),
            });
        }
        adapter::output_ports(&self.ports)
            .map(|port| {
                let value = self
                    .model
                    .read(port.name)
                    .map_err(|error| self.backend_error(error))?;
                Ok((port.name, value.as_u64()))
            })
            .collect()
    }
}
