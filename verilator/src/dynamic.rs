// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Models whose ports are only known at runtime.

use std::{collections::HashMap, ffi, fmt, ops::RangeInclusive};

use arith_verify_harness::{bits::BitWidth, signal::PortDirection};
use libloading::{Library, Symbol};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::types;

/// A port value in the C type Verilator generates for the port's width. See
/// [`types`].
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum VerilatorValue {
    CData(types::CData),
    SData(types::SData),
    IData(types::IData),
    QData(types::QData),
}

impl VerilatorValue {
    /// The widest port this value type carries.
    pub fn width(&self) -> usize {
        *self.port_widths().end()
    }

    /// The port widths Verilator represents with this value type.
    pub fn port_widths(&self) -> RangeInclusive<usize> {
        match self {
            Self::CData(_) => 1..=8,
            Self::SData(_) => 9..=16,
            Self::IData(_) => 17..=32,
            Self::QData(_) => 33..=64,
        }
    }

    /// Packs `value` into the type Verilator uses for a port of `width` bits.
    /// `value` must already fit `width`.
    pub fn fit(value: u64, width: BitWidth) -> Self {
        match width.bits() {
            0..=8 => Self::CData(value as types::CData),
            9..=16 => Self::SData(value as types::SData),
            17..=32 => Self::IData(value as types::IData),
            _ => Self::QData(value),
        }
    }

    pub fn as_u64(&self) -> u64 {
        match *self {
            Self::CData(value) => value.into(),
            Self::SData(value) => value.into(),
            Self::IData(value) => value.into(),
            Self::QData(value) => value,
        }
    }
}

impl fmt::Display for VerilatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_u64().fmt(f)
    }
}

impl From<types::CData> for VerilatorValue {
    fn from(value: types::CData) -> Self {
        Self::CData(value)
    }
}

impl From<types::SData> for VerilatorValue {
    fn from(value: types::SData) -> Self {
        Self::SData(value)
    }
}

impl From<types::IData> for VerilatorValue {
    fn from(value: types::IData) -> Self {
        Self::IData(value)
    }
}

impl From<types::QData> for VerilatorValue {
    fn from(value: types::QData) -> Self {
        Self::QData(value)
    }
}

/// Access model ports by name at runtime.
pub trait AsDynamicVerilatedModel {
    /// Samples the output `port`.
    fn read(
        &self,
        port: impl Into<String>,
    ) -> Result<VerilatorValue, DynamicVerilatedModelError>;

    /// Drives the input `port`, whose width must fall in
    /// [`VerilatorValue::port_widths`] of `value`.
    fn pin(
        &mut self,
        port: impl Into<String>,
        value: impl Into<VerilatorValue>,
    ) -> Result<(), DynamicVerilatedModelError>;

    /// Equivalent to the Verilator `eval` method.
    fn eval(&mut self);
}

/// A verilated model instantiated from a prebuilt shared library. See
/// [`crate::VerilatedAdapter::load`].
pub struct DynamicVerilatedModel {
    pub(crate) ports: HashMap<String, (usize, PortDirection)>,
    pub(crate) name: String,
    pub(crate) main: *mut ffi::c_void,
    pub(crate) delete_main: extern "C" fn(*mut ffi::c_void),
    pub(crate) eval_main: extern "C" fn(*mut ffi::c_void),
    // must outlive `main`, whose code lives in the library
    pub(crate) library: Library,
}

impl Drop for DynamicVerilatedModel {
    fn drop(&mut self) {
        (self.delete_main)(self.main);
    }
}

#[derive(Debug, Snafu)]
pub enum DynamicVerilatedModelError {
    #[snafu(display(
        "Port {port} was not declared when verilated module {top_module} was loaded"
    ))]
    NoSuchPort { top_module: String, port: String },
    #[snafu(display(
        "Library for verilated module {top_module} does not export {symbol}"
    ))]
    MissingSymbol {
        top_module: String,
        symbol: String,
        source: libloading::Error,
    },
    #[snafu(display(
        "Port {port} on verilated module {top_module} has width {width}, but was given a value for ports of width {attempted_lower} to {attempted_higher}"
    ))]
    InvalidPortWidth {
        top_module: String,
        port: String,
        width: usize,
        attempted_lower: usize,
        attempted_higher: usize,
    },
    #[snafu(display(
        "Port {port} on verilated module {top_module} is an {direction} port, but was used as an {attempted_direction} port"
    ))]
    InvalidPortDirection {
        top_module: String,
        port: String,
        direction: PortDirection,
        attempted_direction: PortDirection,
    },
}

impl DynamicVerilatedModel {
    /// The width of `port`, which must flow in `direction`.
    fn port_width(
        &self,
        port: &str,
        direction: PortDirection,
    ) -> Result<usize, DynamicVerilatedModelError> {
        let (width, declared) =
            *self.ports.get(port).context(NoSuchPortSnafu {
                top_module: &self.name,
                port,
            })?;
        ensure!(
            declared == direction,
            InvalidPortDirectionSnafu {
                top_module: &self.name,
                port,
                direction: declared,
                attempted_direction: direction,
            }
        );
        Ok(width)
    }

    /// Looks up `ffi_V{top}_{accessor}_{port}`.
    fn accessor<T>(
        &self,
        accessor: &str,
        port: &str,
    ) -> Result<Symbol<'_, T>, DynamicVerilatedModelError> {
        let symbol = format!("ffi_V{}_{accessor}_{port}", self.name);
        unsafe { self.library.get(symbol.as_bytes()) }.context(
            MissingSymbolSnafu {
                top_module: &self.name,
                symbol: &symbol,
            },
        )
    }

    fn read_as<T: Copy + Into<VerilatorValue>>(
        &self,
        port: &str,
    ) -> Result<VerilatorValue, DynamicVerilatedModelError> {
        let read =
            self.accessor::<extern "C" fn(*mut ffi::c_void) -> T>("read", port)?;
        Ok(read(self.main).into())
    }

    fn pin_as<T: Copy>(
        &self,
        port: &str,
        value: T,
    ) -> Result<(), DynamicVerilatedModelError> {
        let pin =
            self.accessor::<extern "C" fn(*mut ffi::c_void, T)>("pin", port)?;
        pin(self.main, value);
        Ok(())
    }
}

impl AsDynamicVerilatedModel for DynamicVerilatedModel {
    fn read(
        &self,
        port: impl Into<String>,
    ) -> Result<VerilatorValue, DynamicVerilatedModelError> {
        let port = port.into();
        match self.port_width(&port, PortDirection::Output)? {
            0..=8 => self.read_as::<types::CData>(&port),
            9..=16 => self.read_as::<types::SData>(&port),
            17..=32 => self.read_as::<types::IData>(&port),
            _ => self.read_as::<types::QData>(&port),
        }
    }

    fn pin(
        &mut self,
        port: impl Into<String>,
        value: impl Into<VerilatorValue>,
    ) -> Result<(), DynamicVerilatedModelError> {
        let port = port.into();
        let value = value.into();
        let width = self.port_width(&port, PortDirection::Input)?;
        let accepted = value.port_widths();
        ensure!(
            accepted.contains(&width),
            InvalidPortWidthSnafu {
                top_module: &self.name,
                port: &port,
                width,
                attempted_lower: *accepted.start(),
                attempted_higher: *accepted.end(),
            }
        );

        match value {
            VerilatorValue::CData(value) => self.pin_as(&port, value),
            VerilatorValue::SData(value) => self.pin_as(&port, value),
            VerilatorValue::IData(value) => self.pin_as(&port, value),
            VerilatorValue::QData(value) => self.pin_as(&port, value),
        }
    }

    fn eval(&mut self) {
        (self.eval_main)(self.main);
    }
}
