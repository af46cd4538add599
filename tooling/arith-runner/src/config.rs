// Copyright (C) 2024 Ethan Uppal.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3 of the License only.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{collections::HashMap, error::Error, fs, str::FromStr};

use arith_verify_harness::prelude::*;
use camino::{Utf8Path, Utf8PathBuf};
use snafu::{OptionExt, ResultExt, Whatever, whatever};

pub const DEFAULT_WIDTH: u32 = 8;

/// A prebuilt Verilator model to test instead of the behavioral stand-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    pub library: Utf8PathBuf,
    pub top: String,
}

/// Everything the runner needs, after the config file and the command line
/// have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub width: BitWidth,
    pub context: VectorContext,
    /// When `None`, each circuit runs [`VectorMode::defaults_for`] it.
    pub modes: Option<Vec<VectorMode>>,
    pub circuits: Vec<CircuitKind>,
    pub collect_all: bool,
    pub libraries: HashMap<CircuitKind, LibraryConfig>,
}

/// The command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub width: Option<u32>,
    pub count: Option<usize>,
    pub seed: Option<u64>,
    pub modes: Vec<VectorMode>,
    pub circuits: Vec<CircuitKind>,
    pub collect_all: bool,
}

impl Settings {
    pub fn load(
        path: Option<&Utf8Path>,
        overrides: Overrides,
    ) -> Result<Self, Whatever> {
        let Some(path) = path else {
            return Self::from_toml(
                &toml::Value::Table(Default::default()),
                Utf8Path::new("."),
                overrides,
            );
        };

        let contents = fs::read_to_string(path)
            .whatever_context(format!("Failed to read config file {}", path))?;
        let value: toml::Value = toml::from_str(&contents)
            .whatever_context(format!("Failed to parse config file {}", path))?;
        let base = path.parent().unwrap_or(Utf8Path::new("."));
        Self::from_toml(&value, base, overrides)
            .whatever_context(format!("Invalid config file {}", path))
    }

    /// Relative library paths are resolved against `base`.
    pub fn from_toml(
        value: &toml::Value,
        base: &Utf8Path,
        overrides: Overrides,
    ) -> Result<Self, Whatever> {
        let empty = toml::Value::Table(Default::default());
        let harness = value.get("harness").unwrap_or(&empty);
        if !harness.is_table() {
            whatever!("`harness` must be a table");
        }

        let width_bits = match overrides.width {
            Some(width) => width,
            None => integer(harness, "width")?
                .map(u32::try_from)
                .transpose()
                .whatever_context("`harness.width` is too large")?
                .unwrap_or(DEFAULT_WIDTH),
        };
        let width = BitWidth::new(width_bits)
            .whatever_context("Invalid data width")?;

        let mut context = VectorContext::default();
        if let Some(count) = overrides.count {
            context.count = count;
        } else if let Some(count) = integer(harness, "random_count")? {
            context.count = usize::try_from(count)
                .whatever_context("`harness.random_count` is too large")?;
        }
        context.seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => integer(harness, "seed")?,
        };

        let modes = if overrides.modes.is_empty() {
            names(harness, "modes")?
        } else {
            Some(overrides.modes)
        };

        let circuits = if overrides.circuits.is_empty() {
            names(harness, "circuits")?
                .unwrap_or_else(|| CircuitKind::ALL.to_vec())
        } else {
            overrides.circuits
        };

        let collect_all = overrides.collect_all
            || match harness.get("collect_all") {
                None => false,
                Some(value) => value
                    .as_bool()
                    .whatever_context("`harness.collect_all` must be a boolean")?,
            };

        let mut libraries = HashMap::new();
        if let Some(tables) = value.get("circuits") {
            let tables = tables
                .as_table()
                .whatever_context("`circuits` must be a table")?;
            for (name, table) in tables {
                let kind = CircuitKind::from_str(name).whatever_context(
                    format!("Invalid section [circuits.{name}]"),
                )?;
                let library = table
                    .get("library")
                    .and_then(|library| library.as_str())
                    .whatever_context(format!(
                        "Missing `library` string under [circuits.{name}]"
                    ))?;
                let top = match table.get("top") {
                    None => kind.name().to_string(),
                    Some(top) => top
                        .as_str()
                        .whatever_context(format!(
                            "`circuits.{name}.top` must be a string"
                        ))?
                        .to_string(),
                };
                libraries.insert(
                    kind,
                    LibraryConfig {
                        library: base.join(library),
                        top,
                    },
                );
            }
        }

        Ok(Self {
            width,
            context,
            modes,
            circuits,
            collect_all,
            libraries,
        })
    }

    /// The modes `kind` runs under these settings.
    pub fn modes_for(&self, kind: CircuitKind) -> Vec<VectorMode> {
        match &self.modes {
            Some(modes) => modes.clone(),
            None => VectorMode::defaults_for(kind).to_vec(),
        }
    }
}

fn integer(table: &toml::Value, key: &str) -> Result<Option<u64>, Whatever> {
    table
        .get(key)
        .map(|value| {
            value
                .as_integer()
                .and_then(|value| u64::try_from(value).ok())
                .whatever_context(format!(
                    "`harness.{key}` must be a non-negative integer"
                ))
        })
        .transpose()
}

fn names<T>(table: &toml::Value, key: &str) -> Result<Option<Vec<T>>, Whatever>
where
    T: FromStr,
    T::Err: Error + 'static,
{
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    let array = value
        .as_array()
        .whatever_context(format!("`harness.{key}` must be an array"))?;
    array
        .iter()
        .map(|name| {
            let name = name.as_str().whatever_context(format!(
                "`harness.{key}` must only contain strings"
            ))?;
            T::from_str(name)
                .whatever_context(format!("Invalid entry in `harness.{key}`"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
