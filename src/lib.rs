// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Golden-model verification for fixed-width arithmetic circuits.
//!
//! The harness lives in [`harness`]; enable the `verilator` feature for an
//! adapter over prebuilt Verilator models.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use arith_verify_harness as harness;

#[doc(inline)]
#[cfg_attr(docsrs, doc(cfg(feature = "verilator")))]
#[cfg(feature = "verilator")]
pub use arith_verify_verilator as verilator;

pub use arith_verify_harness::prelude;
