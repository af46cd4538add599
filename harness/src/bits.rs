// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-width unsigned arithmetic.
//!
//! Every value a circuit sees or produces is an unsigned integer of some
//! [`BitWidth`]. Arithmetic is carried out in `u128` and then reduced with
//! [`wrap`], which mirrors how a fixed-width signal silently drops the bits it
//! cannot hold.

use std::fmt;

use rand::Rng;
use snafu::{Snafu, ensure};

/// The widest signal supported, matching the widest Verilator value type.
pub const MAX_WIDTH: u32 = 64;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum WidthError {
    #[snafu(display(
        "Bit width {width} is outside the supported range 1 to {MAX_WIDTH}"
    ))]
    InvalidWidth { width: u32 },
}

/// The number of bits of a signal, between 1 and [`MAX_WIDTH`] inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitWidth(u32);

impl BitWidth {
    /// A single wire.
    pub const ONE: BitWidth = BitWidth(1);

    pub fn new(bits: u32) -> Result<Self, WidthError> {
        ensure!(
            (1..=MAX_WIDTH).contains(&bits),
            InvalidWidthSnafu { width: bits }
        );
        Ok(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// `2^N - 1`, the value with every bit set.
    pub fn max_value(self) -> u64 {
        if self.0 == MAX_WIDTH {
            u64::MAX
        } else {
            (1u64 << self.0) - 1
        }
    }

    /// Whether `value` fits in `[0, 2^N)`.
    pub fn contains(self, value: u64) -> bool {
        value <= self.max_value()
    }

    /// The value with only the most significant bit set.
    pub fn msb(self) -> u64 {
        1u64 << (self.0 - 1)
    }

    /// The width of a signal that selects a bit position of this width, that
    /// is `ceil(log2(N))`. A single-bit signal still gets a one-bit selector.
    pub fn shift_amount(self) -> BitWidth {
        let clog2 = if self.0 <= 1 {
            0
        } else {
            u32::BITS - (self.0 - 1).leading_zeros()
        };
        BitWidth(clog2.max(1))
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reduces `value` modulo `2^N`.
pub fn wrap(value: u128, width: BitWidth) -> u64 {
    (value & u128::from(width.max_value())) as u64
}

/// Draws a value uniformly from `[0, 2^N)`.
pub fn random_unsigned<R: Rng + ?Sized>(rng: &mut R, width: BitWidth) -> u64 {
    rng.gen_range(0..=width.max_value())
}

/// Renders `value` as a zero-padded binary literal exactly `N` digits long,
/// e.g. `0b00010010` for `0x12` at width 8.
pub fn format_binary(value: u64, width: BitWidth) -> String {
    format!("0b{:0width$b}", value, width = width.bits() as usize)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn rejects_widths_outside_range() {
        assert_eq!(
            BitWidth::new(0),
            Err(WidthError::InvalidWidth { width: 0 })
        );
        assert!(BitWidth::new(65).is_err());
        assert!(BitWidth::new(64).is_ok());
    }

    #[test]
    fn wrap_truncates_silently() {
        let eight = BitWidth::new(8).unwrap();
        assert_eq!(wrap(0x100, eight), 0);
        assert_eq!(wrap(0x1FF, eight), 0xFF);
        assert_eq!(wrap(0x12, eight), 0x12);

        let wide = BitWidth::new(64).unwrap();
        assert_eq!(wrap(u128::from(u64::MAX) + 1, wide), 0);
        assert_eq!(wrap(u128::from(u64::MAX), wide), u64::MAX);
    }

    #[test]
    fn shift_amount_is_ceil_log2() {
        let cases = [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (64, 6)];
        for (n, expected) in cases {
            let width = BitWidth::new(n).unwrap();
            assert_eq!(width.shift_amount().bits(), expected, "N = {n}");
        }
    }

    #[test]
    fn random_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 3, 8, 63, 64] {
            let width = BitWidth::new(n).unwrap();
            for _ in 0..200 {
                assert!(width.contains(random_unsigned(&mut rng, width)));
            }
        }
    }

    #[test]
    fn binary_rendering_is_fixed_width() {
        let eight = BitWidth::new(8).unwrap();
        assert_eq!(format_binary(0x12, eight), "0b00010010");
        assert_eq!(format_binary(1, BitWidth::ONE), "0b1");
    }
}
