// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Reference arithmetic for every supported circuit.
//!
//! These functions never look at a simulated circuit: they compute what the
//! hardware ought to produce from plain integer arithmetic, truncated with
//! [`wrap`] exactly like a fixed-width signal would be.

use crate::{
    bits::{BitWidth, wrap},
    circuit::CircuitSpec,
    signal::{InputVector, OutputVector, VectorError},
};

/// `(sum, cout)` of one-bit `x + y + cin`.
pub fn full_adder(x: u64, y: u64, cin: u64) -> (u64, u64) {
    let (x, y, cin) = (x & 1, y & 1, cin & 1);
    let sum = x ^ y ^ cin;
    let cout = (x & y) | (cin & (x ^ y));
    (sum, cout)
}

/// `(sum, cout)` of `x + y + cin` at width `N`. The carry-out is bit `N` of
/// the full sum and is masked to a single bit.
pub fn ripple_carry_adder(
    x: u64,
    y: u64,
    cin: u64,
    width: BitWidth,
) -> (u64, u64) {
    let total = u128::from(x) + u128::from(y) + u128::from(cin);
    let sum = wrap(total, width);
    let cout = wrap(total >> width.bits(), BitWidth::ONE);
    (sum, cout)
}

/// Logical left shift of `x` by `d` at width `N`; bits moved past `N - 1`
/// are dropped.
pub fn barrel_shift(x: u64, d: u64, width: BitWidth) -> u64 {
    let shifted = u32::try_from(d)
        .ok()
        .and_then(|d| u128::from(x).checked_shl(d))
        .unwrap_or(0);
    wrap(shifted, width)
}

pub(crate) fn full_adder_model(
    spec: &CircuitSpec,
    inputs: &InputVector,
) -> Result<OutputVector, VectorError> {
    let circuit = spec.name();
    let (sum, cout) = full_adder(
        inputs.require(circuit, "x")?,
        inputs.require(circuit, "y")?,
        inputs.require(circuit, "cin")?,
    );
    Ok(OutputVector::with_capacity(2)
        .with("s", sum)
        .with("cout", cout))
}

pub(crate) fn ripple_carry_adder_model(
    spec: &CircuitSpec,
    inputs: &InputVector,
) -> Result<OutputVector, VectorError> {
    let circuit = spec.name();
    let (sum, cout) = ripple_carry_adder(
        inputs.require(circuit, "x")?,
        inputs.require(circuit, "y")?,
        inputs.require(circuit, "cin")?,
        spec.width(),
    );
    Ok(OutputVector::with_capacity(2)
        .with("s", sum)
        .with("cout", cout))
}

pub(crate) fn barrel_shifter_model(
    spec: &CircuitSpec,
    inputs: &InputVector,
) -> Result<OutputVector, VectorError> {
    let circuit = spec.name();
    let z = barrel_shift(
        inputs.require(circuit, "x")?,
        inputs.require(circuit, "d")?,
        spec.width(),
    );
    Ok(OutputVector::with_capacity(1).with("z", z))
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn width(bits: u32) -> BitWidth {
        BitWidth::new(bits).unwrap()
    }

    #[test]
    fn full_adder_truth_table() {
        for x in 0..=1 {
            for y in 0..=1 {
                for cin in 0..=1 {
                    let expected =
                        (x ^ y ^ cin, (x & y) | (cin & (x ^ y)));
                    assert_eq!(full_adder(x, y, cin), expected);
                    assert_eq!(expected.0 + 2 * expected.1, x + y + cin);
                }
            }
        }
    }

    #[test]
    fn ripple_carry_adder_law() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for bits in 1..=64 {
            let n = width(bits);
            for _ in 0..64 {
                let x = rng.gen_range(0..=n.max_value());
                let y = rng.gen_range(0..=n.max_value());
                let cin = rng.gen_range(0..=1);
                let total = u128::from(x) + u128::from(y) + u128::from(cin);
                let (sum, cout) = ripple_carry_adder(x, y, cin, n);
                assert_eq!(sum, wrap(total, n));
                assert_eq!(u128::from(cout), total >> bits);
                assert!(cout <= 1);
            }
        }
    }

    #[test]
    fn carry_out_never_exceeds_one_bit() {
        // out-of-range operands would put more than one bit above N
        let (_, cout) = ripple_carry_adder(0xFFFF, 0xFFFF, 1, width(8));
        assert!(cout <= 1);
    }

    #[test]
    fn barrel_shift_law_and_identity() {
        for bits in 1..=16 {
            let n = width(bits);
            let distances = 1u64 << n.shift_amount().bits();
            for x in [0, 1, n.msb(), n.max_value(), 0x5A5A & n.max_value()] {
                assert_eq!(barrel_shift(x, 0, n), x);
                for d in 0..distances {
                    assert_eq!(
                        barrel_shift(x, d, n),
                        wrap(u128::from(x) << d, n)
                    );
                }
            }
        }
    }

    #[test]
    fn shifts_past_the_width_clear_everything() {
        // N = 5 gives D_WIDTH = 3, so d can reach 7
        assert_eq!(barrel_shift(0b11111, 5, width(5)), 0);
        assert_eq!(barrel_shift(0b11111, 7, width(5)), 0);
        assert_eq!(barrel_shift(u64::MAX, 200, width(64)), 0);
    }

    #[test]
    fn vector_models_require_every_input() {
        let spec = CircuitSpec::ripple_carry_adder(width(8));
        let partial = InputVector::new().with("x", 1).with("y", 2);
        assert_eq!(
            spec.expected(&partial),
            Err(VectorError::MissingSignal {
                circuit: "ripple_carry_adder",
                signal: "cin",
            })
        );
    }
}
