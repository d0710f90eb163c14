// SPDX-License-Identifier: Apache-2.0

//! Software square root, working directly on the IEEE-754 bit layout.
//!
//! The input is split into a power-of-two exponent and a mantissa normalised into \[0.5, 1\).
//! The mantissa root starts from a linear guess and gets exactly two Newton-Raphson steps, then
//! the halved exponent is added back into the result's exponent field. There is no convergence
//! check and no call to a native square-root instruction.

/// Constant term of the linear first guess for `sqrt(m)`, `m` in \[0.5, 1\)
const SEED_A: f64 = 0.417319242;
/// Slope of the linear first guess
const SEED_B: f64 = 0.590178532;
/// Applied when the exponent is odd, so the exponent can be made even
const FRAC_1_SQRT_2: f64 = 0.707106781;

/// Single-precision square root with a relative error well under 1e-3.
///
/// Returns `0.0` for zero, negative and NaN inputs instead of signalling a domain error.
/// Positive infinity is returned unchanged.
///
/// ```
/// use bpsure_monitor::math::sqrt;
///
/// assert!((sqrt(2.25) - 1.5).abs() < 1e-6);
/// assert_eq!(sqrt(-5.0), 0.0);
/// ```
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn sqrt(a: f32) -> f32 {
    /// Exponent field of a value in \[0.5, 1\)
    const HALF_BIAS: i32 = 126;
    const MANTISSA_BITS: u32 = 23;
    const MANTISSA_MASK: u32 = (1 << MANTISSA_BITS) - 1;
    /// 2^24, lifts subnormals into the normal range
    const SUBNORMAL_SCALE: f32 = 16_777_216.0;

    // NaN fails the comparison too
    if !(a > 0.0) {
        return 0.0;
    }
    if a.is_infinite() {
        return a;
    }

    let (bits, mut expo) = if a.to_bits() >> MANTISSA_BITS == 0 {
        ((a * SUBNORMAL_SCALE).to_bits(), -24)
    } else {
        (a.to_bits(), 0)
    };
    expo += (bits >> MANTISSA_BITS) as i32 - HALF_BIAS;

    // Force the exponent to zero, leaving the mantissa in [0.5, 1)
    let m = f32::from_bits((bits & MANTISSA_MASK) | ((HALF_BIAS as u32) << MANTISSA_BITS));

    let mut root = SEED_A as f32 + SEED_B as f32 * m;
    root = 0.5 * (m / root + root);
    root = 0.5 * (m / root + root);

    if expo & 1 != 0 {
        root *= FRAC_1_SQRT_2 as f32;
        expo += 1;
    }

    // `expo` is even here. Adding to the exponent field (rather than overwriting it) stays
    // correct if rounding pushed `root` up to exactly 1.0.
    let shifted = root.to_bits() as i32 + ((expo / 2) << MANTISSA_BITS);
    f32::from_bits(shifted as u32)
}
