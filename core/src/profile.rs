//! Numeric profiles: the four number kinds a network is built from.
//!
//! A profile fixes the Rust type of activations, weights, biases and the
//! accumulator used for the weighted sum, together with their bounds and the
//! two operations the forward pass needs: multiply-accumulate and squash.
//!
//! Integer profiles are fixed point. An activation of `MAX_ACTIVATION`
//! stands for 1.0, weights carry `WEIGHT_FRAC_BITS` fractional bits, and the
//! accumulator therefore counts in units of `MAX_ACTIVATION << WEIGHT_FRAC_BITS`.
//! Biases are stored directly in accumulator units so adding one is a plain
//! integer add.
//!
//! Accumulation never saturates. The only clamp happens in `squash`, so the
//! accumulator must dominate `fan_in * |Activation|max * |Weight|max`;
//! [`NumericProfile::MAX_FAN_IN`] is that bound and network construction
//! rejects layers that exceed it.

use core::f32::consts::PI;
use core::fmt::Debug;

use bytemuck::Pod;
use rand::Rng;

/// Compile-time numeric representation of a network.
pub trait NumericProfile: 'static {
    type Activation: Pod + PartialOrd + Debug;
    type Weight: Pod + PartialOrd + Debug;
    type Bias: Pod + PartialOrd + Debug;
    type Accumulator: Copy + PartialOrd + Debug;

    /// Short name used in log lines.
    const NAME: &'static str;

    const MIN_ACTIVATION: Self::Activation;
    const MAX_ACTIVATION: Self::Activation;
    const MIN_WEIGHT: Self::Weight;
    const MAX_WEIGHT: Self::Weight;
    const MIN_BIAS: Self::Bias;
    const MAX_BIAS: Self::Bias;
    const MIN_ACCUMULATOR: Self::Accumulator;
    const MAX_ACCUMULATOR: Self::Accumulator;

    /// Largest number of incoming connections one neuron may have before the
    /// accumulator could overflow.
    const MAX_FAN_IN: usize;

    /// The additive identity of the accumulator.
    fn zero() -> Self::Accumulator;

    /// `acc + activation * weight`, no intermediate clamp.
    fn accumulate(
        acc: Self::Accumulator,
        activation: Self::Activation,
        weight: Self::Weight,
    ) -> Self::Accumulator;

    /// `acc + bias`.
    fn add_bias(acc: Self::Accumulator, bias: Self::Bias) -> Self::Accumulator;

    /// Final nonlinearity mapping an accumulated sum to an activation.
    fn squash(acc: Self::Accumulator) -> Self::Activation;

    /// Slope of `squash` at the point that produced `activation`, expressed
    /// in unit terms. Scales the error signal during backpropagation.
    fn squash_slope(activation: Self::Activation) -> f32;

    fn activation_to_unit(activation: Self::Activation) -> f32;
    /// Saturating conversion of a unit-range value (1.0 ≙ `MAX_ACTIVATION`).
    fn activation_from_unit(value: f32) -> Self::Activation;
    /// Saturating conversion of a raw external reading, no rescaling.
    fn activation_from_raw(value: f32) -> Self::Activation;

    fn weight_to_unit(weight: Self::Weight) -> f32;
    fn weight_from_unit(value: f32) -> Self::Weight;

    fn bias_to_unit(bias: Self::Bias) -> f32;
    fn bias_from_unit(value: f32) -> Self::Bias;

    /// Uniform random weight in the profile's signed unit range.
    fn random_weight<R: Rng + ?Sized>(rng: &mut R) -> Self::Weight {
        Self::weight_from_unit(rng.gen_range(-1.0f32..1.0))
    }

    /// Uniform random bias in the profile's signed unit range.
    fn random_bias<R: Rng + ?Sized>(rng: &mut R) -> Self::Bias {
        Self::bias_from_unit(rng.gen_range(-1.0f32..1.0))
    }
}

/// Largest fan-in for which `fan_in * max_product` stays within `acc_max`,
/// saturated to the platform's `usize`.
pub const fn fan_in_limit(acc_max: u128, max_product: u128) -> usize {
    let limit = acc_max / max_product;
    if limit > usize::MAX as u128 {
        usize::MAX
    } else {
        limit as usize
    }
}

#[inline]
fn round_clamp(value: f32, min: f32, max: f32) -> f32 {
    // NaN rounds to the lower bound rather than poisoning the weights.
    if value.is_nan() {
        return min;
    }
    libm::roundf(value).clamp(min, max)
}

// =============================================================================
// Floating point
// =============================================================================

/// `f32` everywhere, squashed with `tanh(acc * π)`.
///
/// π only sharpens the slope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct F32Profile;

impl NumericProfile for F32Profile {
    type Activation = f32;
    type Weight = f32;
    type Bias = f32;
    type Accumulator = f32;

    const NAME: &'static str = "f32";

    const MIN_ACTIVATION: f32 = -1.0;
    const MAX_ACTIVATION: f32 = 1.0;
    const MIN_WEIGHT: f32 = f32::MIN;
    const MAX_WEIGHT: f32 = f32::MAX;
    const MIN_BIAS: f32 = f32::MIN;
    const MAX_BIAS: f32 = f32::MAX;
    const MIN_ACCUMULATOR: f32 = f32::MIN;
    const MAX_ACCUMULATOR: f32 = f32::MAX;

    const MAX_FAN_IN: usize = usize::MAX;

    #[inline(always)]
    fn zero() -> f32 {
        0.0
    }

    #[inline(always)]
    fn accumulate(acc: f32, activation: f32, weight: f32) -> f32 {
        acc + activation * weight
    }

    #[inline(always)]
    fn add_bias(acc: f32, bias: f32) -> f32 {
        acc + bias
    }

    #[inline]
    fn squash(acc: f32) -> f32 {
        libm::tanhf(acc * PI)
    }

    /// d/dx tanh(x) = 1 - tanh²(x), taken at the stored activation. The
    /// constant π factor is folded into the learning rate.
    #[inline]
    fn squash_slope(activation: f32) -> f32 {
        1.0 - activation * activation
    }

    #[inline(always)]
    fn activation_to_unit(activation: f32) -> f32 {
        activation
    }

    #[inline(always)]
    fn activation_from_unit(value: f32) -> f32 {
        value
    }

    #[inline(always)]
    fn activation_from_raw(value: f32) -> f32 {
        value
    }

    #[inline(always)]
    fn weight_to_unit(weight: f32) -> f32 {
        weight
    }

    #[inline(always)]
    fn weight_from_unit(value: f32) -> f32 {
        value
    }

    #[inline(always)]
    fn bias_to_unit(bias: f32) -> f32 {
        bias
    }

    #[inline(always)]
    fn bias_from_unit(value: f32) -> f32 {
        value
    }
}

// =============================================================================
// Q15: i16 activations, Q3.12 i16 weights, i64 accumulator
// =============================================================================

/// 16-bit fixed point for MCUs with a 16x16 MAC (Xtensa MAC16, Cortex-M4 SMLAD).
///
/// A weight step is `1/4096`. Training updates smaller than half a step
/// round away, so a learning rate below [`Q15Profile::MIN_LEARNING_RATE`]
/// can never move a weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Q15Profile;

impl Q15Profile {
    pub const WEIGHT_FRAC_BITS: u32 = 12;
    /// Half a weight step. Error signals and activations are at most 1.0.
    pub const MIN_LEARNING_RATE: f32 = 0.5 / (1u32 << Self::WEIGHT_FRAC_BITS) as f32;
    const ACTIVATION_ONE: f32 = i16::MAX as f32;
    const WEIGHT_ONE: f32 = (1i32 << Self::WEIGHT_FRAC_BITS) as f32;
    const ACCUMULATOR_ONE: f32 = Self::ACTIVATION_ONE * Self::WEIGHT_ONE;
}

impl NumericProfile for Q15Profile {
    type Activation = i16;
    type Weight = i16;
    type Bias = i32;
    type Accumulator = i64;

    const NAME: &'static str = "q15";

    const MIN_ACTIVATION: i16 = i16::MIN;
    const MAX_ACTIVATION: i16 = i16::MAX;
    const MIN_WEIGHT: i16 = i16::MIN;
    const MAX_WEIGHT: i16 = i16::MAX;
    const MIN_BIAS: i32 = i32::MIN;
    const MAX_BIAS: i32 = i32::MAX;
    const MIN_ACCUMULATOR: i64 = i64::MIN;
    const MAX_ACCUMULATOR: i64 = i64::MAX;

    // One bias term is at most i32::MAX, far below the per-product headroom.
    const MAX_FAN_IN: usize = fan_in_limit(i64::MAX as u128 - i32::MAX as u128, 1 << 30);

    #[inline(always)]
    fn zero() -> i64 {
        0
    }

    #[inline(always)]
    fn accumulate(acc: i64, activation: i16, weight: i16) -> i64 {
        acc + (activation as i64) * (weight as i64)
    }

    #[inline(always)]
    fn add_bias(acc: i64, bias: i32) -> i64 {
        acc + bias as i64
    }

    #[inline]
    fn squash(acc: i64) -> i16 {
        (acc >> Self::WEIGHT_FRAC_BITS).clamp(0, i16::MAX as i64) as i16
    }

    /// The clamp is treated as a straight pass-through so neurons pinned at
    /// zero can still recover.
    #[inline(always)]
    fn squash_slope(_activation: i16) -> f32 {
        1.0
    }

    #[inline]
    fn activation_to_unit(activation: i16) -> f32 {
        activation as f32 / Self::ACTIVATION_ONE
    }

    #[inline]
    fn activation_from_unit(value: f32) -> i16 {
        Self::activation_from_raw(value * Self::ACTIVATION_ONE)
    }

    #[inline]
    fn activation_from_raw(value: f32) -> i16 {
        round_clamp(value, i16::MIN as f32, i16::MAX as f32) as i16
    }

    #[inline]
    fn weight_to_unit(weight: i16) -> f32 {
        weight as f32 / Self::WEIGHT_ONE
    }

    #[inline]
    fn weight_from_unit(value: f32) -> i16 {
        round_clamp(value * Self::WEIGHT_ONE, i16::MIN as f32, i16::MAX as f32) as i16
    }

    #[inline]
    fn bias_to_unit(bias: i32) -> f32 {
        bias as f32 / Self::ACCUMULATOR_ONE
    }

    #[inline]
    fn bias_from_unit(value: f32) -> i32 {
        // i32::MAX is not representable in f32; stay one ulp inside it.
        round_clamp(value * Self::ACCUMULATOR_ONE, i32::MIN as f32, 2_147_483_520.0) as i32
    }
}

// =============================================================================
// Q7: i8 activations, Q1.6 i8 weights, i32 accumulator
// =============================================================================

/// 8-bit fixed point for the smallest cores: i8 × i8 products summed in
/// an i32.
///
/// A weight step is `1/64`, so any learning rate below
/// [`Q7Profile::MIN_LEARNING_RATE`] leaves every weight where it is while
/// the finer biases keep moving. Typical error signals are well under 1.0;
/// rates of 0.1 and up are the usable range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Q7Profile;

impl Q7Profile {
    pub const WEIGHT_FRAC_BITS: u32 = 6;
    /// Half a weight step. Error signals and activations are at most 1.0.
    pub const MIN_LEARNING_RATE: f32 = 0.5 / (1u32 << Self::WEIGHT_FRAC_BITS) as f32;
    const ACTIVATION_ONE: f32 = i8::MAX as f32;
    const WEIGHT_ONE: f32 = (1i32 << Self::WEIGHT_FRAC_BITS) as f32;
    const ACCUMULATOR_ONE: f32 = Self::ACTIVATION_ONE * Self::WEIGHT_ONE;
}

impl NumericProfile for Q7Profile {
    type Activation = i8;
    type Weight = i8;
    type Bias = i16;
    type Accumulator = i32;

    const NAME: &'static str = "q7";

    const MIN_ACTIVATION: i8 = i8::MIN;
    const MAX_ACTIVATION: i8 = i8::MAX;
    const MIN_WEIGHT: i8 = i8::MIN;
    const MAX_WEIGHT: i8 = i8::MAX;
    const MIN_BIAS: i16 = i16::MIN;
    const MAX_BIAS: i16 = i16::MAX;
    const MIN_ACCUMULATOR: i32 = i32::MIN;
    const MAX_ACCUMULATOR: i32 = i32::MAX;

    const MAX_FAN_IN: usize = fan_in_limit(i32::MAX as u128 - i16::MAX as u128, 128 * 128);

    #[inline(always)]
    fn zero() -> i32 {
        0
    }

    #[inline(always)]
    fn accumulate(acc: i32, activation: i8, weight: i8) -> i32 {
        acc + (activation as i32) * (weight as i32)
    }

    #[inline(always)]
    fn add_bias(acc: i32, bias: i16) -> i32 {
        acc + bias as i32
    }

    #[inline]
    fn squash(acc: i32) -> i8 {
        (acc >> Self::WEIGHT_FRAC_BITS).clamp(0, i8::MAX as i32) as i8
    }

    #[inline(always)]
    fn squash_slope(_activation: i8) -> f32 {
        1.0
    }

    #[inline]
    fn activation_to_unit(activation: i8) -> f32 {
        activation as f32 / Self::ACTIVATION_ONE
    }

    #[inline]
    fn activation_from_unit(value: f32) -> i8 {
        Self::activation_from_raw(value * Self::ACTIVATION_ONE)
    }

    #[inline]
    fn activation_from_raw(value: f32) -> i8 {
        round_clamp(value, i8::MIN as f32, i8::MAX as f32) as i8
    }

    #[inline]
    fn weight_to_unit(weight: i8) -> f32 {
        weight as f32 / Self::WEIGHT_ONE
    }

    #[inline]
    fn weight_from_unit(value: f32) -> i8 {
        round_clamp(value * Self::WEIGHT_ONE, i8::MIN as f32, i8::MAX as f32) as i8
    }

    #[inline]
    fn bias_to_unit(bias: i16) -> f32 {
        bias as f32 / Self::ACCUMULATOR_ONE
    }

    #[inline]
    fn bias_from_unit(value: f32) -> i16 {
        round_clamp(value * Self::ACCUMULATOR_ONE, i16::MIN as f32, i16::MAX as f32) as i16
    }
}
