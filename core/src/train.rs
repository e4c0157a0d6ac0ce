//! Backpropagation.
//!
//! Targets are one-hot: `MAX_ACTIVATION` for the correct class, zero for the
//! rest. Error signals and weight updates are computed in unit terms (`f32`,
//! 1.0 ≙ `MAX_ACTIVATION`) through the profile's conversions, so the same
//! rule drives every profile. Results are written back saturating.
//!
//! A step computes every error signal against the weights as they were
//! before the step, then applies all updates.

use crate::error::{NetError, NetResult};
use crate::network::{hidden_fan_in, hidden_ranges, Network};
use crate::profile::NumericProfile;

impl<P: NumericProfile> Network<'_, P> {
    /// Target value of output `neuron` when `correct` is the right class.
    #[inline]
    fn target(neuron: usize, correct: usize) -> f32 {
        if neuron == correct {
            P::activation_to_unit(P::MAX_ACTIVATION)
        } else {
            0.0
        }
    }

    fn check_class(&self, correct: usize) -> NetResult<()> {
        if correct >= self.dims.outputs {
            return Err(NetError::IndexOutOfRange { index: correct, len: self.dims.outputs });
        }
        Ok(())
    }

    /// Per-output `target - actual`, in unit terms.
    pub fn output_errors(&self, correct: usize, errors: &mut [f32]) -> NetResult<()> {
        self.check_class(correct)?;
        if errors.len() != self.dims.outputs {
            return Err(NetError::DimensionMismatch {
                expected: self.dims.outputs,
                actual: errors.len(),
            });
        }
        for (j, (err, &a)) in errors.iter_mut().zip(self.output_activations.iter()).enumerate() {
            *err = Self::target(j, correct) - P::activation_to_unit(a);
        }
        Ok(())
    }

    /// Mean squared error of the current output against class `correct`.
    pub fn cost(&self, correct: usize) -> NetResult<f32> {
        self.check_class(correct)?;
        let sum: f32 = self
            .output_activations
            .iter()
            .enumerate()
            .map(|(j, &a)| {
                let diff = Self::target(j, correct) - P::activation_to_unit(a);
                diff * diff
            })
            .sum();
        Ok(sum / self.dims.outputs as f32)
    }

    /// One gradient step towards class `correct`, using the activations of
    /// the last forward pass.
    ///
    /// `learning_rate` must be finite and non-negative.
    pub fn train(&mut self, correct: usize, learning_rate: f32) -> NetResult<()> {
        if !learning_rate.is_finite() || learning_rate < 0.0 {
            return Err(NetError::InvalidArgument);
        }
        self.check_class(correct)?;

        let dims = self.dims;
        let nh = dims.hidden;
        let last = dims.hidden_layers - 1;

        // Output error signals.
        for (j, (delta, &a)) in self
            .output_errors
            .iter_mut()
            .zip(self.output_activations.iter())
            .enumerate()
        {
            *delta = (P::activation_to_unit(a) - Self::target(j, correct)) * P::squash_slope(a);
        }

        // Hidden error signals, last layer first.
        for h in (0..dims.hidden_layers).rev() {
            let (neurons, _) = hidden_ranges(&dims, h)?;
            let (current, downstream) = self.hidden_errors.split_at_mut(neurons.end);
            let current = &mut current[neurons.clone()];

            for (i, delta) in current.iter_mut().enumerate() {
                let sum: f32 = if h == last {
                    self.output_weights
                        .chunks_exact(nh)
                        .zip(self.output_errors.iter())
                        .map(|(row, &d)| P::weight_to_unit(row[i]) * d)
                        .sum()
                } else {
                    let (_, next_weights) = hidden_ranges(&dims, h + 1)?;
                    self.hidden_weights[next_weights]
                        .chunks_exact(nh)
                        .zip(downstream[..nh].iter())
                        .map(|(row, &d)| P::weight_to_unit(row[i]) * d)
                        .sum()
                };
                let a = self.hidden_activations[neurons.start + i];
                *delta = sum.clamp(-1.0, 1.0) * P::squash_slope(a);
            }
        }

        // Output weights and biases.
        let last_hidden = &self.hidden_activations[last * nh..];
        for ((row, bias), &delta) in self
            .output_weights
            .chunks_exact_mut(nh)
            .zip(self.output_biases.iter_mut())
            .zip(self.output_errors.iter())
        {
            descend::<P>(row, bias, last_hidden, delta * learning_rate);
        }

        // Hidden weights and biases.
        for h in 0..dims.hidden_layers {
            let (neurons, weights) = hidden_ranges(&dims, h)?;
            let fan_in = hidden_fan_in(&dims, h);
            let upstream: &[P::Activation] = if h == 0 {
                &self.input
            } else {
                &self.hidden_activations[neurons.start - nh..neurons.start]
            };
            for ((row, bias), &delta) in self.hidden_weights[weights]
                .chunks_exact_mut(fan_in)
                .zip(self.hidden_biases[neurons.clone()].iter_mut())
                .zip(self.hidden_errors[neurons].iter())
            {
                descend::<P>(row, bias, upstream, delta * learning_rate);
            }
        }

        log::trace!("train: class {} at rate {}", correct, learning_rate);
        Ok(())
    }
}

/// `w -= step * x` for one neuron's incoming row, then `b -= step`.
#[inline]
fn descend<P: NumericProfile>(
    row: &mut [P::Weight],
    bias: &mut P::Bias,
    upstream: &[P::Activation],
    step: f32,
) {
    for (w, &x) in row.iter_mut().zip(upstream) {
        *w = P::weight_from_unit(P::weight_to_unit(*w) - step * P::activation_to_unit(x));
    }
    *bias = P::bias_from_unit(P::bias_to_unit(*bias) - step);
}
