//! Forward propagation and response selection.

use crate::error::{NetError, NetResult};
use crate::network::{hidden_ranges, Network};
use crate::profile::NumericProfile;

/// One fully-connected transition:
/// `output[j] = squash(bias[j] + Σ_k input[k] * weights[j * fan_in + k])`.
///
/// `weights` is row-major `output.len() × input.len()`.
#[inline]
pub fn sum_and_squash<P: NumericProfile>(
    input: &[P::Activation],
    weights: &[P::Weight],
    biases: &[P::Bias],
    output: &mut [P::Activation],
) {
    let fan_in = input.len();
    debug_assert_eq!(weights.len(), output.len() * fan_in);
    debug_assert_eq!(biases.len(), output.len());

    for ((out, row), &bias) in output.iter_mut().zip(weights.chunks_exact(fan_in)).zip(biases) {
        let mut acc = P::zero();
        for (&a, &w) in input.iter().zip(row) {
            acc = P::accumulate(acc, a, w);
        }
        *out = P::squash(P::add_bias(acc, bias));
    }
}

/// Index of the largest value. Ties go to the lowest index.
///
/// Returns `Err(EmptyCollection)` for an empty slice.
pub fn argmax<T: PartialOrd + Copy>(data: &[T]) -> NetResult<usize> {
    let (first, rest) = data.split_first().ok_or(NetError::EmptyCollection)?;
    let mut max_val = *first;
    let mut max_idx = 0;
    for (i, &val) in rest.iter().enumerate() {
        if val > max_val {
            max_val = val;
            max_idx = i + 1;
        }
    }
    Ok(max_idx)
}

impl<P: NumericProfile> Network<'_, P> {
    /// Propagate the current input activations through every layer.
    pub fn forward_propagate(&mut self) -> NetResult<()> {
        let dims = self.dims;
        let nh = dims.hidden;

        let (neurons, weights) = hidden_ranges(&dims, 0)?;
        sum_and_squash::<P>(
            &self.input,
            &self.hidden_weights[weights],
            &self.hidden_biases[neurons.clone()],
            &mut self.hidden_activations[neurons],
        );
        log::trace!("forward: input -> hidden 0");

        for h in 1..dims.hidden_layers {
            let (neurons, weights) = hidden_ranges(&dims, h)?;
            let (previous, current) = self.hidden_activations.split_at_mut(neurons.start);
            sum_and_squash::<P>(
                &previous[neurons.start - nh..],
                &self.hidden_weights[weights],
                &self.hidden_biases[neurons],
                &mut current[..nh],
            );
            log::trace!("forward: hidden {} -> hidden {}", h - 1, h);
        }

        let last = dims.hidden_layers - 1;
        sum_and_squash::<P>(
            &self.hidden_activations[last * nh..],
            &self.output_weights,
            &self.output_biases,
            &mut self.output_activations,
        );
        log::trace!("forward: hidden {} -> output", last);
        Ok(())
    }

    /// Pick the strongest output neuron and record it as the network response.
    pub fn calculate_network_response(&mut self) -> NetResult<usize> {
        let response = argmax(&self.output_activations)?;
        self.properties.network_response = response;
        Ok(response)
    }

    /// Forward pass followed by response selection.
    pub fn classify(&mut self) -> NetResult<usize> {
        self.forward_propagate()?;
        self.calculate_network_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.5f32, 0.5, 0.2]).unwrap(), 0);
        assert_eq!(argmax(&[1i8, 3, 3, -2]).unwrap(), 1);
    }

    #[test]
    fn test_argmax_empty() {
        let empty: [i16; 0] = [];
        assert_eq!(argmax(&empty), Err(NetError::EmptyCollection));
    }

    #[test]
    fn test_sum_and_squash_q7() {
        use crate::profile::Q7Profile;
        // 64 * 64 = 4096, >> 6 = 64; plus bias 64 → 65
        let input = [64i8, 0];
        let weights = [64i8, 100, -64, 0];
        let biases = [64i16, 0];
        let mut out = [0i8; 2];
        sum_and_squash::<Q7Profile>(&input, &weights, &biases, &mut out);
        assert_eq!(out, [65, 0]);
    }
}
