//! Input policies: how an external sample becomes input-layer activations.
//!
//! Every policy takes a slice of any [`Sample`] type, rejects a length other
//! than the input width with `DimensionMismatch`, and converts through the
//! profile so integer profiles saturate instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::dataset::{Sample, TrainingStore};
use crate::error::{NetError, NetResult};
use crate::network::Network;
use crate::profile::NumericProfile;

/// Normalisation applied to a sample before it is fed to the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputScaling {
    /// Values are used as activations directly.
    Raw,
    /// `(x - min) / (max - min)`, 1.0 ≙ `MAX_ACTIVATION`.
    MinMax { min: f32, max: f32 },
    /// `(x - mean) / std_dev`.
    Standardize { mean: f32, std_dev: f32 },
    /// `MinMax` with bounds taken from the training store.
    StoreMinMax,
    /// `Standardize` with moments taken from the training store.
    StoreStandardize,
}

impl InputScaling {
    /// Replace the store-derived variants with concrete parameters.
    pub fn resolve<'a, S: Sample, T: TrainingStore<'a, S>>(&self, store: &T) -> NetResult<Self> {
        match *self {
            InputScaling::StoreMinMax => Ok(InputScaling::MinMax {
                min: store.min()?.to_f32().ok_or(NetError::InvalidArgument)?,
                max: store.max()?.to_f32().ok_or(NetError::InvalidArgument)?,
            }),
            InputScaling::StoreStandardize => Ok(InputScaling::Standardize {
                mean: store.mean()?,
                std_dev: store.std_dev()?,
            }),
            other => Ok(other),
        }
    }
}

impl<P: NumericProfile> Network<'_, P> {
    fn fill_input<S: Sample>(
        &mut self,
        data: &[S],
        convert: impl Fn(f32) -> P::Activation,
    ) -> NetResult<()> {
        if data.len() != self.dims.inputs {
            return Err(NetError::DimensionMismatch {
                expected: self.dims.inputs,
                actual: data.len(),
            });
        }
        for (slot, value) in self.input.iter_mut().zip(data) {
            *slot = convert(value.to_f32().ok_or(NetError::InvalidArgument)?);
        }
        Ok(())
    }

    /// Copy `data` into the input layer unscaled.
    pub fn input_raw<S: Sample>(&mut self, data: &[S]) -> NetResult<()> {
        self.fill_input(data, P::activation_from_raw)
    }

    /// Map `[min, max]` onto `[0, MAX_ACTIVATION]`.
    pub fn input_min_max_scale<S: Sample>(&mut self, data: &[S], min: f32, max: f32) -> NetResult<()> {
        let range = max - min;
        if !(range.is_finite() && range > 0.0) {
            log::warn!("min-max scaling over an empty range [{}, {}]", min, max);
            return Err(NetError::InvalidArgument);
        }
        self.fill_input(data, |x| P::activation_from_unit((x - min) / range))
    }

    /// Centre on `mean` and divide by `std_dev`.
    pub fn input_standardize_scale<S: Sample>(
        &mut self,
        data: &[S],
        mean: f32,
        std_dev: f32,
    ) -> NetResult<()> {
        if !(std_dev.is_finite() && std_dev > 0.0) || !mean.is_finite() {
            log::warn!("standardizing with mean {} and std dev {}", mean, std_dev);
            return Err(NetError::InvalidArgument);
        }
        self.fill_input(data, |x| P::activation_from_unit((x - mean) / std_dev))
    }

    /// Bucket raw readings into one bin per input neuron.
    ///
    /// `[0, max_input]` is split into `N0` equal bins; a reading lands in
    /// the first bin whose upper edge it does not exceed and readings past
    /// the last edge are dropped. Each neuron gets its bin's count relative
    /// to the fullest bin. `raw` may have any non-zero length.
    pub fn input_histogram<S: Sample>(&mut self, raw: &[S], max_input: f32) -> NetResult<()> {
        if raw.is_empty() || !(max_input.is_finite() && max_input > 0.0) {
            return Err(NetError::InvalidArgument);
        }
        let buckets = self.dims.inputs;
        let width = (max_input + 1.0) / buckets as f32;

        let counts = &mut self.histogram_counts;
        counts.fill(0);
        for value in raw {
            let x = value.to_f32().ok_or(NetError::InvalidArgument)?;
            if let Some(bucket) = histogram_bucket(x, width, buckets) {
                counts[bucket] = counts[bucket].saturating_add(1);
            }
        }

        let fullest = counts.iter().copied().max().unwrap_or(0);
        if fullest == 0 {
            log::warn!("histogram input: no reading within [0, {}]", max_input);
        }
        for (slot, &count) in self.input.iter_mut().zip(self.histogram_counts.iter()) {
            let value = if fullest == 0 { 0.0 } else { count as f32 / fullest as f32 };
            *slot = P::activation_from_unit(value);
        }
        Ok(())
    }

    /// Apply a concrete scaling policy. Store-derived policies must be
    /// resolved first with [`InputScaling::resolve`].
    pub fn input_scaled<S: Sample>(&mut self, data: &[S], scaling: &InputScaling) -> NetResult<()> {
        match *scaling {
            InputScaling::Raw => self.input_raw(data),
            InputScaling::MinMax { min, max } => self.input_min_max_scale(data, min, max),
            InputScaling::Standardize { mean, std_dev } => {
                self.input_standardize_scale(data, mean, std_dev)
            }
            InputScaling::StoreMinMax | InputScaling::StoreStandardize => {
                Err(NetError::InvalidArgument)
            }
        }
    }
}

/// Bin of reading `x`, or `None` past the last edge.
fn histogram_bucket(x: f32, width: f32, buckets: usize) -> Option<usize> {
    if x.is_nan() {
        return None;
    }
    if x <= width {
        return Some(0);
    }
    let bucket = (libm::ceilf(x / width) as usize).saturating_sub(1);
    (bucket < buckets).then_some(bucket)
}
