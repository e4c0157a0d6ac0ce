//! Build-time configuration.
//!
//! The numeric profile is picked with a Cargo feature (`profile-q15`,
//! `profile-q7`, otherwise f32). Layer dimensions for the static strategy
//! come in as a `const Dimensions`, and [`arena_bytes`] turns them into the
//! size of the block to reserve:
//!
//! ```
//! use microprop_core::config::{arena_bytes, Dimensions};
//! use microprop_core::profile::Q7Profile;
//!
//! const DIMS: Dimensions = Dimensions::new(15, 10, 5, 3);
//! static ARENA_LEN: usize = arena_bytes::<Q7Profile>(&DIMS);
//! assert!(ARENA_LEN > 0);
//! ```

use core::mem;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, NetResult};
use crate::input::InputScaling;
use crate::profile::NumericProfile;
use crate::storage::arena_footprint;

#[cfg(feature = "profile-q15")]
pub type DefaultProfile = crate::profile::Q15Profile;
#[cfg(all(feature = "profile-q7", not(feature = "profile-q15")))]
pub type DefaultProfile = crate::profile::Q7Profile;
#[cfg(not(any(feature = "profile-q15", feature = "profile-q7")))]
pub type DefaultProfile = crate::profile::F32Profile;

/// The layer dimensions of a network: the four `init` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub inputs: usize,
    /// Neurons per hidden layer (all hidden layers share one width).
    pub hidden: usize,
    pub hidden_layers: usize,
    pub outputs: usize,
}

/// Dimensions of the reference build: 15 inputs, 5 × 10 hidden, 3 classes.
pub const DEFAULT_DIMENSIONS: Dimensions = Dimensions::new(15, 10, 5, 3);

impl Dimensions {
    pub const fn new(inputs: usize, hidden: usize, hidden_layers: usize, outputs: usize) -> Self {
        Self { inputs, hidden, hidden_layers, outputs }
    }

    /// Zero-check, the accumulator fan-in bound of profile `P`, and a check
    /// that every buffer length fits in `usize`.
    pub fn validate<P: NumericProfile>(&self) -> NetResult<()> {
        if self.inputs == 0 || self.hidden == 0 || self.hidden_layers == 0 || self.outputs == 0 {
            return Err(NetError::InvalidArgument);
        }
        let widest_fan_in = if self.inputs > self.hidden { self.inputs } else { self.hidden };
        if widest_fan_in > P::MAX_FAN_IN {
            log::warn!(
                "fan-in {} exceeds the {} accumulator bound of {}",
                widest_fan_in,
                P::NAME,
                P::MAX_FAN_IN
            );
            return Err(NetError::InvalidArgument);
        }
        self.buffer_lengths().map(|_| ())
    }

    /// Input + hidden + output.
    pub const fn num_layers(&self) -> usize {
        self.hidden_layers.saturating_add(2)
    }

    /// `None` if the count overflows `usize`.
    pub const fn hidden_neuron_count(&self) -> Option<usize> {
        self.hidden.checked_mul(self.hidden_layers)
    }

    /// First hidden layer is `hidden × inputs`, the rest `hidden × hidden`.
    pub const fn hidden_weight_count(&self) -> Option<usize> {
        let first = match self.hidden.checked_mul(self.inputs) {
            Some(n) => n,
            None => return None,
        };
        let square = match self.hidden.checked_mul(self.hidden) {
            Some(n) => n,
            None => return None,
        };
        match square.checked_mul(self.hidden_layers.saturating_sub(1)) {
            Some(rest) => first.checked_add(rest),
            None => None,
        }
    }

    pub const fn output_weight_count(&self) -> Option<usize> {
        self.outputs.checked_mul(self.hidden)
    }

    /// `(hidden neurons, hidden weights, output weights)`. Dimensions whose
    /// buffers cannot even be counted can never be allocated, so overflow
    /// is `OutOfMemory`.
    pub(crate) fn buffer_lengths(&self) -> NetResult<(usize, usize, usize)> {
        match (self.hidden_neuron_count(), self.hidden_weight_count(), self.output_weight_count()) {
            (Some(neurons), Some(hidden_weights), Some(output_weights)) => {
                Ok((neurons, hidden_weights, output_weights))
            }
            _ => {
                log::warn!("{:?}: buffer lengths overflow usize", self);
                Err(NetError::OutOfMemory { requested: usize::MAX, remaining: 0 })
            }
        }
    }
}

const fn count_or_max(count: Option<usize>) -> usize {
    match count {
        Some(n) => n,
        None => usize::MAX,
    }
}

/// Bytes of arena a network of `dims` needs under profile `P`.
///
/// Counts every buffer the network allocates, training scratch included,
/// plus worst-case alignment padding. Saturates at `usize::MAX` for
/// dimensions no block could hold.
pub const fn arena_bytes<P: NumericProfile>(dims: &Dimensions) -> usize {
    let hidden = count_or_max(dims.hidden_neuron_count());
    let hidden_weights = count_or_max(dims.hidden_weight_count());
    let output_weights = count_or_max(dims.output_weight_count());
    let footprints = [
        arena_footprint::<P::Activation>(dims.inputs),
        arena_footprint::<P::Activation>(hidden),
        arena_footprint::<P::Bias>(hidden),
        arena_footprint::<P::Weight>(hidden_weights),
        arena_footprint::<f32>(hidden),
        arena_footprint::<P::Activation>(dims.outputs),
        arena_footprint::<P::Bias>(dims.outputs),
        arena_footprint::<P::Weight>(output_weights),
        arena_footprint::<f32>(dims.outputs),
        arena_footprint::<f32>(dims.outputs),
        arena_footprint::<u32>(dims.inputs),
    ];
    let mut total = 0usize;
    let mut i = 0;
    while i < footprints.len() {
        total = total.saturating_add(footprints[i]);
        i += 1;
    }
    total
}

/// Bytes of arena a fixed training store needs to copy `entries` examples of
/// `len` samples each.
pub const fn example_arena_bytes<S>(entries: usize, len: usize) -> usize {
    entries.saturating_mul(arena_footprint::<S>(len))
}

/// Knobs shared by both training drivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub learning_rate: f32,
    /// How stored examples are mapped onto the input layer.
    pub scaling: InputScaling,
    /// Hard stop after this many steps, whatever the other stop condition.
    pub max_iterations: Option<u64>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            scaling: InputScaling::StoreMinMax,
            max_iterations: None,
        }
    }
}

impl TrainingOptions {
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_scaling(mut self, scaling: InputScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}
