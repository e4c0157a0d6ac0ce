//! The network aggregate: one input layer, `H` equal-width hidden layers and
//! an output layer, all stored as flat buffers.
//!
//! ```text
//! input[N0] → hidden[0][Nh] → … → hidden[H-1][Nh] → output[No]
//! ```
//!
//! Hidden activations, biases and error signals are each one `[H * Nh]`
//! buffer indexed by `(layer, neuron)`. Weights are row-major by
//! `(neuron, incoming)`: the first hidden layer's `Nh × N0` block followed
//! by `H - 1` blocks of `Nh × Nh`. The output layer keeps its own `No × Nh`
//! block. Shapes are fixed at construction and never change afterwards.

use core::ops::Range;

use rand::Rng;

use crate::config::Dimensions;
use crate::error::{NetError, NetResult};
use crate::profile::NumericProfile;
use crate::storage::{Allocation, Storage, Strategy};

/// Bookkeeping shared by every operation on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkProperties {
    /// Hidden layers + 2.
    pub num_layers: usize,
    pub num_hidden_layers: usize,
    /// Index of the output neuron picked by the last response calculation.
    pub network_response: usize,
}

/// Addresses one layer for the diagnostic accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerId {
    Input,
    Hidden(usize),
    Output,
}

/// Read-only view of one layer. `biases` and `weights` are empty for the
/// input layer.
pub struct LayerView<'n, P: NumericProfile> {
    pub activations: &'n [P::Activation],
    pub biases: &'n [P::Bias],
    /// `activations.len() × fan_in`, row-major.
    pub weights: &'n [P::Weight],
    pub fan_in: usize,
}

/// Mutable view of one layer, for loading known parameters.
pub struct LayerViewMut<'n, P: NumericProfile> {
    pub activations: &'n mut [P::Activation],
    pub biases: &'n mut [P::Bias],
    pub weights: &'n mut [P::Weight],
    pub fan_in: usize,
}

/// A fully-connected feed-forward network over numeric profile `P`.
///
/// # Lifetime `'a`
/// Ties arena-backed buffers to their block. Heap-backed networks are
/// `Network<'static, P>`.
pub struct Network<'a, P: NumericProfile> {
    pub(crate) dims: Dimensions,
    pub(crate) properties: NetworkProperties,
    strategy: Strategy,

    pub(crate) input: Storage<'a, P::Activation>,

    pub(crate) hidden_activations: Storage<'a, P::Activation>,
    pub(crate) hidden_biases: Storage<'a, P::Bias>,
    pub(crate) hidden_weights: Storage<'a, P::Weight>,

    pub(crate) output_activations: Storage<'a, P::Activation>,
    pub(crate) output_biases: Storage<'a, P::Bias>,
    pub(crate) output_weights: Storage<'a, P::Weight>,

    // Training scratch, sized once here so a training step never allocates.
    pub(crate) hidden_errors: Storage<'a, f32>,
    pub(crate) output_errors: Storage<'a, f32>,
    pub(crate) class_costs: Storage<'a, f32>,
    // One bin per input neuron for histogram input.
    pub(crate) histogram_counts: Storage<'a, u32>,
}

impl<'a, P: NumericProfile> Network<'a, P> {
    /// Build a network and randomise every weight and bias.
    ///
    /// Fails with `InvalidArgument` if any dimension is zero (or a fan-in
    /// overflows the profile's accumulator) and with `OutOfMemory` if the
    /// buffer lengths overflow `usize` or the allocation strategy runs dry.
    /// Nothing is kept on failure.
    pub fn new<R: Rng + ?Sized>(
        dims: Dimensions,
        allocation: &mut Allocation<'a>,
        rng: &mut R,
    ) -> NetResult<Self> {
        dims.validate::<P>()?;

        let (hidden, hidden_weight_count, output_weight_count) = dims.buffer_lengths()?;
        let strategy = allocation.strategy();

        let input = allocation.alloc(dims.inputs)?;
        log::debug!("input layer: {} neurons at {:p}", dims.inputs, input.as_ptr());

        let hidden_activations = allocation.alloc(hidden)?;
        let hidden_biases = allocation.alloc(hidden)?;
        let hidden_weights = allocation.alloc(hidden_weight_count)?;
        log::debug!(
            "hidden layers: {} x {} neurons, {} weights at {:p}",
            dims.hidden_layers,
            dims.hidden,
            hidden_weight_count,
            hidden_weights.as_ptr()
        );

        let output_activations = allocation.alloc(dims.outputs)?;
        let output_biases = allocation.alloc(dims.outputs)?;
        let output_weights = allocation.alloc(output_weight_count)?;
        log::debug!(
            "output layer: {} neurons, {} weights at {:p}",
            dims.outputs,
            output_weight_count,
            output_weights.as_ptr()
        );

        let hidden_errors = allocation.alloc(hidden)?;
        let output_errors = allocation.alloc(dims.outputs)?;
        let class_costs = allocation.alloc(dims.outputs)?;
        let histogram_counts = allocation.alloc(dims.inputs)?;

        let mut network = Self {
            dims,
            properties: NetworkProperties {
                num_layers: dims.num_layers(),
                num_hidden_layers: dims.hidden_layers,
                network_response: 0,
            },
            strategy,
            input,
            hidden_activations,
            hidden_biases,
            hidden_weights,
            output_activations,
            output_biases,
            output_weights,
            hidden_errors,
            output_errors,
            class_costs,
            histogram_counts,
        };
        network.randomize(rng);

        if let Some(remaining) = allocation.remaining() {
            log::debug!("{} network built, {} arena bytes left", P::NAME, remaining);
        }
        Ok(network)
    }

    /// Draw fresh uniform weights and biases from the profile's unit range.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for w in self.hidden_weights.iter_mut().chain(self.output_weights.iter_mut()) {
            *w = P::random_weight(rng);
        }
        for b in self.hidden_biases.iter_mut().chain(self.output_biases.iter_mut()) {
            *b = P::random_bias(rng);
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn properties(&self) -> NetworkProperties {
        self.properties
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Class picked by the last [`Network::calculate_network_response`].
    pub fn network_response(&self) -> usize {
        self.properties.network_response
    }

    pub fn input_activations(&self) -> &[P::Activation] {
        &self.input
    }

    pub fn output_activations(&self) -> &[P::Activation] {
        &self.output_activations
    }

    /// Read-only view of a layer.
    pub fn layer(&self, id: LayerId) -> NetResult<LayerView<'_, P>> {
        let dims = self.dims;
        match id {
            LayerId::Input => Ok(LayerView {
                activations: &self.input,
                biases: &[],
                weights: &[],
                fan_in: 0,
            }),
            LayerId::Hidden(h) => {
                let (neurons, weights) = hidden_ranges(&dims, h)?;
                Ok(LayerView {
                    activations: &self.hidden_activations[neurons.clone()],
                    biases: &self.hidden_biases[neurons],
                    weights: &self.hidden_weights[weights],
                    fan_in: hidden_fan_in(&dims, h),
                })
            }
            LayerId::Output => Ok(LayerView {
                activations: &self.output_activations,
                biases: &self.output_biases,
                weights: &self.output_weights,
                fan_in: dims.hidden,
            }),
        }
    }

    /// Mutable view of a layer.
    pub fn layer_mut(&mut self, id: LayerId) -> NetResult<LayerViewMut<'_, P>> {
        let dims = self.dims;
        match id {
            LayerId::Input => Ok(LayerViewMut {
                activations: &mut self.input,
                biases: &mut [],
                weights: &mut [],
                fan_in: 0,
            }),
            LayerId::Hidden(h) => {
                let (neurons, weights) = hidden_ranges(&dims, h)?;
                Ok(LayerViewMut {
                    activations: &mut self.hidden_activations[neurons.clone()],
                    biases: &mut self.hidden_biases[neurons],
                    weights: &mut self.hidden_weights[weights],
                    fan_in: hidden_fan_in(&dims, h),
                })
            }
            LayerId::Output => Ok(LayerViewMut {
                activations: &mut self.output_activations,
                biases: &mut self.output_biases,
                weights: &mut self.output_weights,
                fan_in: dims.hidden,
            }),
        }
    }

    /// Row-major weights of a layer, for loading trained parameters.
    pub fn weights_mut(&mut self, id: LayerId) -> NetResult<&mut [P::Weight]> {
        self.layer_mut(id).map(|layer| layer.weights)
    }

    pub fn biases_mut(&mut self, id: LayerId) -> NetResult<&mut [P::Bias]> {
        self.layer_mut(id).map(|layer| layer.biases)
    }

    /// Activation of one neuron.
    pub fn activation(&self, id: LayerId, neuron: usize) -> NetResult<P::Activation> {
        let layer = self.layer(id)?;
        layer
            .activations
            .get(neuron)
            .copied()
            .ok_or(NetError::IndexOutOfRange { index: neuron, len: layer.activations.len() })
    }

    /// Bias of one neuron. The input layer has none.
    pub fn bias(&self, id: LayerId, neuron: usize) -> NetResult<P::Bias> {
        if id == LayerId::Input {
            return Err(NetError::InvalidArgument);
        }
        let layer = self.layer(id)?;
        layer
            .biases
            .get(neuron)
            .copied()
            .ok_or(NetError::IndexOutOfRange { index: neuron, len: layer.biases.len() })
    }

    /// Weight of the connection from `incoming` in the previous layer to
    /// `neuron` in this one.
    pub fn weight(&self, id: LayerId, neuron: usize, incoming: usize) -> NetResult<P::Weight> {
        if id == LayerId::Input {
            return Err(NetError::InvalidArgument);
        }
        let layer = self.layer(id)?;
        let neurons = layer.activations.len();
        if neuron >= neurons {
            return Err(NetError::IndexOutOfRange { index: neuron, len: neurons });
        }
        if incoming >= layer.fan_in {
            return Err(NetError::IndexOutOfRange { index: incoming, len: layer.fan_in });
        }
        Ok(layer.weights[neuron * layer.fan_in + incoming])
    }
}

/// Neuron and weight ranges of hidden layer `h` inside the flat buffers.
pub(crate) fn hidden_ranges(dims: &Dimensions, h: usize) -> NetResult<(Range<usize>, Range<usize>)> {
    if h >= dims.hidden_layers {
        return Err(NetError::IndexOutOfRange { index: h, len: dims.hidden_layers });
    }
    let nh = dims.hidden;
    let neurons = h * nh..(h + 1) * nh;
    let weights = if h == 0 {
        0..nh * dims.inputs
    } else {
        let start = nh * dims.inputs + (h - 1) * nh * nh;
        start..start + nh * nh
    };
    Ok((neurons, weights))
}

pub(crate) fn hidden_fan_in(dims: &Dimensions, h: usize) -> usize {
    if h == 0 {
        dims.inputs
    } else {
        dims.hidden
    }
}
