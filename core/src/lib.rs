//! # microprop-core: Embedded Feed-Forward Classifier
//!
//! A `no_std` Rust library for training and running small fully-connected
//! classifiers on microcontrollers, with optional heap and `std` support.
//!
//! ## Architecture
//!
//! - **Numeric Profiles**: f32 (`tanh(acc·π)`), Q15 and Q7 fixed point (clamp)
//! - **Two Memory Strategies**: one pre-sized arena block, or exact-size heap buffers
//! - **Backprop Trainer**: one gradient step per labelled example, biases included
//! - **Training Drivers**: time-boxed and convergence-boxed loops with cancellation
//!
//! ## Usage
//!
//! ```ignore
//! use microprop_core::*;
//!
//! const DIMS: Dimensions = Dimensions::new(2, 4, 1, 2);
//! static mut BLOCK: [u8; arena_bytes::<Q7Profile>(&DIMS)] = [0; arena_bytes::<Q7Profile>(&DIMS)];
//!
//! let mut allocation = Allocation::arena(block);
//! let mut net: Network<'_, Q7Profile> = Network::new(DIMS, &mut allocation, &mut rng)?;
//!
//! let mut store: FixedTrainingSet<'_, u8, 16> = FixedTrainingSet::new();
//! store.add(&LOW, 0)?;
//! store.add(&HIGH, 1)?;
//!
//! let driver = TrainingDriver::new(TrainingOptions::default().with_max_iterations(10_000));
//! let report = driver.run_until_cost(&mut net, &store, &mut rng, 0.05)?;
//!
//! net.input_min_max_scale(&reading, 0.0, 255.0)?;
//! let class = net.classify()?;
//! ```

// Why #![no_std]: Compiles for bare-metal MCU targets.
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arena;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod forward;
pub mod input;
pub mod network;
pub mod profile;
pub mod session;
pub mod storage;
pub mod train;

// Re-export primary types
pub use arena::Arena;
pub use config::{
    arena_bytes, example_arena_bytes, DefaultProfile, Dimensions, TrainingOptions,
    DEFAULT_DIMENSIONS,
};
#[cfg(feature = "alloc")]
pub use dataset::HeapTrainingSet;
pub use dataset::{ExampleData, FixedTrainingSet, Sample, TrainingExample, TrainingStore};
#[cfg(feature = "std")]
pub use driver::StdClock;
pub use driver::{CancelToken, Clock, StopReason, TrainingDriver, TrainingReport};
pub use error::{NetError, NetResult};
pub use forward::{argmax, sum_and_squash};
pub use input::InputScaling;
pub use network::{LayerId, LayerView, LayerViewMut, Network, NetworkProperties};
pub use profile::{F32Profile, NumericProfile, Q15Profile, Q7Profile};
pub use session::Session;
pub use storage::{Allocation, Storage, Strategy};
