//! One owned training context: a network, its example store and its RNG.
//!
//! Nothing in the crate is global. A host that wants the classic
//! init / add data / train / classify flow keeps one `Session` and calls
//! through it; independent sessions never share state.

use core::time::Duration;

use rand::Rng;

use crate::config::{Dimensions, TrainingOptions};
use crate::dataset::{Sample, TrainingStore};
use crate::driver::{Clock, TrainingDriver, TrainingReport};
use crate::error::NetResult;
use crate::network::Network;
use crate::profile::NumericProfile;
use crate::storage::Allocation;

pub struct Session<'a, P: NumericProfile, St, R> {
    network: Network<'a, P>,
    store: St,
    rng: R,
    options: TrainingOptions,
}

impl<'a, P: NumericProfile, St, R: Rng> Session<'a, P, St, R> {
    /// Build the network (randomised from `rng`) and take ownership of the
    /// store.
    pub fn new(
        dims: Dimensions,
        allocation: &mut Allocation<'a>,
        store: St,
        mut rng: R,
    ) -> NetResult<Self> {
        let network = Network::new(dims, allocation, &mut rng)?;
        Ok(Self { network, store, rng, options: TrainingOptions::default() })
    }

    /// Options used by both drivers; their learning rate is overridden per call.
    pub fn with_options(mut self, options: TrainingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn network(&self) -> &Network<'a, P> {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network<'a, P> {
        &mut self.network
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn input_raw<S: Sample>(&mut self, data: &[S]) -> NetResult<()> {
        self.network.input_raw(data)
    }

    pub fn input_min_max_scale<S: Sample>(&mut self, data: &[S], min: f32, max: f32) -> NetResult<()> {
        self.network.input_min_max_scale(data, min, max)
    }

    pub fn input_standardize_scale<S: Sample>(
        &mut self,
        data: &[S],
        mean: f32,
        std_dev: f32,
    ) -> NetResult<()> {
        self.network.input_standardize_scale(data, mean, std_dev)
    }

    pub fn forward_propagate(&mut self) -> NetResult<()> {
        self.network.forward_propagate()
    }

    pub fn calculate_network_response(&mut self) -> NetResult<usize> {
        self.network.calculate_network_response()
    }

    pub fn train(&mut self, correct: usize, learning_rate: f32) -> NetResult<()> {
        self.network.train(correct, learning_rate)
    }

    pub fn add_training_data<S: Sample>(&mut self, data: &'a [S], correct: usize) -> NetResult<()>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.add(data, correct)
    }

    pub fn copy_training_data<S: Sample>(&mut self, data: &[S], correct: usize) -> NetResult<()>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.copy_add(data, correct)
    }

    pub fn training_data_mean<S: Sample>(&self) -> NetResult<f32>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.mean()
    }

    pub fn training_data_std_dev<S: Sample>(&self) -> NetResult<f32>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.std_dev()
    }

    pub fn training_data_max<S: Sample>(&self) -> NetResult<S>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.max()
    }

    pub fn training_data_min<S: Sample>(&self) -> NetResult<S>
    where
        St: TrainingStore<'a, S>,
    {
        self.store.min()
    }

    /// Time-boxed driver against `clock`.
    pub fn train_driver_in_time<S: Sample, C: Clock + ?Sized>(
        &mut self,
        learning_rate: f32,
        duration: Duration,
        clock: &C,
    ) -> NetResult<TrainingReport>
    where
        St: TrainingStore<'a, S>,
    {
        let driver = TrainingDriver::new(self.options.with_learning_rate(learning_rate));
        driver.run_for(&mut self.network, &self.store, &mut self.rng, duration, clock)
    }

    /// Convergence-boxed driver.
    pub fn train_driver_in_error<S: Sample>(
        &mut self,
        learning_rate: f32,
        desired_cost: f32,
    ) -> NetResult<TrainingReport>
    where
        St: TrainingStore<'a, S>,
    {
        let driver = TrainingDriver::new(self.options.with_learning_rate(learning_rate));
        driver.run_until_cost(&mut self.network, &self.store, &mut self.rng, desired_cost)
    }

    /// Scale `data` the way the drivers do, then forward pass and response
    /// selection.
    pub fn classify<S: Sample>(&mut self, data: &[S]) -> NetResult<usize>
    where
        St: TrainingStore<'a, S>,
    {
        let scaling = self.options.scaling.resolve(&self.store)?;
        self.network.input_scaled(data, &scaling)?;
        self.network.classify()
    }
}
