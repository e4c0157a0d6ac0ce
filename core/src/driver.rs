//! Training drivers: repeated forward/train steps over random examples.
//!
//! Both drivers share one step:
//!
//! 1. draw a class uniformly, then an example of that class (any example
//!    when the class has none; its own label is then used)
//! 2. scale it into the input layer
//! 3. forward pass, record the class cost, train on the label
//!
//! They differ only in when they stop. A class cost is recorded before that
//! step's update, and later steps on other classes can undo it, so the
//! convergence driver re-scores every stored example before it reports
//! convergence. Both also stop on a [`CancelToken`]
//! and on `TrainingOptions::max_iterations`, so a host is never blocked
//! without a way out.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use rand::Rng;

use crate::config::TrainingOptions;
use crate::dataset::{Sample, TrainingStore};
use crate::error::{NetError, NetResult};
use crate::input::InputScaling;
use crate::network::Network;
use crate::profile::NumericProfile;

/// Millisecond time source for the time-boxed driver.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Wall clock backed by `std::time::Instant`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Cooperative stop request, checked once per iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelToken<'c> {
    flag: Option<&'c AtomicBool>,
}

impl<'c> CancelToken<'c> {
    /// A token that never fires.
    pub const fn never() -> Self {
        Self { flag: None }
    }

    /// Fires once `flag` is set.
    pub const fn new(flag: &'c AtomicBool) -> Self {
        Self { flag: Some(flag) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Why a driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimeExpired,
    Converged,
    IterationCap,
    Cancelled,
}

/// Outcome of one driver run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub iterations: u64,
    pub stop: StopReason,
    /// Highest per-class cost when the driver stopped. Infinite if some
    /// class with examples was never drawn. On `Converged` it is measured
    /// against the final weights.
    pub worst_cost: f32,
}

/// Runs training steps until a stop condition holds.
#[derive(Debug, Clone, Copy)]
pub struct TrainingDriver<'c> {
    options: TrainingOptions,
    cancel: CancelToken<'c>,
}

impl<'c> TrainingDriver<'c> {
    pub fn new(options: TrainingOptions) -> Self {
        Self { options, cancel: CancelToken::never() }
    }

    pub fn with_cancel(mut self, cancel: CancelToken<'c>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Time-boxed training: run until `duration` has elapsed on `clock`.
    pub fn run_for<'s, P, S, T, R, C>(
        &self,
        network: &mut Network<'_, P>,
        store: &T,
        rng: &mut R,
        duration: Duration,
        clock: &C,
    ) -> NetResult<TrainingReport>
    where
        P: NumericProfile,
        S: Sample,
        T: TrainingStore<'s, S>,
        R: Rng + ?Sized,
        C: Clock + ?Sized,
    {
        let scaling = self.prepare(network, store)?;
        let budget = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let start = clock.now_ms();
        log::info!(
            "training for {} ms on {} examples at rate {}",
            budget,
            store.len(),
            self.options.learning_rate
        );

        let mut iterations = 0u64;
        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if clock.now_ms().saturating_sub(start) >= budget {
                break StopReason::TimeExpired;
            }
            if self.capped(iterations) {
                break StopReason::IterationCap;
            }
            self.step(network, store, rng, &scaling)?;
            iterations += 1;
        };

        Ok(self.finish(network, iterations, stop))
    }

    /// Convergence-boxed training: run until every class cost is at or
    /// below `desired_cost`.
    pub fn run_until_cost<'s, P, S, T, R>(
        &self,
        network: &mut Network<'_, P>,
        store: &T,
        rng: &mut R,
        desired_cost: f32,
    ) -> NetResult<TrainingReport>
    where
        P: NumericProfile,
        S: Sample,
        T: TrainingStore<'s, S>,
        R: Rng + ?Sized,
    {
        if !(desired_cost >= 0.0) {
            return Err(NetError::InvalidArgument);
        }
        let scaling = self.prepare(network, store)?;
        log::info!(
            "training to cost {} on {} examples at rate {}",
            desired_cost,
            store.len(),
            self.options.learning_rate
        );

        let mut iterations = 0u64;
        let stop = loop {
            if converged(network, desired_cost) {
                rescore(network, store, &scaling)?;
                if converged(network, desired_cost) {
                    break StopReason::Converged;
                }
                log::debug!("stale class costs after {} iterations, training on", iterations);
            }
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.capped(iterations) {
                break StopReason::IterationCap;
            }
            self.step(network, store, rng, &scaling)?;
            iterations += 1;
        };

        Ok(self.finish(network, iterations, stop))
    }

    fn capped(&self, iterations: u64) -> bool {
        self.options.max_iterations.is_some_and(|cap| iterations >= cap)
    }

    /// Validate the run and reset the per-class costs.
    fn prepare<'s, P, S, T>(&self, network: &mut Network<'_, P>, store: &T) -> NetResult<InputScaling>
    where
        P: NumericProfile,
        S: Sample,
        T: TrainingStore<'s, S>,
    {
        let rate = self.options.learning_rate;
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(NetError::InvalidArgument);
        }
        if store.is_empty() {
            return Err(NetError::EmptyCollection);
        }

        let dims = network.dims;
        for example in store.iter() {
            if example.correct_response() >= dims.outputs {
                return Err(NetError::IndexOutOfRange {
                    index: example.correct_response(),
                    len: dims.outputs,
                });
            }
            if example.data().len() != dims.inputs {
                return Err(NetError::DimensionMismatch {
                    expected: dims.inputs,
                    actual: example.data().len(),
                });
            }
        }

        let scaling = self.options.scaling.resolve(store)?;
        log::debug!("input scaling resolved to {:?}", scaling);

        // Classes nobody can draw count as converged.
        for (class, cost) in network.class_costs.iter_mut().enumerate() {
            *cost = if store.count_of_class(class) > 0 { f32::INFINITY } else { 0.0 };
        }
        Ok(scaling)
    }

    fn step<'s, P, S, T, R>(
        &self,
        network: &mut Network<'_, P>,
        store: &T,
        rng: &mut R,
        scaling: &InputScaling,
    ) -> NetResult<()>
    where
        P: NumericProfile,
        S: Sample,
        T: TrainingStore<'s, S>,
        R: Rng + ?Sized,
    {
        let class = rng.gen_range(0..network.dims.outputs);
        let example = match store.random_example_of_class(class, rng) {
            Ok(example) => example,
            Err(NetError::EmptyCollection) => store.random_example(rng)?,
            Err(e) => return Err(e),
        };
        let label = example.correct_response();

        network.input_scaled(example.data(), scaling)?;
        network.forward_propagate()?;
        let cost = network.cost(label)?;
        network.class_costs[label] = cost;
        network.train(label, self.options.learning_rate)?;

        log::trace!("step: class {} cost {}", label, cost);
        Ok(())
    }

    fn finish<P: NumericProfile>(
        &self,
        network: &Network<'_, P>,
        iterations: u64,
        stop: StopReason,
    ) -> TrainingReport {
        let worst_cost = network.class_costs.iter().copied().fold(0.0f32, f32::max);
        log::info!(
            "training stopped after {} iterations ({:?}), worst class cost {}",
            iterations,
            stop,
            worst_cost
        );
        TrainingReport { iterations, stop, worst_cost }
    }
}

fn converged<P: NumericProfile>(network: &Network<'_, P>, desired_cost: f32) -> bool {
    network.class_costs.iter().all(|&cost| cost <= desired_cost)
}

/// Replace every class cost with the worst current cost over that class's
/// stored examples. Classes without examples keep their zero.
fn rescore<'s, P, S, T>(
    network: &mut Network<'_, P>,
    store: &T,
    scaling: &InputScaling,
) -> NetResult<()>
where
    P: NumericProfile,
    S: Sample,
    T: TrainingStore<'s, S>,
{
    network.class_costs.fill(0.0);
    for example in store.iter() {
        let label = example.correct_response();
        network.input_scaled(example.data(), scaling)?;
        network.forward_propagate()?;
        let cost = network.cost(label)?;
        if !(cost <= network.class_costs[label]) {
            network.class_costs[label] = cost;
        }
    }
    Ok(())
}

impl<P: NumericProfile> Network<'_, P> {
    /// Per-class cost recorded by the last driver run.
    pub fn class_costs(&self) -> &[f32] {
        &self.class_costs
    }
}
