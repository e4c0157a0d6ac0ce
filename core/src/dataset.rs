//! Training example store.
//!
//! Two implementations of one [`TrainingStore`] trait:
//!
//! - [`FixedTrainingSet`]: at most `N` entries in a `heapless::Vec`, copied
//!   samples carved out of an [`Arena`]. No heap.
//! - [`HeapTrainingSet`]: grows on the heap (`alloc` feature).
//!
//! `add` keeps a borrow of the caller's buffer, `copy_add` stores a copy the
//! store owns. The borrow is checked by `'a`, so a borrowed sample can never
//! outlive its buffer.

use core::fmt::Debug;
use core::mem;
use core::ops::Deref;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use bytemuck::Pod;
use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::arena::Arena;
use crate::error::{NetError, NetResult};

/// A raw sample value: any plain numeric type.
pub trait Sample: Pod + PartialOrd + ToPrimitive + Debug {}

impl<T: Pod + PartialOrd + ToPrimitive + Debug> Sample for T {}

/// Where the samples of one example live.
#[derive(Debug)]
pub enum ExampleData<'a, S> {
    /// A caller buffer, or a copy inside the store's arena.
    Slice(&'a [S]),
    #[cfg(feature = "alloc")]
    Owned(Vec<S>),
}

impl<S> Deref for ExampleData<'_, S> {
    type Target = [S];

    fn deref(&self) -> &[S] {
        match self {
            ExampleData::Slice(slice) => slice,
            #[cfg(feature = "alloc")]
            ExampleData::Owned(vec) => vec,
        }
    }
}

/// One labelled sample.
#[derive(Debug)]
pub struct TrainingExample<'a, S> {
    correct_response: usize,
    data: ExampleData<'a, S>,
}

impl<'a, S> TrainingExample<'a, S> {
    pub fn new(data: ExampleData<'a, S>, correct_response: usize) -> Self {
        Self { correct_response, data }
    }

    pub fn data(&self) -> &[S] {
        &self.data
    }

    /// The class this example should be classified as.
    pub fn correct_response(&self) -> usize {
        self.correct_response
    }
}

/// Labelled examples plus the statistics the input scalers need.
///
/// Implementors provide storage; sampling and statistics are shared.
pub trait TrainingStore<'a, S: Sample> {
    /// Store a borrow of `data`. Zero-length data is `InvalidArgument`.
    fn add(&mut self, data: &'a [S], correct_response: usize) -> NetResult<()>;

    /// Store a copy of `data`. Zero-length data is `InvalidArgument`.
    fn copy_add(&mut self, data: &[S], correct_response: usize) -> NetResult<()>;

    fn examples(&self) -> &[TrainingExample<'a, S>];

    fn examples_mut(&mut self) -> &mut [TrainingExample<'a, S>];

    fn len(&self) -> usize {
        self.examples().len()
    }

    fn is_empty(&self) -> bool {
        self.examples().is_empty()
    }

    fn get(&self, index: usize) -> NetResult<&TrainingExample<'a, S>> {
        let examples = self.examples();
        examples.get(index).ok_or(NetError::IndexOutOfRange { index, len: examples.len() })
    }

    fn iter(&self) -> core::slice::Iter<'_, TrainingExample<'a, S>> {
        self.examples().iter()
    }

    /// Fisher–Yates shuffle of the stored order.
    fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.examples_mut().shuffle(rng);
    }

    /// Uniformly chosen example.
    fn random_example<R: Rng + ?Sized>(&self, rng: &mut R) -> NetResult<&TrainingExample<'a, S>> {
        self.examples().choose(rng).ok_or(NetError::EmptyCollection)
    }

    /// Uniformly chosen example labelled `class`. `EmptyCollection` when
    /// the class has no examples.
    fn random_example_of_class<R: Rng + ?Sized>(
        &self,
        class: usize,
        rng: &mut R,
    ) -> NetResult<&TrainingExample<'a, S>> {
        let count = self.count_of_class(class);
        if count == 0 {
            return Err(NetError::EmptyCollection);
        }
        let pick = rng.gen_range(0..count);
        self.iter()
            .filter(|example| example.correct_response == class)
            .nth(pick)
            .ok_or(NetError::EmptyCollection)
    }

    fn count_of_class(&self, class: usize) -> usize {
        self.iter().filter(|example| example.correct_response == class).count()
    }

    /// Largest sample value over every stored example.
    fn max(&self) -> NetResult<S> {
        fold_values(self.examples(), |best, value| value > best)
    }

    /// Smallest sample value over every stored example.
    fn min(&self) -> NetResult<S> {
        fold_values(self.examples(), |best, value| value < best)
    }

    /// Mean of every stored sample value.
    fn mean(&self) -> NetResult<f32> {
        let (sum, count) = sum_values(self.examples(), |x| x)?;
        Ok((sum / count as f64) as f32)
    }

    /// Population standard deviation of every stored sample value.
    fn std_dev(&self) -> NetResult<f32> {
        let mean = f64::from(self.mean()?);
        let (sum, count) = sum_values(self.examples(), |x| (x - mean) * (x - mean))?;
        Ok(libm::sqrt(sum / count as f64) as f32)
    }
}

fn fold_values<S: Sample>(
    examples: &[TrainingExample<'_, S>],
    replaces: impl Fn(S, S) -> bool,
) -> NetResult<S> {
    let mut values = examples.iter().flat_map(|example| example.data().iter().copied());
    let first = values.next().ok_or(NetError::EmptyCollection)?;
    Ok(values.fold(first, |best, value| if replaces(best, value) { value } else { best }))
}

fn sum_values<S: Sample>(
    examples: &[TrainingExample<'_, S>],
    term: impl Fn(f64) -> f64,
) -> NetResult<(f64, usize)> {
    if examples.is_empty() {
        return Err(NetError::EmptyCollection);
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for value in examples.iter().flat_map(|example| example.data().iter()) {
        sum += term(value.to_f64().ok_or(NetError::InvalidArgument)?);
        count += 1;
    }
    Ok((sum, count))
}

fn full_store<S: Sample>() -> NetError {
    NetError::OutOfMemory {
        requested: mem::size_of::<TrainingExample<'static, S>>(),
        remaining: 0,
    }
}

// =============================================================================
// Fixed capacity
// =============================================================================

/// Up to `N` examples, no heap. Copies go into the arena given at
/// construction; without one, `copy_add` is `OutOfMemory`.
pub struct FixedTrainingSet<'a, S, const N: usize> {
    entries: heapless::Vec<TrainingExample<'a, S>, N>,
    arena: Option<Arena<'a>>,
}

impl<'a, S: Sample, const N: usize> FixedTrainingSet<'a, S, N> {
    /// A store that only accepts borrowed examples.
    pub fn new() -> Self {
        Self { entries: heapless::Vec::new(), arena: None }
    }

    /// A store whose copies are carved out of `arena`. Size it with
    /// [`crate::config::example_arena_bytes`].
    pub fn with_arena(arena: Arena<'a>) -> Self {
        Self { entries: heapless::Vec::new(), arena: Some(arena) }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn push(&mut self, data: ExampleData<'a, S>, correct_response: usize) -> NetResult<()> {
        self.entries
            .push(TrainingExample::new(data, correct_response))
            .map_err(|_| full_store::<S>())
    }
}

impl<S: Sample, const N: usize> Default for FixedTrainingSet<'_, S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, S: Sample, const N: usize> TrainingStore<'a, S> for FixedTrainingSet<'a, S, N> {
    fn add(&mut self, data: &'a [S], correct_response: usize) -> NetResult<()> {
        if data.is_empty() {
            return Err(NetError::InvalidArgument);
        }
        self.push(ExampleData::Slice(data), correct_response)
    }

    fn copy_add(&mut self, data: &[S], correct_response: usize) -> NetResult<()> {
        if data.is_empty() {
            return Err(NetError::InvalidArgument);
        }
        // Check the slot first so a full store does not eat arena bytes.
        if self.entries.is_full() {
            return Err(full_store::<S>());
        }
        let arena = self.arena.as_mut().ok_or(NetError::OutOfMemory {
            requested: data.len() * mem::size_of::<S>(),
            remaining: 0,
        })?;
        let copy = arena.alloc_copy(data)?;
        self.push(ExampleData::Slice(copy), correct_response)
    }

    fn examples(&self) -> &[TrainingExample<'a, S>] {
        &self.entries
    }

    fn examples_mut(&mut self) -> &mut [TrainingExample<'a, S>] {
        &mut self.entries
    }
}

// =============================================================================
// Heap
// =============================================================================

/// Growable store; every copied example is its own exact-size allocation.
#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct HeapTrainingSet<'a, S> {
    entries: Vec<TrainingExample<'a, S>>,
}

#[cfg(feature = "alloc")]
impl<'a, S: Sample> HeapTrainingSet<'a, S> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn push(&mut self, data: ExampleData<'a, S>, correct_response: usize) -> NetResult<()> {
        self.entries.try_reserve(1).map_err(|_| full_store::<S>())?;
        self.entries.push(TrainingExample::new(data, correct_response));
        Ok(())
    }
}

#[cfg(feature = "alloc")]
impl<'a, S: Sample> TrainingStore<'a, S> for HeapTrainingSet<'a, S> {
    fn add(&mut self, data: &'a [S], correct_response: usize) -> NetResult<()> {
        if data.is_empty() {
            return Err(NetError::InvalidArgument);
        }
        self.push(ExampleData::Slice(data), correct_response)
    }

    fn copy_add(&mut self, data: &[S], correct_response: usize) -> NetResult<()> {
        if data.is_empty() {
            return Err(NetError::InvalidArgument);
        }
        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len()).map_err(|_| NetError::OutOfMemory {
            requested: data.len() * mem::size_of::<S>(),
            remaining: 0,
        })?;
        copy.extend_from_slice(data);
        self.push(ExampleData::Owned(copy), correct_response)
    }

    fn examples(&self) -> &[TrainingExample<'a, S>] {
        &self.entries
    }

    fn examples_mut(&mut self) -> &mut [TrainingExample<'a, S>] {
        &mut self.entries
    }
}
