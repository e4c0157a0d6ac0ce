//! Allocation strategies for network buffers.
//!
//! The network never touches an allocator directly. It asks an
//! [`Allocation`] for each flat buffer and gets back a [`Storage`], which
//! derefs to a slice whichever strategy produced it. Both strategies run the
//! exact same propagation and training code.

use core::mem;
use core::ops::{Deref, DerefMut};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use bytemuck::Pod;

use crate::arena::Arena;
use crate::error::NetResult;
#[cfg(feature = "alloc")]
use crate::error::NetError;

/// One contiguous buffer owned by the network.
pub enum Storage<'a, T> {
    /// Carved out of a caller-provided arena; lives as long as the arena block.
    Arena(&'a mut [T]),
    /// Separately heap-allocated to the exact size.
    #[cfg(feature = "alloc")]
    Heap(Vec<T>),
}

impl<T> Deref for Storage<'_, T> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        match self {
            Storage::Arena(slice) => slice,
            #[cfg(feature = "alloc")]
            Storage::Heap(vec) => vec,
        }
    }
}

impl<T> DerefMut for Storage<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            Storage::Arena(slice) => slice,
            #[cfg(feature = "alloc")]
            Storage::Heap(vec) => vec,
        }
    }
}

/// Which strategy a buffer or network was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Arena,
    Heap,
}

/// Allocation strategy selected at construction time.
pub enum Allocation<'a> {
    /// Everything lives in one pre-sized block.
    Arena(Arena<'a>),
    /// Every buffer is its own heap allocation.
    #[cfg(feature = "alloc")]
    Heap,
}

impl<'a> Allocation<'a> {
    /// Static strategy over a caller-owned byte block.
    pub fn arena(buf: &'a mut [u8]) -> Self {
        Allocation::Arena(Arena::new(buf))
    }

    /// Dynamic strategy.
    #[cfg(feature = "alloc")]
    pub fn heap() -> Self {
        Allocation::Heap
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Allocation::Arena(_) => Strategy::Arena,
            #[cfg(feature = "alloc")]
            Allocation::Heap => Strategy::Heap,
        }
    }

    /// Allocate `len` zeroed values of `T`.
    pub fn alloc<T: Pod>(&mut self, len: usize) -> NetResult<Storage<'a, T>> {
        match self {
            Allocation::Arena(arena) => arena.alloc_slice(len).map(Storage::Arena),
            #[cfg(feature = "alloc")]
            Allocation::Heap => {
                let mut buf = Vec::new();
                buf.try_reserve_exact(len).map_err(|_| NetError::OutOfMemory {
                    requested: len.saturating_mul(mem::size_of::<T>()),
                    remaining: 0,
                })?;
                buf.resize(len, T::zeroed());
                Ok(Storage::Heap(buf))
            }
        }
    }

    /// Bytes still available, `None` for the heap.
    pub fn remaining(&self) -> Option<usize> {
        match self {
            Allocation::Arena(arena) => Some(arena.remaining()),
            #[cfg(feature = "alloc")]
            Allocation::Heap => None,
        }
    }
}

/// Worst-case bytes one arena buffer of `len` values of `T` can take,
/// alignment padding included. Saturates rather than overflowing.
pub const fn arena_footprint<T>(len: usize) -> usize {
    len.saturating_mul(mem::size_of::<T>()).saturating_add(mem::align_of::<T>() - 1)
}
