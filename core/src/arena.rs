//! Bump arena for the static allocation strategy.
//!
//! MCUs built without a heap give the network one pre-sized block (usually a
//! `static` or stack `[u8; N]` sized with [`crate::config::arena_bytes`]).
//! The arena carves typed, aligned sub-slices out of it front to back. There
//! is no free: everything lives as long as the block does.

use core::mem;

use bytemuck::Pod;

use crate::error::{NetError, NetResult};

/// Bump allocator over a borrowed byte buffer.
///
/// Lifetime `'a` ties every allocation to the buffer, so the borrow checker
/// rules out dangling layer storage at zero runtime cost.
pub struct Arena<'a> {
    buf: &'a mut [u8],
    used: usize,
    capacity: usize,
}

impl<'a> Arena<'a> {
    /// Create a new arena from a mutable byte buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let capacity = buf.len();
        Self { buf, used: 0, capacity }
    }

    /// Allocate a zero-initialised slice of `len` values of `T`.
    ///
    /// Padding is inserted in front of the slice when the cursor is not
    /// aligned for `T`; that padding counts towards [`Arena::used`].
    pub fn alloc_slice<T: Pod>(&mut self, len: usize) -> NetResult<&'a mut [T]> {
        let remaining = self.remaining();
        let bytes_needed = len
            .checked_mul(mem::size_of::<T>())
            .ok_or(NetError::OutOfMemory { requested: usize::MAX, remaining })?;
        let padding = self.buf.as_ptr().align_offset(mem::align_of::<T>());

        if padding == usize::MAX || padding.saturating_add(bytes_needed) > remaining {
            return Err(NetError::OutOfMemory {
                requested: bytes_needed,
                remaining,
            });
        }

        let buf = mem::take(&mut self.buf);
        let (_, rest) = buf.split_at_mut(padding);
        let (head, tail) = rest.split_at_mut(bytes_needed);
        self.buf = tail;
        self.used += padding + bytes_needed;

        let slice: &'a mut [T] = bytemuck::try_cast_slice_mut(head).map_err(|_| {
            NetError::OutOfMemory {
                requested: bytes_needed,
                remaining,
            }
        })?;
        slice.fill(T::zeroed());

        log::trace!("arena: {} x {} bytes at {:p}", len, mem::size_of::<T>(), slice.as_ptr());
        Ok(slice)
    }

    /// Copy `src` into the arena and hand back the arena-owned copy.
    pub fn alloc_copy<T: Pod>(&mut self, src: &[T]) -> NetResult<&'a [T]> {
        let dst = self.alloc_slice::<T>(src.len())?;
        dst.copy_from_slice(src);
        Ok(dst)
    }

    /// Bytes remaining in the arena.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Total capacity in bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated, alignment padding included.
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.used
    }
}
