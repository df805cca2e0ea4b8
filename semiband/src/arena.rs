//! Bump-pointer arena backing the per-alignment DP records.
//!
//! Joint heads, blocks and joint tails are written once during fill and then
//! only read (by continuation fills and by traceback), so the arena never
//! frees individual records: chunks are released all at once when the
//! context is dropped. Chunks are never relocated, which keeps handles to
//! older tails stable for the lifetime of the context.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

/// All arena allocations are aligned to this, so SIMD loads/stores of the
/// vectors inside a block are aligned.
pub const MEM_ALIGN: usize = 16;

/// Upper bound on the chunk chain. With doubling growth this allows several
/// orders of magnitude beyond any realistic fill.
const MAX_CHUNKS: usize = 24;

/// A chunk-relative handle. Chunk memory is stable, so a handle stays valid
/// until the arena is dropped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Off {
    pub chunk: u32,
    pub off: u32,
}

impl Off {
    pub const NONE: Off = Off {
        chunk: u32::MAX,
        off: u32::MAX,
    };

    pub fn is_none(&self) -> bool {
        *self == Off::NONE
    }

    /// Handle `bytes` further into the same chunk.
    pub fn add(self, bytes: usize) -> Off {
        Off {
            chunk: self.chunk,
            off: self.off + bytes as u32,
        }
    }
}

struct Chunk {
    ptr: NonNull<u8>,
    cap: usize,
}

pub struct Arena {
    chunks: Vec<Chunk>,
    /// Next chunk allocation size (doubles on growth).
    mem_size: usize,
    /// Bump offset within the last chunk.
    top: usize,
}

fn alloc_chunk(cap: usize) -> Option<Chunk> {
    let layout = Layout::from_size_align(cap, MEM_ALIGN).ok()?;
    // SAFETY: layout has non-zero size; the pointer is checked below.
    let ptr = unsafe { alloc(layout) };
    Some(Chunk {
        ptr: NonNull::new(ptr)?,
        cap,
    })
}

impl Arena {
    pub fn with_capacity(bytes: usize) -> Option<Arena> {
        let chunk = alloc_chunk(bytes)?;
        Some(Arena {
            chunks: vec![chunk],
            mem_size: bytes,
            top: 0,
        })
    }

    /// Bytes left in the current chunk.
    pub fn headroom(&self) -> usize {
        self.chunks.last().map_or(0, |c| c.cap - self.top)
    }

    /// Chain a new chunk of twice the previous size. The old chunks stay
    /// live; records already written keep their addresses. On failure the
    /// size is halved back and the arena is left unchanged.
    pub fn add_stack(&mut self) -> Result<(), ()> {
        self.mem_size *= 2;
        if self.chunks.len() >= MAX_CHUNKS {
            self.mem_size /= 2;
            return Err(());
        }
        match alloc_chunk(self.mem_size) {
            Some(chunk) => {
                self.chunks.push(chunk);
                self.top = 0;
                Ok(())
            }
            None => {
                self.mem_size /= 2;
                Err(())
            }
        }
    }

    /// Bump-allocate `size` bytes (rounded up to [`MEM_ALIGN`]) in the
    /// current chunk. Returns `None` when the chunk is full; the caller
    /// decides when to grow, so that a head/blocks/tail run stays contiguous
    /// within one chunk.
    pub fn alloc(&mut self, size: usize) -> Option<Off> {
        let size = (size + MEM_ALIGN - 1) & !(MEM_ALIGN - 1);
        if self.headroom() < size {
            return None;
        }
        let off = Off {
            chunk: (self.chunks.len() - 1) as u32,
            off: self.top as u32,
        };
        self.top += size;
        Some(off)
    }

    fn raw(&self, at: Off) -> *mut u8 {
        let chunk = &self.chunks[at.chunk as usize];
        debug_assert!((at.off as usize) < chunk.cap);
        // SAFETY: the offset was produced by alloc() for this chunk.
        unsafe { chunk.ptr.as_ptr().add(at.off as usize) }
    }

    /// Write a record at a handle returned by [`Arena::alloc`].
    ///
    /// SAFETY-contract kept internal: `at` must have been allocated with at
    /// least `size_of::<T>()` bytes, and `T` must tolerate the 16-byte arena
    /// alignment.
    pub fn put<T>(&mut self, at: Off, value: T) {
        debug_assert!(std::mem::align_of::<T>() <= MEM_ALIGN);
        unsafe { (self.raw(at) as *mut T).write(value) }
    }

    pub fn get<T>(&self, at: Off) -> &T {
        debug_assert!(std::mem::align_of::<T>() <= MEM_ALIGN);
        unsafe { &*(self.raw(at) as *const T) }
    }

    pub fn get_mut<T>(&mut self, at: Off) -> &mut T {
        debug_assert!(std::mem::align_of::<T>() <= MEM_ALIGN);
        unsafe { &mut *(self.raw(at) as *mut T) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for chunk in &self.chunks {
            // SAFETY: allocated in alloc_chunk with the same layout.
            unsafe {
                dealloc(
                    chunk.ptr.as_ptr(),
                    Layout::from_size_align(chunk.cap, MEM_ALIGN).unwrap(),
                );
            }
        }
    }
}
