//! Persisted DP records: blocks, phantom blocks, joint heads and tails.
//!
//! Every fill call brackets the blocks it emits between one [`JointHead`]
//! and one [`JointTail`]; a zero-content [`PhantomBlock`] sits right after
//! the head carrying the snapshot the run resumes from. The layouts are
//! `repr(C)` and public so that traceback, an external consumer, can walk
//! the records without calling back into the engine.

use crate::arena::Off;
use crate::{L, W};

/// Per-column traceback masks: bit q of `h` is set when lane q chose the
/// vertical-gap (F) branch, bit q of `v` when it chose the horizontal-gap
/// (E) branch.
#[derive(Clone, Copy, Default, Debug)]
#[repr(C)]
pub struct MaskPair {
    pub h: u32,
    pub v: u32,
}

/// The resumable DP state: everything the next block needs from its
/// predecessor. Shared verbatim between [`Block`] and [`PhantomBlock`], so
/// seeding a run is a plain copy of this prefix.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
pub struct BlockCore {
    /// Direction bit array; LSB is the most recent decision, 1 = DOWN.
    pub dir: u32,
    /// Direction accumulator (top-edge minus bottom-edge gain).
    pub acc: i32,
    /// 32-bit score baseline; `offset + delta[q] + md[q]` recovers the score
    /// at lane q.
    pub offset: i32,
    pub _reserved: u32,
    /// Horizontal difference `S(i,j) - S(i-1,j)` per lane.
    pub dh: [i8; W],
    /// Vertical difference `S(i,j) - S(i,j-1)` per lane.
    pub dv: [i8; W],
    /// Horizontal-gap layer difference `E - S` per lane.
    pub de: [i8; W],
    /// Vertical-gap layer difference `F - S` per lane.
    pub df: [i8; W],
    /// 8-bit score deltas against `offset + md`.
    pub delta: [i8; W],
    /// Per-lane running maximum of `delta` since the last offset rebase.
    pub max: [i8; W],
}

/// One filled block: the shared core plus the per-column mask pairs.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
pub struct Block {
    pub core: BlockCore,
    pub mask: [MaskPair; L],
}

/// A zero-content block: only the snapshot, no mask array. Placed after a
/// joint head to seed a run.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
pub struct PhantomBlock {
    pub core: BlockCore,
}

/// Bracket record preceding the first block of a run; links back to the tail
/// the run resumed from so traceback can walk across fills.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
pub struct JointHead {
    /// Arena handle of the previous tail; `Off::NONE` for the root run.
    pub prev_tail: Off,
    pub _reserved: [u32; 2],
}

/// Bracket record following the last block of a run. Carries everything a
/// continuation fill needs.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
pub struct JointTail {
    /// Anti-drift baseline, 16-bit per lane; invariant across a chain and
    /// only ever replaced at joint boundaries.
    pub md: [i16; W],
    /// Columns advanced by this fill call.
    pub p: i32,
    /// p-coordinate of the best score within this run; -1 when not tracked.
    pub mp: i32,
    /// Lane of the best score within this run.
    pub mq: i32,
    /// Best reconstructed score observed so far along the chain.
    pub max: i32,
    /// Cumulative p across the chain, including the two seed columns.
    pub psum: i64,
    /// A/B symbols consumed from the body section by this fill.
    pub acnt: i32,
    pub bcnt: i32,
    /// Number of blocks emitted by this fill call.
    pub nblk: u32,
    pub _reserved: u32,
    /// Snapshot to resume from: the core of the last block of this run.
    pub last: Off,
    /// Saved A-side symbol window, lane order.
    pub wa: [u8; W],
    /// Saved B-side symbol window, lane order.
    pub wb: [u8; W],
}

pub const BLOCK_CORE_SIZE: usize = std::mem::size_of::<BlockCore>();
pub const BLOCK_SIZE: usize = std::mem::size_of::<Block>();
pub const PHANTOM_SIZE: usize = std::mem::size_of::<PhantomBlock>();
pub const HEAD_SIZE: usize = std::mem::size_of::<JointHead>();
pub const TAIL_SIZE: usize = std::mem::size_of::<JointTail>();
