//! A banded semi-global sequence aligner for DNA.
//!
//! The engine fills an affine-gap dynamic-programming matrix along a band of
//! 32 lanes that follows the diagonal wavefront, 32 columns per SIMD block,
//! with scores held as 8-bit differences against a 32-bit baseline. Fills
//! terminate early on an X-drop condition and can be chained across section
//! pairs: each call resumes the state saved in the previous joint tail, so a
//! graph driver can extend one alignment across many nodes.
//!
//! ```
//! use sb_types::CostModel;
//!
//! let score = semiband::extend(b"ACGTACGTACGTACGT", b"ACGTACGTACGTACGT",
//!     &CostModel::simple(2, 3, 5, 1), 100);
//! assert_eq!(score, Some(32));
//! ```

#![feature(portable_simd)]

mod arena;
mod block;
mod blocks;
mod dir;
mod params;
mod reader;
mod score;
mod session;
#[cfg(test)]
mod tests;

pub use arena::Off;
pub use block::{
    Block, BlockCore, JointHead, JointTail, MaskPair, PhantomBlock, BLOCK_CORE_SIZE, BLOCK_SIZE,
    HEAD_SIZE, PHANTOM_SIZE, TAIL_SIZE,
};
pub use dir::Direction;
pub use params::{AlnFormat, BandMode, Params, SeqDir, SeqFormat};
pub use reader::{
    build_section, build_section_pair, build_seq_pair, Section, SectionPair, SeqPair,
};
pub use score::{middle_delta, ScoreVec, EDGE};
pub use session::{ChainStatus, DpContext, Session, Status, TailRef};

use sb_types::{CostModel, Score, Seq, I};

const DEBUG: bool = false;

/// Bandwidth: lanes across the band.
pub const W: usize = 32;
/// Center lane, where X-drop is tested and the offset is rebased.
pub const CTR: usize = W / 2;
/// Columns per block.
pub const L: usize = 32;
/// Minimum run length (in blocks) worth filling without per-block tests.
pub const MIN_BULK_BLOCKS: usize = 32;
/// Initial arena chunk: 32 MiB.
pub const INIT_STACK_SIZE: usize = 32 * 1024 * 1024;

/// One-shot extension alignment of two ASCII sequences: build a session,
/// fill a single section pair covering both, and report the tail score.
/// Returns `None` for an unusable scheme or empty input.
pub fn extend(a: Seq, b: Seq, cm: &CostModel, xdrop: i16) -> Option<Score> {
    let params = Params {
        xdrop,
        score_matrix: *cm,
        ..Params::default()
    };
    let session = Session::init(&params)?;
    let (alen, blen) = (a.len() as I, b.len() as I);
    let mut dp = session.dp_init(build_seq_pair(a, alen, b, blen), None)?;
    let sec = build_section_pair(
        build_section(0, alen, 0, blen),
        Section::default(),
        alen + blen + 2 * L as I,
    );
    let root = dp.dp_build_root(&sec).tail?;
    let stat = dp.fill(root, &sec);
    let tail = stat.tail?;
    Some(dp.tail(tail).max)
}
