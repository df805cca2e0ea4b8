//! 32-lane vector primitives for the banded fill engine.
//!
//! Two widths are used: 8-bit lanes ([`V8`]) inside the block fill, and
//! 16-bit lanes ([`V16`]) for the anti-drift baseline and the final
//! reduction. On x86-64 each maps to four 128-bit registers (or two 256-bit
//! ones); `std::simd` picks the widest instructions available.
//!
//! Conventions:
//! - plain `+`/`-` on the vectors wrap; the saturating helpers clamp to the
//!   signed lane range.
//! - whole-vector shifts move lanes (not bits) and feed zero into the
//!   vacated lane.
//! - `shuffle16` follows `pshufb` semantics: the low four bits of each index
//!   select a table lane, and any index with the high bit set yields zero.

#![feature(portable_simd)]

use std::simd::prelude::*;

/// Number of lanes in every vector.
pub const LANES: usize = 32;

/// 32 signed 8-bit lanes.
pub type V8 = Simd<i8, LANES>;
/// 32 signed 16-bit lanes.
pub type V16 = Simd<i16, LANES>;
/// 32 unsigned 8-bit lanes, used for sequence symbols and shuffle indices.
pub type U8 = Simd<u8, LANES>;

#[inline(always)]
pub fn splat8(v: i8) -> V8 {
    V8::splat(v)
}

#[inline(always)]
pub fn splat16(v: i16) -> V16 {
    V16::splat(v)
}

#[inline(always)]
pub fn adds(a: V8, b: V8) -> V8 {
    a.saturating_add(b)
}

#[inline(always)]
pub fn subs(a: V8, b: V8) -> V8 {
    a.saturating_sub(b)
}

#[inline(always)]
pub fn max8(a: V8, b: V8) -> V8 {
    a.simd_max(b)
}

#[inline(always)]
pub fn min8(a: V8, b: V8) -> V8 {
    a.simd_min(b)
}

/// `!a & b`, the classic and-not.
#[inline(always)]
pub fn andnot(a: V8, b: V8) -> V8 {
    !a & b
}

/// Pack the `a == b` lane comparison into a 32-bit mask, lane 0 at bit 0.
#[inline(always)]
pub fn eq_mask(a: V8, b: V8) -> u32 {
    a.simd_eq(b).to_bitmask() as u32
}

/// Pack the lane sign bits into a 32-bit mask.
#[inline(always)]
pub fn movemask(a: V8) -> u32 {
    a.simd_lt(V8::splat(0)).to_bitmask() as u32
}

/// Shift the whole vector one lane towards lane 31, feeding `fill` into
/// lane 0.
#[inline(always)]
pub fn shl1(a: V8, fill: i8) -> V8 {
    let mut r = a.rotate_elements_right::<1>();
    r.as_mut_array()[0] = fill;
    r
}

/// Shift the whole vector one lane towards lane 0, feeding `fill` into
/// lane 31.
#[inline(always)]
pub fn shr1(a: V8, fill: i8) -> V8 {
    let mut r = a.rotate_elements_left::<1>();
    r.as_mut_array()[LANES - 1] = fill;
    r
}

/// Lane-shift for symbol windows, towards lane 31.
#[inline(always)]
pub fn shl1_u8(a: U8, fill: u8) -> U8 {
    let mut r = a.rotate_elements_right::<1>();
    r.as_mut_array()[0] = fill;
    r
}

/// Lane-shift for symbol windows, towards lane 0.
#[inline(always)]
pub fn shr1_u8(a: U8, fill: u8) -> U8 {
    let mut r = a.rotate_elements_left::<1>();
    r.as_mut_array()[LANES - 1] = fill;
    r
}

/// Table lookup: `out[q] = table[idx[q] & 0xf]`, or zero when the high bit of
/// `idx[q]` is set. `table` holds a 16-entry table; only its first 16 lanes
/// are read.
#[inline(always)]
pub fn shuffle16(table: V8, idx: U8) -> V8 {
    // swizzle_dyn zeroes out-of-range lanes, so the pad high bit maps to a
    // zero score without a separate blend.
    let table: U8 = table.cast();
    let idx = idx & U8::splat(0x8f);
    table.swizzle_dyn(idx).cast()
}

/// Horizontal maximum over all 16-bit lanes.
#[inline(always)]
pub fn hmax16(a: V16) -> i16 {
    a.reduce_max()
}

/// Widen 8-bit lanes to 16-bit lanes, preserving sign.
#[inline(always)]
pub fn widen(a: V8) -> V16 {
    a.cast()
}
