//! The block fill inner loop.
//!
//! One block advances the band by [`L`] columns, all state in registers:
//! four 8-bit differential vectors (`dh`, `dv`, `de`, `df`), the 8-bit
//! score delta and running max, the two symbol windows, and the direction
//! determiner. Columns run the affine recurrence in differential form; the
//! block ends by rebasing the deltas against the center lane and storing
//! the registers into the block record.

use sb_simd::{adds, eq_mask, max8, shl1, shl1_u8, shr1, shr1_u8, shuffle16, splat8, subs, U8, V8};
use sb_types::{Base, I};

use crate::block::{Block, BlockCore, MaskPair};
use crate::dir::{DirState, Direction};
use crate::reader::Reader;
use crate::score::ScoreVec;
use crate::{CTR, L, W};

/// Fill state held in registers for the duration of a fill call.
#[derive(Clone, Copy)]
pub(crate) struct FillRegs {
    pub dir: DirState,
    pub offset: i32,
    pub dh: V8,
    pub dv: V8,
    pub de: V8,
    pub df: V8,
    pub delta: V8,
    pub max: V8,
    /// A-side symbol window; lane q holds the symbol lane q consumes.
    pub wa: U8,
    /// B-side symbol window.
    pub wb: U8,
}

/// How the upcoming column decisions are produced.
pub(crate) enum Det<'g> {
    Dynamic,
    Guided { guide: &'g [u8], pos: usize },
}

impl<'g> Det<'g> {
    /// Shift the decision bit for the next column into the history.
    #[inline(always)]
    fn push(&mut self, dir: &mut DirState, top_gain: i8, bottom_gain: i8) {
        match self {
            Det::Dynamic => dir.update(top_gain, bottom_gain),
            Det::Guided { guide, pos } => {
                *pos += 1;
                dir.update_guided(guide.get(*pos).is_some_and(|&g| g != 0));
            }
        }
    }

    /// A whole block of guided steps must be left; otherwise the fill
    /// terminates (exhausted guides are a termination condition).
    pub(crate) fn block_available(&self) -> bool {
        match self {
            Det::Dynamic => true,
            Det::Guided { guide, pos } => *pos + L <= guide.len(),
        }
    }
}

impl FillRegs {
    pub(crate) fn load(core: &BlockCore, wa: &[u8; W], wb: &[u8; W]) -> Self {
        FillRegs {
            dir: DirState::new(core.acc, core.dir),
            offset: core.offset,
            dh: V8::from_array(core.dh),
            dv: V8::from_array(core.dv),
            de: V8::from_array(core.de),
            df: V8::from_array(core.df),
            delta: V8::from_array(core.delta),
            max: V8::from_array(core.max),
            wa: U8::from_array(*wa),
            wb: U8::from_array(*wb),
        }
    }

    pub(crate) fn store(&self) -> BlockCore {
        BlockCore {
            dir: self.dir.array,
            acc: self.dir.acc,
            offset: self.offset,
            _reserved: 0,
            dh: self.dh.to_array(),
            dv: self.dv.to_array(),
            de: self.de.to_array(),
            df: self.df.to_array(),
            delta: self.delta.to_array(),
            max: self.max.to_array(),
        }
    }

    /// Running max at the band center, against which X-drop is tested.
    #[inline(always)]
    pub(crate) fn center_max(&self) -> i32 {
        self.max.to_array()[CTR] as i32
    }

    /// One column of the differential affine recurrence. `down` selects the
    /// band step; `fa`/`fb` is the symbol entering the window on a
    /// right/down step respectively.
    #[inline(always)]
    fn column(&mut self, sv: &ScoreVec, down: bool, fa: Base, fb: Base) -> (MaskPair, V8) {
        if down {
            self.dv = shr1(self.dv, 0);
            self.de = shr1(self.de, 0);
            self.wb = shr1_u8(self.wb, fb);
        } else {
            self.dh = shl1(self.dh, 0);
            self.df = shl1(self.df, 0);
            self.wa = shl1_u8(self.wa, fa);
        }

        // Substitution lookup: (a << 2) | b indexes the 4x4 table; a pad on
        // either side keeps its high bit and scores zero.
        let pad = (self.wa | self.wb) & U8::splat(0x80);
        let idx = ((self.wa << U8::splat(2)) | self.wb) | pad;
        let sub = shuffle16(sv.sbv, idx);

        // Gap layers relative to the diagonal ancestor: extend or re-open.
        let se = subs(max8(adds(self.de, self.dv), subs(self.dv, sv.giav)), sv.geav);
        let sf = subs(max8(adds(self.df, self.dh), subs(self.dh, sv.gibv)), sv.gebv);
        let t = max8(sub, max8(se, sf));

        let mask = MaskPair {
            h: eq_mask(t, sf),
            v: eq_mask(t, se),
        };

        let ndh = subs(t, self.dv);
        let ndv = subs(t, self.dh);
        self.de = subs(se, t);
        self.df = subs(sf, t);
        self.dh = ndh;
        self.dv = ndv;

        let gain = if down { ndv } else { ndh };
        self.delta = adds(self.delta, gain);
        self.max = max8(self.max, self.delta);
        (mask, gain)
    }

    /// Extract the center delta into the 32-bit offset and re-center the
    /// 8-bit vectors.
    fn rebase(&mut self) {
        let cd = self.delta.to_array()[CTR];
        self.offset += cd as i32;
        self.delta = subs(self.delta, splat8(cd));
        self.max = subs(self.max, splat8(cd));
    }
}

/// Fill one full block of [`L`] columns. The staged symbols `fa`/`fb` are
/// consumed in step order; the reader counters advance accordingly.
pub(crate) fn fill_block(
    regs: &mut FillRegs,
    det: &mut Det,
    sv: &ScoreVec,
    rd: &mut Reader,
    fa: &[Base; L],
    fb: &[Base; L],
) -> Block {
    let mut blk = Block {
        core: regs.store(),
        mask: [MaskPair::default(); L],
    };
    let mut ai = 0;
    let mut bi = 0;
    for k in 0..L {
        let down = regs.dir.step() == Direction::Down;
        let (mask, gain) = regs.column(sv, down, fa[ai], fb[bi]);
        if down {
            bi += 1;
            rd.bcnt += 1;
        } else {
            ai += 1;
            rd.acnt += 1;
        }
        let g = gain.to_array();
        det.push(&mut regs.dir, g[0], g[W - 1]);
        blk.mask[k] = mask;
    }
    regs.rebase();
    blk.core = regs.store();
    blk
}

/// Fill a cap block at the section edge: the step is clamped towards the
/// unconsumed strand, and the block exits early once both strands of the
/// body are consumed. Returns the block and the columns actually advanced.
pub(crate) fn fill_cap_block(
    regs: &mut FillRegs,
    det: &mut Det,
    sv: &ScoreVec,
    rd: &mut Reader,
    fa: &[Base; L],
    fb: &[Base; L],
) -> (Block, I) {
    let mut blk = Block {
        core: regs.store(),
        mask: [MaskPair::default(); L],
    };
    let mut ai = 0;
    let mut bi = 0;
    let mut cols = 0;
    for k in 0..L {
        if rd.a_rem() == 0 && rd.b_rem() == 0 {
            // both strands consumed mid-block: pad the remaining direction
            // bits and masks, report the shortened advance
            debug_assert!(cols > 0, "cap block entered with nothing to consume");
            regs.dir.adjust_remainder(cols - 1);
            for m in k..L {
                blk.mask[m] = blk.mask[k - 1];
            }
            break;
        }
        let mut down = regs.dir.is_down();
        if !down && rd.a_rem() == 0 {
            down = true;
            regs.dir.clamp(true);
        } else if down && rd.b_rem() == 0 {
            down = false;
            regs.dir.clamp(false);
        }
        let (mask, gain) = regs.column(sv, down, fa[ai], fb[bi]);
        if down {
            bi += 1;
            rd.bcnt += 1;
        } else {
            ai += 1;
            rd.acnt += 1;
        }
        let g = gain.to_array();
        det.push(&mut regs.dir, g[0], g[W - 1]);
        blk.mask[k] = mask;
        cols = k + 1;
    }
    regs.rebase();
    blk.core = regs.store();
    (blk, cols as I)
}
