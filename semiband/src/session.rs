//! Session lifecycle: scoring context, per-alignment DP context, and the
//! fill chainer.
//!
//! A [`Session`] is built once per scoring configuration and is immutable
//! afterwards; any number of [`DpContext`]s may share it read-only. Each
//! context owns an arena chain; blocks live until the context is dropped.
//!
//! The chainer runs three phases of decreasing throughput per fill call:
//! bulk-predetermined (no per-block bound tests), bulk-seq-bounded
//! (X-drop / ij / p tests per block), and cap (per-column section-edge
//! tests). When the arena cannot hold the whole extension it emits complete
//! head/blocks/tail runs and grows the stack in between.

use sb_simd::{hmax16, widen, V16};
use sb_types::{I, PAD};

use crate::arena::{Arena, Off};
use crate::block::{
    Block, BlockCore, JointHead, JointTail, PhantomBlock, BLOCK_SIZE, HEAD_SIZE, PHANTOM_SIZE,
    TAIL_SIZE,
};
use crate::blocks::{fill_block, fill_cap_block, Det, FillRegs};
use crate::params::{BandMode, Params};
use crate::reader::{load_fn, LoadFn, Reader, Section, SectionPair, SeqPair};
use crate::score::{middle_delta, seed_core, ScoreVec};
use crate::{CTR, DEBUG, INIT_STACK_SIZE, L, MIN_BULK_BLOCKS, W};

/// Continuation state of a chain after a fill call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    /// The chain may be extended with further sections.
    Cont,
    /// X-drop fired, the guide ran out, or resources were exhausted; the
    /// chain must not be extended (the tail, when present, is still valid
    /// for traceback).
    Term,
}

/// Handle to a [`JointTail`] in the context's arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TailRef(pub(crate) Off);

/// Result of a fill call: the new tail (absent only on allocation failure)
/// and the continuation status.
#[derive(Clone, Copy, Debug)]
pub struct ChainStatus {
    pub tail: Option<TailRef>,
    pub status: Status,
}

/// Immutable scoring context shared by DP contexts.
#[derive(Clone, Debug)]
pub struct Session {
    params: Params,
    scv: ScoreVec,
    md: [i16; W],
    seed: BlockCore,
    tx: i32,
    loada: LoadFn,
    loadb: LoadFn,
}

impl Session {
    /// Build a scoring context. Returns `None` for unusable parameters
    /// (degenerate matrix, negative X-drop).
    pub fn init(params: &Params) -> Option<Session> {
        let params = params.restored();
        if !params.is_valid() {
            return None;
        }
        let cm = params.score_matrix;
        let md = middle_delta(&cm);
        Some(Session {
            params,
            scv: ScoreVec::new(&cm),
            md,
            seed: seed_core(&cm, &md),
            tx: params.xdrop as i32,
            loada: load_fn(params.seq_a_direction, params.seq_a_format),
            loadb: load_fn(params.seq_b_direction, params.seq_b_format),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Create a per-alignment DP context over a sequence pair. `guide` is
    /// required in guided band mode and ignored otherwise. Returns `None`
    /// when the initial arena cannot be allocated or the guide is missing.
    pub fn dp_init<'s>(
        &self,
        seqs: SeqPair<'s>,
        guide: Option<&'s [u8]>,
    ) -> Option<DpContext<'s>> {
        if self.params.band == BandMode::Guided && guide.is_none() {
            return None;
        }
        Some(DpContext {
            arena: Arena::with_capacity(INIT_STACK_SIZE)?,
            scv: self.scv,
            md: self.md,
            seed: self.seed,
            tx: self.tx,
            band: self.params.band,
            loada: self.loada,
            loadb: self.loadb,
            seqs,
            guide,
            gpos: 0,
            root: None,
        })
    }
}

/// Per-alignment DP context. Owns the arena chain holding every record the
/// fills of this alignment produce.
pub struct DpContext<'s> {
    arena: Arena,
    scv: ScoreVec,
    md: [i16; W],
    seed: BlockCore,
    tx: i32,
    band: BandMode,
    loada: LoadFn,
    loadb: LoadFn,
    seqs: SeqPair<'s>,
    guide: Option<&'s [u8]>,
    gpos: usize,
    root: Option<TailRef>,
}

impl<'s> DpContext<'s> {
    /// Lay down the root run (head, seed phantom, root tail) and return it
    /// as the starting chain status. The opening section pair is needed to
    /// pre-load the sequence windows around the origin.
    pub fn dp_build_root(&mut self, sec: &SectionPair) -> ChainStatus {
        let rd = Reader::new(*sec);
        let mut wa = [PAD; W];
        let mut wb = [PAD; W];
        for q in 0..W {
            wa[q] = rd.sym_a(&self.seqs, self.loada, CTR as I - 1 - q as I);
            wb[q] = rd.sym_b(&self.seqs, self.loadb, q as I - (CTR as I + 1));
        }

        let Some(head) = self.alloc_run_front() else {
            return ChainStatus {
                tail: None,
                status: Status::Term,
            };
        };
        self.arena.put(
            head,
            JointHead {
                prev_tail: Off::NONE,
                _reserved: [0; 2],
            },
        );
        let phantom = head.add(HEAD_SIZE);
        self.arena.put(phantom, PhantomBlock { core: self.seed });

        let root_max = {
            let scores = widen(sb_simd::V8::from_array(self.seed.max)) + V16::from_array(self.md);
            hmax16(scores) as i32 + self.seed.offset
        };
        let Some(tail_off) = self.arena.alloc(TAIL_SIZE) else {
            return ChainStatus {
                tail: None,
                status: Status::Term,
            };
        };
        self.arena.put(
            tail_off,
            JointTail {
                md: self.md,
                p: 2,
                mp: -1,
                mq: 0,
                max: root_max,
                psum: 2,
                acnt: 0,
                bcnt: 0,
                nblk: 0,
                _reserved: 0,
                last: phantom,
                wa,
                wb,
            },
        );
        let tail = TailRef(tail_off);
        self.root = Some(tail);
        ChainStatus {
            tail: Some(tail),
            status: Status::Cont,
        }
    }

    /// The root chain status, once built.
    pub fn dp_build_stat(&self) -> Option<ChainStatus> {
        self.root.map(|tail| ChainStatus {
            tail: Some(tail),
            status: Status::Cont,
        })
    }

    /// Extend the chain ending at `prev` across `sec`. Emits one or more
    /// head/blocks/tail runs into the arena and returns the final tail.
    pub fn fill(&mut self, prev: TailRef, sec: &SectionPair) -> ChainStatus {
        let mut prev_tail = *self.arena.get::<JointTail>(prev.0);
        let mut prev_ref = prev;
        let mut rd = Reader::new(*sec);

        // A chain cannot be extended along an empty strand.
        if sec.body.alen <= 0 || sec.body.blen <= 0 {
            return match self.finish_run_empty(prev_ref, &prev_tail, &rd) {
                Some(tail) => ChainStatus {
                    tail: Some(tail),
                    status: Status::Term,
                },
                None => ChainStatus {
                    tail: None,
                    status: Status::Term,
                },
            };
        }

        let mut regs = FillRegs::load(
            self.arena.get::<BlockCore>(prev_tail.last),
            &prev_tail.wa,
            &prev_tail.wb,
        );
        let mut det = match self.band {
            BandMode::Dynamic => Det::Dynamic,
            BandMode::Guided => Det::Guided {
                guide: self.guide.unwrap_or(&[]),
                pos: self.gpos,
            },
        };
        if let Det::Guided { guide, pos } = &det {
            if let Some(&g) = guide.get(*pos) {
                regs.dir.clamp(g != 0);
            }
        }

        // Grow the arena until the whole extension fits the current chunk,
        // flushing complete runs when a grow is not yet due.
        let mut fill_p: I = 0;
        let whole = (rd.a_rem() + rd.b_rem()).max(0) as usize;
        let required = (whole / L + 2).max(MIN_BULK_BLOCKS + 1);
        loop {
            let mem = self.mem_blocks();
            if mem >= required {
                break;
            }
            if mem > MIN_BULK_BLOCKS && self.seq_blocks(&rd, fill_p) > 0 {
                let take = mem.min(self.seq_blocks(&rd, fill_p));
                let Some((tail, status)) =
                    self.run_predetd(prev_ref, &prev_tail, &mut regs, &mut det, &mut rd, take)
                else {
                    return self.oom(&det);
                };
                if status == Status::Term {
                    self.save_det(&det);
                    return ChainStatus {
                        tail: Some(tail),
                        status,
                    };
                }
                prev_ref = tail;
                prev_tail = *self.arena.get::<JointTail>(tail.0);
                fill_p += prev_tail.p;
            }
            if self.mem_blocks() < required && self.arena.add_stack().is_err() {
                return self.oom(&det);
            }
        }

        // Final run: bulk-predetermined, then bulk-seq-bounded, then cap.
        let result =
            self.run_seq_bounded(prev_ref, &prev_tail, &mut regs, &mut det, &mut rd, fill_p);
        self.save_det(&det);
        match result {
            Some((tail, status)) => ChainStatus {
                tail: Some(tail),
                status,
            },
            None => ChainStatus {
                tail: None,
                status: Status::Term,
            },
        }
    }

    /// Flat-argument entry: body section, lookahead section, p-limit.
    pub fn fill_sections(
        &mut self,
        prev: TailRef,
        curr: Section,
        next: Section,
        p_limit: I,
    ) -> ChainStatus {
        self.fill(
            prev,
            &SectionPair {
                body: curr,
                tail: next,
                limp: p_limit,
            },
        )
    }

    /// Read a tail record.
    pub fn tail(&self, t: TailRef) -> &JointTail {
        self.arena.get(t.0)
    }

    /// The reconstructed score at the band center when this tail was
    /// written: `offset + delta[center] + md[center]`.
    pub fn center_score(&self, t: TailRef) -> i32 {
        let tail = self.tail(t);
        let core = self.arena.get::<BlockCore>(tail.last);
        core.offset + core.delta[CTR] as i32 + tail.md[CTR] as i32
    }

    /// The blocks of the run ending at `t`, in p-order. Exposed so that
    /// traceback and tests can walk the persisted records.
    pub fn run_blocks(&self, t: TailRef) -> impl Iterator<Item = &Block> {
        let tail = self.tail(t);
        let nblk = tail.nblk as usize;
        let first = Off {
            chunk: t.0.chunk,
            off: t.0.off - (nblk * BLOCK_SIZE) as u32,
        };
        (0..nblk).map(move |i| self.arena.get::<Block>(first.add(i * BLOCK_SIZE)))
    }

    /// The head bracketing the run that ends at `t`.
    pub fn run_head(&self, t: TailRef) -> &JointHead {
        let tail = self.tail(t);
        let off = t.0.off as usize - tail.nblk as usize * BLOCK_SIZE - PHANTOM_SIZE - HEAD_SIZE;
        self.arena.get(Off {
            chunk: t.0.chunk,
            off: off as u32,
        })
    }

    /// Release the context. Dropping does the same; this spelling matches
    /// the lifecycle described in the session docs.
    pub fn dp_clean(self) {}

    // ---- chainer internals ----

    fn save_det(&mut self, det: &Det) {
        if let Det::Guided { pos, .. } = det {
            self.gpos = *pos;
        }
    }

    fn oom(&mut self, det: &Det) -> ChainStatus {
        self.save_det(det);
        ChainStatus {
            tail: None,
            status: Status::Term,
        }
    }

    /// Current-chunk headroom in whole blocks, after the per-run reserve.
    fn mem_blocks(&self) -> usize {
        let reserve = HEAD_SIZE + PHANTOM_SIZE + TAIL_SIZE + 3 * BLOCK_SIZE;
        self.arena.headroom().saturating_sub(reserve) / BLOCK_SIZE
    }

    /// Whole blocks of bulk headroom left by the body section and p-limit.
    fn seq_blocks(&self, rd: &Reader, p: I) -> usize {
        let a = rd.sec.body.alen - rd.a_ahead();
        let b = rd.sec.body.blen - rd.b_ahead();
        let pl = rd.sec.limp - p;
        (a.min(b).min(pl).max(0) as usize) / L
    }

    fn alloc_run_front(&mut self) -> Option<Off> {
        let head = self.arena.alloc(HEAD_SIZE)?;
        self.arena.alloc(PHANTOM_SIZE)?;
        Some(head)
    }

    /// Joint head plus phantom snapshot, seeding a run with the register
    /// state.
    fn create_head(&mut self, prev: TailRef, regs: &FillRegs) -> Option<Off> {
        let head = self.alloc_run_front()?;
        self.arena.put(
            head,
            JointHead {
                prev_tail: prev.0,
                _reserved: [0; 2],
            },
        );
        let phantom = head.add(HEAD_SIZE);
        self.arena.put(phantom, PhantomBlock { core: regs.store() });
        Some(phantom)
    }

    /// Joint tail closing a run: reconstruct the best observed score through
    /// the middle delta and persist the continuation state.
    fn create_tail(
        &mut self,
        prev: &JointTail,
        regs: &FillRegs,
        rd: &Reader,
        p: I,
        nblk: u32,
        last: Off,
    ) -> Option<TailRef> {
        let scores = widen(regs.max) + V16::from_array(prev.md);
        let max = hmax16(scores) as i32 + regs.offset;
        let off = self.arena.alloc(TAIL_SIZE)?;
        self.arena.put(
            off,
            JointTail {
                md: prev.md,
                p,
                mp: -1,
                mq: 0,
                max,
                psum: prev.psum + p as i64,
                acnt: rd.acnt,
                bcnt: rd.bcnt,
                nblk,
                _reserved: 0,
                last,
                wa: regs.wa.to_array(),
                wb: regs.wb.to_array(),
            },
        );
        Some(TailRef(off))
    }

    /// Degenerate run for an empty section: bracket the previous snapshot
    /// without advancing.
    fn finish_run_empty(
        &mut self,
        prev: TailRef,
        prev_tail: &JointTail,
        rd: &Reader,
    ) -> Option<TailRef> {
        if self.arena.headroom() < HEAD_SIZE + PHANTOM_SIZE + TAIL_SIZE + BLOCK_SIZE
            && self.arena.add_stack().is_err()
        {
            return None;
        }
        let regs = FillRegs::load(
            self.arena.get::<BlockCore>(prev_tail.last),
            &prev_tail.wa,
            &prev_tail.wb,
        );
        let phantom = self.create_head(prev, &regs)?;
        self.create_tail(prev_tail, &regs, rd, 0, 0, phantom)
    }

    /// Phase A only, bounded by a block budget: fill back-to-back checking
    /// nothing but X-drop, then bracket. Used when memory runs out before
    /// the section does.
    fn run_predetd(
        &mut self,
        prev: TailRef,
        prev_tail: &JointTail,
        regs: &mut FillRegs,
        det: &mut Det,
        rd: &mut Reader,
        blk_cnt: usize,
    ) -> Option<(TailRef, Status)> {
        let phantom = self.create_head(prev, regs)?;
        let mut last = phantom;
        let mut status = Status::Cont;
        let mut p = 0;
        let mut nblk = 0;
        let mut fa = [PAD; L];
        let mut fb = [PAD; L];
        for _ in 0..blk_cnt {
            if self.tx - regs.center_max() < 0 {
                status = Status::Term;
                break;
            }
            if !det.block_available() {
                status = Status::Term;
                break;
            }
            rd.bulk_fetch(&self.seqs, self.loada, self.loadb, &mut fa, &mut fb);
            let blk = fill_block(regs, det, &self.scv, rd, &fa, &fb);
            let off = self.arena.alloc(BLOCK_SIZE)?;
            self.arena.put(off, blk);
            last = off;
            nblk += 1;
            p += L as I;
        }
        let tail = self.create_tail(prev_tail, regs, rd, p, nblk, last)?;
        if DEBUG {
            eprintln!("predetd run: {nblk} blocks, p {p}, {status:?}");
        }
        Some((tail, status))
    }

    /// The full phase sequence for the final run of a fill call. `base_p`
    /// is the p already advanced by earlier runs of the same call, counted
    /// against the p-limit.
    fn run_seq_bounded(
        &mut self,
        prev: TailRef,
        prev_tail: &JointTail,
        regs: &mut FillRegs,
        det: &mut Det,
        rd: &mut Reader,
        base_p: I,
    ) -> Option<(TailRef, Status)> {
        let phantom = self.create_head(prev, regs)?;
        let mut last = phantom;
        let mut status = Status::Cont;
        let mut p: I = 0;
        let mut nblk = 0u32;
        let mut fa = [PAD; L];
        let mut fb = [PAD; L];

        // Phase A: while plenty of section remains, skip per-block bound
        // tests entirely.
        'outer: loop {
            let mut bulk = self.seq_blocks(rd, base_p + p);
            while bulk > MIN_BULK_BLOCKS {
                for _ in 0..bulk {
                    if self.tx - regs.center_max() < 0 || !det.block_available() {
                        status = Status::Term;
                        break 'outer;
                    }
                    rd.bulk_fetch(&self.seqs, self.loada, self.loadb, &mut fa, &mut fb);
                    let blk = fill_block(regs, det, &self.scv, rd, &fa, &fb);
                    let off = self.arena.alloc(BLOCK_SIZE)?;
                    self.arena.put(off, blk);
                    last = off;
                    nblk += 1;
                    p += L as I;
                }
                bulk = self.seq_blocks(rd, base_p + p);
            }

            // Phase B: per-block X-drop / ij-bound / p-bound tests.
            loop {
                if self.tx - regs.center_max() < 0 || !det.block_available() {
                    status = Status::Term;
                    break 'outer;
                }
                if rd.sec.limp - (base_p + p) < L as I {
                    // p-limit: stop cleanly, skip the cap
                    break 'outer;
                }
                if !rd.bulk_ok() {
                    break;
                }
                rd.bulk_fetch(&self.seqs, self.loada, self.loadb, &mut fa, &mut fb);
                let blk = fill_block(regs, det, &self.scv, rd, &fa, &fb);
                let off = self.arena.alloc(BLOCK_SIZE)?;
                self.arena.put(off, blk);
                last = off;
                nblk += 1;
                p += L as I;
            }

            // Phase C: cap fill along the section edges.
            while rd.a_rem() > 0 || rd.b_rem() > 0 {
                if self.tx - regs.center_max() < 0 || !det.block_available() {
                    status = Status::Term;
                    break 'outer;
                }
                rd.cap_fetch(&self.seqs, self.loada, self.loadb, &mut fa, &mut fb);
                let (blk, cols) = fill_cap_block(regs, det, &self.scv, rd, &fa, &fb);
                let off = self.arena.alloc(BLOCK_SIZE)?;
                self.arena.put(off, blk);
                last = off;
                nblk += 1;
                p += cols;
            }
            break;
        }

        let tail = self.create_tail(prev_tail, regs, rd, p, nblk, last)?;
        if DEBUG {
            eprintln!(
                "run: {nblk} blocks, p {p}, acnt {} bcnt {}, {status:?}",
                rd.acnt, rd.bcnt
            );
        }
        Some((tail, status))
    }
}
