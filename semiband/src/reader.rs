//! Sequence sections and the windowed symbol reader.
//!
//! The band compares two 32-symbol lane windows that slide along A and B.
//! Per block the reader stages up to [`L`] fresh symbols per side;
//! `bulk_fetch` is the branch-free fast path entirely inside the body
//! section, `cap_fetch` the slow path that straddles the body/tail section
//! boundary and pads past the end. Symbols are decoded to 2-bit codes by a
//! loader chosen at session init from the (direction, format) dispatch
//! table.

use itertools::izip;
use sb_types::{base_from_4bit, base_from_ascii, comp, Base, Seq, I, PAD};

use crate::params::{SeqDir, SeqFormat};
use crate::{CTR, L};

/// A contiguous stretch of both strands, with positions and lengths in
/// symbols.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Section {
    pub apos: I,
    pub alen: I,
    pub bpos: I,
    pub blen: I,
}

/// What one fill call works on: the body section to consume, the tail
/// section the window may read ahead into, and the p-limit for this call.
#[derive(Clone, Copy, Debug)]
pub struct SectionPair {
    pub body: Section,
    pub tail: Section,
    pub limp: I,
}

pub fn build_section(apos: I, alen: I, bpos: I, blen: I) -> Section {
    Section {
        apos,
        alen,
        bpos,
        blen,
    }
}

pub fn build_section_pair(body: Section, tail: Section, limp: I) -> SectionPair {
    SectionPair { body, tail, limp }
}

/// The two strands under alignment. Lengths are in symbols, which for the
/// packed formats is more than the byte length of the slice.
#[derive(Clone, Copy, Debug)]
pub struct SeqPair<'a> {
    pub a: Seq<'a>,
    pub alen: I,
    pub b: Seq<'a>,
    pub blen: I,
}

pub fn build_seq_pair<'a>(a: Seq<'a>, alen: I, b: Seq<'a>, blen: I) -> SeqPair<'a> {
    SeqPair { a, alen, b, blen }
}

/// Symbol loader: `(bytes, symbol_len, index) -> 2-bit code or PAD`.
pub type LoadFn = fn(Seq, I, i64) -> Base;

#[inline(always)]
fn decode(fmt: SeqFormat, seq: Seq, r: usize) -> Base {
    match fmt {
        SeqFormat::Ascii => seq.get(r).map_or(PAD, |&c| base_from_ascii(c)),
        SeqFormat::TwoBit => seq.get(r).map_or(PAD, |&c| if c < 4 { c } else { PAD }),
        SeqFormat::FourBit => seq.get(r).map_or(PAD, |&c| base_from_4bit(c)),
        SeqFormat::TwoBitPacked => seq
            .get(r / 4)
            .map_or(PAD, |&c| (c >> (2 * (r % 4))) & 0x3),
        SeqFormat::FourBitPacked => seq
            .get(r / 2)
            .map_or(PAD, |&c| base_from_4bit((c >> (4 * (r % 2))) & 0xf)),
    }
}

fn load_fw<const FMT: u8>(seq: Seq, len: I, idx: i64) -> Base {
    if idx < 0 || idx >= len as i64 {
        return PAD;
    }
    decode(FMT_TABLE[FMT as usize], seq, idx as usize)
}

/// Forward-reverse loader: positions in `[len, 2*len)` read the
/// reverse-complement strand.
fn load_fr<const FMT: u8>(seq: Seq, len: I, idx: i64) -> Base {
    let len = len as i64;
    if idx < 0 || idx >= 2 * len {
        return PAD;
    }
    if idx < len {
        decode(FMT_TABLE[FMT as usize], seq, idx as usize)
    } else {
        comp(decode(FMT_TABLE[FMT as usize], seq, (2 * len - 1 - idx) as usize))
    }
}

const FMT_TABLE: [SeqFormat; 5] = [
    SeqFormat::Ascii,
    SeqFormat::TwoBit,
    SeqFormat::FourBit,
    SeqFormat::TwoBitPacked,
    SeqFormat::FourBitPacked,
];

/// The (direction, format) dispatch table.
pub fn load_fn(dir: SeqDir, fmt: SeqFormat) -> LoadFn {
    let fmt = fmt as usize;
    const FW: [LoadFn; 5] = [
        load_fw::<0>,
        load_fw::<1>,
        load_fw::<2>,
        load_fw::<3>,
        load_fw::<4>,
    ];
    const FR: [LoadFn; 5] = [
        load_fr::<0>,
        load_fr::<1>,
        load_fr::<2>,
        load_fr::<3>,
        load_fr::<4>,
    ];
    match dir {
        SeqDir::FwOnly => FW[fmt],
        SeqDir::FwRv => FR[fmt],
    }
}

/// Per-fill consumption state over a section pair.
#[derive(Clone, Copy, Debug)]
pub struct Reader {
    pub sec: SectionPair,
    /// A symbols consumed from the body (RIGHT steps taken).
    pub acnt: I,
    /// B symbols consumed from the body (DOWN steps taken).
    pub bcnt: I,
}

impl Reader {
    pub fn new(sec: SectionPair) -> Self {
        Reader {
            sec,
            acnt: 0,
            bcnt: 0,
        }
    }

    /// Map a fill-local A index through body, then tail, then padding.
    #[inline(always)]
    pub fn sym_a(&self, sp: &SeqPair, load: LoadFn, k: I) -> Base {
        let body = self.sec.body;
        let tail = self.sec.tail;
        if k < 0 {
            PAD
        } else if k < body.alen {
            load(sp.a, sp.alen, (body.apos + k) as i64)
        } else if k - body.alen < tail.alen {
            load(sp.a, sp.alen, (tail.apos + k - body.alen) as i64)
        } else {
            PAD
        }
    }

    #[inline(always)]
    pub fn sym_b(&self, sp: &SeqPair, load: LoadFn, k: I) -> Base {
        let body = self.sec.body;
        let tail = self.sec.tail;
        if k < 0 {
            PAD
        } else if k < body.blen {
            load(sp.b, sp.blen, (body.bpos + k) as i64)
        } else if k - body.blen < tail.blen {
            load(sp.b, sp.blen, (tail.bpos + k - body.blen) as i64)
        } else {
            PAD
        }
    }

    /// Lane-0 of the A window runs half a band ahead of the consumed count.
    #[inline(always)]
    pub fn a_ahead(&self) -> I {
        self.acnt + CTR as I
    }

    /// Lane-31 of the B window likewise.
    #[inline(always)]
    pub fn b_ahead(&self) -> I {
        self.bcnt + CTR as I - 1
    }

    /// True while a whole block of lookahead on both sides stays inside the
    /// body section, so the staging can skip the section-boundary checks.
    pub fn bulk_ok(&self) -> bool {
        self.a_ahead() + (L as I) <= self.sec.body.alen
            && self.b_ahead() + (L as I) <= self.sec.body.blen
    }

    /// Fast path: stage a block of fresh symbols straight from the body.
    pub fn bulk_fetch(&self, sp: &SeqPair, la: LoadFn, lb: LoadFn, fa: &mut [Base; L], fb: &mut [Base; L]) {
        debug_assert!(self.bulk_ok());
        let abase = (self.sec.body.apos + self.a_ahead()) as i64;
        let bbase = (self.sec.body.bpos + self.b_ahead()) as i64;
        for (i, (fa, fb)) in izip!(fa.iter_mut(), fb.iter_mut()).enumerate() {
            *fa = la(sp.a, sp.alen, abase + i as i64);
            *fb = lb(sp.b, sp.blen, bbase + i as i64);
        }
    }

    /// Slow path: stage a block of fresh symbols across the body/tail
    /// boundary, padding past the end.
    pub fn cap_fetch(&self, sp: &SeqPair, la: LoadFn, lb: LoadFn, fa: &mut [Base; L], fb: &mut [Base; L]) {
        for (i, (fa, fb)) in izip!(fa.iter_mut(), fb.iter_mut()).enumerate() {
            *fa = self.sym_a(sp, la, self.a_ahead() + i as I);
            *fb = self.sym_b(sp, lb, self.b_ahead() + i as I);
        }
    }

    /// Remaining body symbols on each side.
    pub fn a_rem(&self) -> I {
        self.sec.body.alen - self.acnt
    }

    pub fn b_rem(&self) -> I {
        self.sec.body.blen - self.bcnt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_forward() {
        let load = load_fn(SeqDir::FwOnly, SeqFormat::Ascii);
        let s = b"ACGT";
        assert_eq!(load(s, 4, 0), 0);
        assert_eq!(load(s, 4, 3), 3);
        assert_eq!(load(s, 4, 4), PAD);
        assert_eq!(load(s, 4, -1), PAD);
    }

    #[test]
    fn ascii_forward_reverse() {
        let load = load_fn(SeqDir::FwRv, SeqFormat::Ascii);
        let s = b"ACGT";
        // positions past the end mirror onto the reverse-complement:
        // index 4 reads comp(T) = A.
        assert_eq!(load(s, 4, 4), 0);
        assert_eq!(load(s, 4, 7), comp(0));
        assert_eq!(load(s, 4, 8), PAD);
    }

    #[test]
    fn packed_formats() {
        let load2 = load_fn(SeqDir::FwOnly, SeqFormat::TwoBitPacked);
        // ACGT packed LSB-first: 0b11_10_01_00
        let s = [0b11100100u8];
        for (i, want) in [0, 1, 2, 3].into_iter().enumerate() {
            assert_eq!(load2(&s, 4, i as i64), want);
        }
        let load4 = load_fn(SeqDir::FwOnly, SeqFormat::FourBitPacked);
        // A in the low nibble, T in the high
        let s = [0x81u8];
        assert_eq!(load4(&s, 2, 0), 0);
        assert_eq!(load4(&s, 2, 1), 3);
    }

    #[test]
    fn section_straddle() {
        let load = load_fn(SeqDir::FwOnly, SeqFormat::Ascii);
        let sp = build_seq_pair(b"AACCGGTT", 8, b"ACGTACGT", 8);
        let sec = build_section_pair(build_section(0, 4, 0, 4), build_section(4, 4, 4, 4), 100);
        let rd = Reader::new(sec);
        // k=3 in the body, k=4 rolls into the tail section
        assert_eq!(rd.sym_a(&sp, load, 3), 1);
        assert_eq!(rd.sym_a(&sp, load, 4), 2);
        assert_eq!(rd.sym_a(&sp, load, 8), PAD);
        assert_eq!(rd.sym_b(&sp, load, 7), 3);
    }

    #[test]
    fn bulk_gate() {
        let sec = build_section_pair(build_section(0, 100, 0, 100), Section::default(), 1000);
        let mut rd = Reader::new(sec);
        assert!(rd.bulk_ok());
        rd.acnt = 100 - (CTR + L) as I;
        assert!(rd.bulk_ok());
        rd.acnt += 1;
        assert!(!rd.bulk_ok());
    }
}
