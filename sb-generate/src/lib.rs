//! Random DNA input generation for tests and benchmarks.
//!
//! The mutator keeps the implied alignment path inside a diagonal band of
//! half-width `bw`, so banded aligners see the full signal.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ALPH: [u8; 4] = *b"ACGT";

pub fn rand_base(rng: &mut impl Rng) -> u8 {
    ALPH[rng.gen_range(0..4)]
}

/// A uniform random sequence of length `len`.
pub fn random_sequence(len: usize, rng: &mut impl Rng) -> Vec<u8> {
    (0..len).map(|_| rand_base(rng)).collect()
}

/// Mutate `seq` with per-position mismatch rate `x` and indel rate `d`,
/// keeping the alignment path within a band of half-width `bw`.
///
/// `wave` tracks the running diagonal offset of the implied path; insertions
/// and deletions are suppressed when they would push it outside the band.
pub fn mutate_sequence(seq: &[u8], x: f64, d: f64, bw: i64, rng: &mut impl Rng) -> Vec<u8> {
    fn next<R: Rng>(seq: &[u8], j: &mut usize, rng: &mut R) -> u8 {
        let c = if *j < seq.len() { seq[*j] } else { rand_base(rng) };
        *j += 1;
        c
    }
    let len = seq.len();
    let mut out = Vec::with_capacity(len);
    let mut j = 0usize;
    let mut wave = 0i64;
    for _ in 0..len {
        if rng.gen_bool(x) {
            // mismatch
            next(seq, &mut j, rng);
            out.push(rand_base(rng));
        } else if rng.gen_bool(d) {
            if rng.gen_bool(0.5) && wave > -bw + 1 {
                // deletion: skip one template base
                next(seq, &mut j, rng);
                let c = next(seq, &mut j, rng);
                out.push(c);
                wave -= 1;
            } else if wave < bw - 2 {
                // insertion
                out.push(rand_base(rng));
                wave += 1;
            } else {
                let c = next(seq, &mut j, rng);
                out.push(c);
            }
        } else {
            let c = next(seq, &mut j, rng);
            out.push(c);
        }
    }
    out
}

/// A reproducible (template, mutated) pair.
pub fn seeded_pair(len: usize, x: f64, d: f64, bw: i64, seed: u64) -> (Vec<u8>, Vec<u8>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let a = random_sequence(len, &mut rng);
    let b = mutate_sequence(&a, x, d, bw, &mut rng);
    (a, b)
}

/// Reverse-complement of an ASCII DNA sequence.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&c| match c {
            b'A' | b'a' => b'T',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            b'T' | b't' => b'A',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let (a1, b1) = seeded_pair(500, 0.1, 0.1, 8, 42);
        let (a2, b2) = seeded_pair(500, 0.1, 0.1, 8, 42);
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
        assert_eq!(a1.len(), 500);
        assert_eq!(b1.len(), 500);
        assert!(a1.iter().all(|c| ALPH.contains(c)));
    }

    #[test]
    fn zero_rates_copy_the_template() {
        let (a, b) = seeded_pair(100, 0.0, 0.0, 8, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn revcomp_is_an_involution() {
        let (a, _) = seeded_pair(97, 0.0, 0.0, 8, 3);
        assert_eq!(revcomp(&revcomp(&a)), a);
    }

    #[test]
    fn mutations_stay_near_the_diagonal() {
        // With indels bounded by the wave counter, lengths match exactly.
        let (a, b) = seeded_pair(2000, 0.2, 0.2, 8, 13);
        assert_eq!(a.len(), b.len());
        let same = a.iter().zip(&b).filter(|(x, y)| x == y).count();
        assert!(same > a.len() / 2, "mutated pair lost the signal");
    }
}
