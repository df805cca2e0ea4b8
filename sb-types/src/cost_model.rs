//! The affine cost model used by the banded fill engine.

use serde::{Deserialize, Serialize};

use crate::Score;

/// A full scoring schema: a 4x4 substitution matrix plus affine gap costs for
/// each strand. Gap costs are stored as positive penalties; a gap of length k
/// on the A strand costs `gi_a + k * ge_a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Substitution scores, `sub[a][b]` for 2-bit codes a, b. Matches are
    /// positive, mismatches usually negative.
    pub sub: [[i8; 4]; 4],
    /// Gap-open penalty when consuming A (horizontal gap).
    pub gi_a: Score,
    /// Gap-extend penalty when consuming A.
    pub ge_a: Score,
    /// Gap-open penalty when consuming B (vertical gap).
    pub gi_b: Score,
    /// Gap-extend penalty when consuming B.
    pub ge_b: Score,
}

impl CostModel {
    /// The simple schema: match reward `m`, mismatch penalty `x`, symmetric
    /// gap open `gi` and extend `ge`.
    pub const fn simple(m: i8, x: i8, gi: Score, ge: Score) -> Self {
        let mut sub = [[-x; 4]; 4];
        let mut i = 0;
        while i < 4 {
            sub[i][i] = m;
            i += 1;
        }
        CostModel {
            sub,
            gi_a: gi,
            ge_a: ge,
            gi_b: gi,
            ge_b: ge,
        }
    }

    /// Asymmetric gaps with the simple substitution schema.
    pub const fn asymmetric(m: i8, x: i8, gi_a: Score, ge_a: Score, gi_b: Score, ge_b: Score) -> Self {
        let mut c = Self::simple(m, x, gi_a, ge_a);
        c.gi_b = gi_b;
        c.ge_b = ge_b;
        c
    }

    /// Largest entry of the substitution matrix (the best per-column gain).
    pub fn max_sub(&self) -> i8 {
        let mut max = i8::MIN;
        for row in &self.sub {
            for &v in row {
                if v > max {
                    max = v;
                }
            }
        }
        max
    }

    /// Smallest entry of the substitution matrix.
    pub fn min_sub(&self) -> i8 {
        let mut min = i8::MAX;
        for row in &self.sub {
            for &v in row {
                if v < min {
                    min = v;
                }
            }
        }
        min
    }

    /// A schema is usable when the best substitution is a gain, penalties are
    /// non-negative, and every derived 8-bit constant fits a signed byte.
    pub fn is_valid(&self) -> bool {
        self.max_sub() > 0
            && self.gi_a >= 0
            && self.ge_a > 0
            && self.gi_b >= 0
            && self.ge_b > 0
            && (self.max_sub() as Score + 2 * self.ge_a.max(self.ge_b)) <= 96
            && self.gi_a.max(self.gi_b) + self.ge_a.max(self.ge_b) <= 96
    }

    /// Multiply every score by `k`. Panics on overflow of the 8-bit matrix.
    pub fn scaled(&self, k: Score) -> Self {
        let mut c = *self;
        for row in &mut c.sub {
            for v in row.iter_mut() {
                *v = (*v as Score * k).try_into().expect("scaled matrix overflows i8");
            }
        }
        c.gi_a *= k;
        c.ge_a *= k;
        c.gi_b *= k;
        c.ge_b *= k;
        c
    }
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::simple(1, 1, 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_schema() {
        let c = CostModel::simple(2, 3, 5, 1);
        assert_eq!(c.sub[0][0], 2);
        assert_eq!(c.sub[0][1], -3);
        assert_eq!(c.max_sub(), 2);
        assert_eq!(c.min_sub(), -3);
        assert!(c.is_valid());
    }

    #[test]
    fn scaling() {
        let c = CostModel::simple(1, 1, 1, 1).scaled(3);
        assert_eq!(c, CostModel::simple(3, 3, 3, 3));
    }

    #[test]
    fn invalid_schemas() {
        assert!(!CostModel::simple(-1, 1, 1, 1).is_valid());
        assert!(!CostModel::simple(1, 1, 1, 0).is_valid());
        assert!(!CostModel::simple(120, 1, 1, 60).is_valid());
    }
}
