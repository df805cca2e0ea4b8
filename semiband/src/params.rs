//! Flat, untyped session parameters, usable from config files or a CLI.

use sb_types::CostModel;
use serde::{Deserialize, Serialize};

/// Input strand encodings accepted by the sequence reader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqFormat {
    /// One ASCII nucleotide per byte (`acgtACGT`).
    #[default]
    Ascii,
    /// One 2-bit code (0..4) per byte.
    TwoBit,
    /// One 4-bit one-hot code per byte.
    FourBit,
    /// Four 2-bit codes per byte, LSB first.
    TwoBitPacked,
    /// Two 4-bit one-hot codes per byte, low nibble first.
    FourBitPacked,
}

/// Whether a strand may be probed in reverse-complement.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqDir {
    #[default]
    FwOnly,
    /// Positions past the strand length mirror onto the reverse-complement.
    FwRv,
}

/// Output format of the external alignment writer. Carried in the config for
/// compatibility; the fill core never consumes it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlnFormat {
    #[default]
    Str,
    Cigar,
    Dir,
}

/// How the band decides its next step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandMode {
    /// Score-driven determiner (the accumulator over the edge lanes).
    #[default]
    Dynamic,
    /// Steps are read from a caller-supplied byte array.
    Guided,
}

/// Session parameters. All fields have defaults, so partial configs
/// deserialize cleanly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Params {
    pub seq_a_format: SeqFormat,
    pub seq_a_direction: SeqDir,
    pub seq_b_format: SeqFormat,
    pub seq_b_direction: SeqDir,
    pub aln_format: AlnFormat,
    pub band: BandMode,
    /// X-drop threshold; 0 selects the default of 100.
    pub xdrop: i16,
    pub score_matrix: CostModel,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            seq_a_format: SeqFormat::default(),
            seq_a_direction: SeqDir::default(),
            seq_b_format: SeqFormat::default(),
            seq_b_direction: SeqDir::default(),
            aln_format: AlnFormat::default(),
            band: BandMode::default(),
            xdrop: 0,
            score_matrix: CostModel::simple(1, 1, 1, 1),
        }
    }
}

impl Params {
    /// Apply the documented defaults for zero-valued options.
    pub(crate) fn restored(mut self) -> Self {
        if self.xdrop == 0 {
            self.xdrop = 100;
        }
        self
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.score_matrix.is_valid() && self.xdrop >= 0
    }
}
