//! # strqc - STR genotyping QC utilities
//!
//! Post-processing tools for VCF files produced by the ConSTRain short tandem
//! repeat (STR) caller: extraction of per-locus genotyping results into CSV
//! tables, and summaries of the normalised depth of coverage distribution
//! used to pick quality-filtering thresholds.

pub mod depth;
pub mod extract;
pub mod plot;
pub mod utils;
pub mod vcf;

use std::collections::BTreeMap;

use serde::Serialize;

/// One decoded STR locus from a ConSTRain VCF record.
///
/// Every annotation sub-field degrades independently to `None` when it is
/// absent or malformed in the VCF; a bad field never poisons the rest of the
/// row.
#[derive(Debug, Clone, PartialEq)]
pub struct StrRow {
    /// `"{chrom}_{start}"` with a 0-based start position.
    pub str_id: String,
    /// Number of alleles that exist for this locus in the genome.
    pub copy_number: Option<i64>,
    /// Observed read count per allele length.
    pub frequencies: Option<BTreeMap<i64, i64>>,
    /// Allele lengths of the inferred genotype.
    pub genotype: Option<Vec<i64>>,
    /// Number of reads mapped to the locus.
    pub depth: Option<i64>,
    /// `depth / copy_number`, set by the derived-column pass.
    pub depth_norm: Option<f64>,
}

/// One locus decoded for the depth-distribution summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRow {
    /// Repeat unit length (INFO `PERIOD`).
    pub period: Option<i64>,
    pub copy_number: Option<i64>,
    pub depth: Option<i64>,
    pub depth_norm: Option<f64>,
}

/// A [`DepthRow`] with all missing values dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthObs {
    pub period: i64,
    pub depth_norm: f64,
}

/// Quantile bounds fitted on the normalised depth distribution.
#[derive(Debug, Clone, Serialize)]
pub struct DepthBounds {
    pub lower: f64,
    pub upper: f64,
    /// Loci of the full cleaned population with `lower <= depth_norm <= upper`.
    pub n_within: usize,
    /// Size of the full cleaned population.
    #[serde(rename = "n")]
    pub n_total: usize,
}

impl DepthBounds {
    /// Percentage of loci within the bounds, 0 when the population is empty.
    pub fn percent_within(&self) -> f64 {
        if self.n_total == 0 {
            0.0
        } else {
            self.n_within as f64 / self.n_total as f64 * 100.0
        }
    }
}

/// Normalised depth of coverage: reads mapped to the locus divided by the
/// number of alleles. Missing when either input is missing or the copy
/// number is zero (a locus with zero alleles cannot be normalised).
pub fn normalised_depth(depth: Option<i64>, copy_number: Option<i64>) -> Option<f64> {
    match (depth, copy_number) {
        (Some(dp), Some(cn)) if cn > 0 => Some(dp as f64 / cn as f64),
        _ => None,
    }
}

/// Error types for the strqc library
#[derive(Debug, thiserror::Error)]
pub enum StrQcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plotting error: {0}")]
    Plot(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid variant record: {0}")]
    InvalidVariant(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("expected exactly one sample in VCF, found {0}")]
    MultiSample(usize),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("alpha must be in the open interval (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("no loci available to fit depth bounds")]
    EmptyPopulation,
}

pub type StrQcResult<T> = Result<T, StrQcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalised_depth() {
        assert_eq!(normalised_depth(Some(30), Some(2)), Some(15.0));
        assert_eq!(normalised_depth(Some(25), Some(2)), Some(12.5));
        assert_eq!(normalised_depth(None, Some(2)), None);
        assert_eq!(normalised_depth(Some(30), None), None);
        assert_eq!(normalised_depth(None, None), None);
    }

    #[test]
    fn test_normalised_depth_zero_copy_number() {
        // Division by a zero copy number is treated as missing, not infinity
        assert_eq!(normalised_depth(Some(30), Some(0)), None);
    }

    #[test]
    fn test_percent_within() {
        let bounds = DepthBounds {
            lower: 1.0,
            upper: 40.0,
            n_within: 3,
            n_total: 4,
        };
        assert_eq!(bounds.percent_within(), 75.0);

        let empty = DepthBounds {
            lower: 1.0,
            upper: 40.0,
            n_within: 0,
            n_total: 0,
        };
        assert_eq!(empty.percent_within(), 0.0);
    }
}
