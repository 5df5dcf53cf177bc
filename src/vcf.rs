//! VCF access layer for ConSTRain output files
//!
//! Thin wrapper around the htslib VCF/BCF reader plus per-record accessors
//! for the annotation fields written by ConSTRain. The accessors degrade to
//! `None` when a field is structurally absent or malformed; downstream
//! decoders decide what to do with missing values.

use crate::{StrQcError, StrQcResult};
use rust_htslib::bcf::{self, Read};
use std::path::Path;
use std::str;

/// Per-sample filter tags marking loci the caller already deemed
/// uninformative for depth statistics.
pub const SKIP_TAGS: [&str; 3] = ["CNMISSING", "CNZERO", "DPZERO"];

/// A VCF/BCF stream restricted to single-sample files.
pub struct VcfScanner {
    reader: bcf::Reader,
}

impl VcfScanner {
    /// Open a VCF/BCF file. Fails upfront if the file does not contain
    /// exactly one sample; no record is ever yielded from such a file.
    pub fn open<P: AsRef<Path>>(path: P) -> StrQcResult<Self> {
        crate::utils::validate_file_readable(&path)?;
        let reader = bcf::Reader::from_path(&path)?;

        let n_samples = reader.header().sample_count() as usize;
        if n_samples != 1 {
            return Err(StrQcError::MultiSample(n_samples));
        }

        Ok(VcfScanner { reader })
    }

    /// Iterate over the records of the stream in file order.
    pub fn records(&mut self) -> bcf::Records<'_, bcf::Reader> {
        self.reader.records()
    }
}

/// Read an integer FORMAT field for the first (only) sample.
///
/// Returns `None` when the tag is absent for this record or the value is an
/// htslib missing sentinel (negative).
pub fn format_int(record: &bcf::Record, tag: &str) -> Option<i64> {
    let values = record.format(tag.as_bytes()).integer().ok()?;
    let value = values[0][0];
    if value < 0 {
        None
    } else {
        Some(i64::from(value))
    }
}

/// Read a string FORMAT field for the first (only) sample.
pub fn format_str(record: &bcf::Record, tag: &str) -> Option<String> {
    let values = record.format(tag.as_bytes()).string().ok()?;
    let value = str::from_utf8(values[0]).ok()?;
    Some(value.to_string())
}

/// Read an integer INFO field. `None` when absent or negative.
pub fn info_int(record: &bcf::Record, tag: &str) -> Option<i64> {
    let values = record.info(tag.as_bytes()).integer().ok()??;
    let value = values[0];
    if value < 0 {
        None
    } else {
        Some(i64::from(value))
    }
}

/// Locus identifier `"{chrom}_{start}"` with a 0-based start position.
///
/// htslib already stores positions 0-based, so no coordinate shift is needed
/// relative to the 1-based POS column of the VCF text.
pub fn locus_id(record: &bcf::Record) -> StrQcResult<String> {
    let rid = record
        .rid()
        .ok_or_else(|| StrQcError::InvalidVariant("record has no contig".to_string()))?;
    let chrom = record.header().rid2name(rid)?;
    let chrom = str::from_utf8(chrom)
        .map_err(|_| StrQcError::InvalidVariant("contig name is not valid UTF-8".to_string()))?;

    Ok(format!("{}_{}", chrom, record.pos()))
}

/// Whether the caller flagged this record with one of the [`SKIP_TAGS`].
/// Records without an `FT` field are not skipped.
pub fn is_skipped(record: &bcf::Record) -> bool {
    match format_str(record, "FT") {
        Some(ft) => SKIP_TAGS.contains(&ft.as_str()),
        None => false,
    }
}
