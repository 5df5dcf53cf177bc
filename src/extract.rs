//! Record Extractor: ConSTRain VCF to CSV conversion
//!
//! Decodes each variant's annotation bundle into a typed row, derives the
//! normalised depth column and writes the table as CSV. A malformed or
//! absent annotation sub-field is recorded as missing for that field only;
//! it never aborts the row or the run.

use crate::{normalised_depth, utils, vcf, StrQcError, StrQcResult, StrRow};
use flate2::write::GzEncoder;
use flate2::Compression;
use rust_htslib::bcf;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of the output CSV.
pub const CSV_HEADER: [&str; 6] = [
    "str_id",
    "copy_number",
    "frequencies",
    "genotype",
    "depth",
    "depth_norm",
];

/// Decode one VCF record into a [`StrRow`]. The derived `depth_norm` column
/// is left unset; it is appended by the table assembly pass.
pub fn decode_record(record: &bcf::Record) -> StrQcResult<StrRow> {
    let str_id = vcf::locus_id(record)?;
    let copy_number = vcf::format_int(record, "CN");
    let depth = vcf::format_int(record, "DP");
    let frequencies = vcf::format_str(record, "FREQS").and_then(|raw| parse_frequencies(&raw));
    let genotype = vcf::format_str(record, "REPLEN").and_then(|raw| parse_genotype(&raw));

    Ok(StrRow {
        str_id,
        copy_number,
        frequencies,
        genotype,
        depth,
        depth_norm: None,
    })
}

/// Read all records of a single-sample VCF into rows, one per variant in
/// stream order, then derive the `depth_norm` column.
pub fn rows_from_vcf<P: AsRef<Path>>(path: P) -> StrQcResult<Vec<StrRow>> {
    let mut scanner = vcf::VcfScanner::open(path)?;

    let mut rows = Vec::new();
    for record in scanner.records() {
        let record = record?;
        rows.push(decode_record(&record)?);
    }

    for row in &mut rows {
        row.depth_norm = normalised_depth(row.depth, row.copy_number);
    }

    Ok(rows)
}

/// Parse the `FREQS` annotation, pipe-separated `allele_length,count` pairs
/// such as `"10,3|11,7"`. Any malformed pair discards the whole spectrum;
/// partial spectra are not retained.
pub fn parse_frequencies(raw: &str) -> Option<BTreeMap<i64, i64>> {
    let mut frequencies = BTreeMap::new();
    for pair in raw.split('|') {
        let (allele_len, count) = pair.split_once(',')?;
        frequencies.insert(allele_len.parse().ok()?, count.parse().ok()?);
    }

    if frequencies.is_empty() {
        None
    } else {
        Some(frequencies)
    }
}

/// Parse the `REPLEN` annotation, a comma-separated list of allele lengths.
/// The literal `"."` means the genotype was not resolved.
pub fn parse_genotype(raw: &str) -> Option<Vec<i64>> {
    if raw == "." {
        return None;
    }
    raw.split(',').map(|value| value.parse().ok()).collect()
}

/// Serialize a frequency spectrum as `{10: 3, 11: 7}`.
pub fn format_frequencies(frequencies: &BTreeMap<i64, i64>) -> String {
    let inner = frequencies
        .iter()
        .map(|(allele_len, count)| format!("{}: {}", allele_len, count))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", inner)
}

/// Serialize a genotype as `[12, 13]`.
pub fn format_genotype(genotype: &[i64]) -> String {
    let inner = genotype
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

/// Write rows as CSV with a header line. Missing fields become empty cells.
/// Output paths ending in `.gz` are gzip-compressed.
pub fn write_csv<P: AsRef<Path>>(rows: &[StrRow], path: P) -> StrQcResult<()> {
    utils::ensure_parent_dirs(&path)?;
    let file = File::create(&path)?;

    let writer: Box<dyn Write> = if utils::get_extension(&path).as_deref() == Some("gz") {
        Box::new(GzEncoder::new(file, Compression::default()))
    } else {
        Box::new(file)
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for row in rows {
        csv_writer.write_record([
            row.str_id.clone(),
            row.copy_number.map(|v| v.to_string()).unwrap_or_default(),
            row.frequencies
                .as_ref()
                .map(format_frequencies)
                .unwrap_or_default(),
            row.genotype
                .as_ref()
                .map(|gt| format_genotype(gt))
                .unwrap_or_default(),
            row.depth.map(|v| v.to_string()).unwrap_or_default(),
            row.depth_norm.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Convert one VCF file to one CSV file.
pub fn run_file<P: AsRef<Path>, Q: AsRef<Path>>(vcf_path: P, csv_path: Q) -> StrQcResult<()> {
    log::info!(
        "Writing variants from {:?} to {:?}",
        vcf_path.as_ref(),
        csv_path.as_ref()
    );

    let rows = rows_from_vcf(&vcf_path)?;
    log::info!("Read {} variants from VCF file", rows.len());
    write_csv(&rows, &csv_path)?;

    Ok(())
}

fn is_vcf_path(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    path.is_file() && (name.ends_with(".vcf") || name.ends_with(".vcf.gz"))
}

fn vcf_basename(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    // Strip each suffix once: "sample.vcf.vcf" keeps its inner ".vcf"
    let stem = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = stem.strip_suffix(".vcf").unwrap_or(stem);
    stem.to_string()
}

fn collect_vcfs(dir: &Path, recursive: bool, buffer: &mut Vec<PathBuf>) -> StrQcResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_vcfs(&path, recursive, buffer)?;
            }
        } else if is_vcf_path(&path) {
            buffer.push(path);
        }
    }
    Ok(())
}

/// Find all `.vcf` / `.vcf.gz` files under `dir`, sorted for deterministic
/// output ordering.
pub fn vcf_paths_from_dir<P: AsRef<Path>>(dir: P, recursive: bool) -> StrQcResult<Vec<PathBuf>> {
    if !dir.as_ref().is_dir() {
        return Err(StrQcError::InvalidConfig(format!(
            "'{}' is not a directory",
            dir.as_ref().display()
        )));
    }

    let mut paths = Vec::new();
    collect_vcfs(dir.as_ref(), recursive, &mut paths)?;
    paths.sort();
    Ok(paths)
}

/// Map VCF input paths to `<outdir>/<basename>.csv` output paths, failing if
/// two inputs would produce the same output file.
pub fn csv_output_paths<P: AsRef<Path>>(
    vcf_paths: &[PathBuf],
    outdir: P,
) -> StrQcResult<Vec<PathBuf>> {
    if !outdir.as_ref().is_dir() {
        return Err(StrQcError::InvalidConfig(format!(
            "cannot use '{}' as output directory, not a directory",
            outdir.as_ref().display()
        )));
    }

    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    let mut csv_paths = Vec::with_capacity(vcf_paths.len());

    for path in vcf_paths {
        let basename = vcf_basename(path);
        if let Some(other) = seen.insert(basename.clone(), path) {
            return Err(StrQcError::InvalidConfig(format!(
                "VCF files '{}' and '{}' would both make CSV file {}.csv",
                other.display(),
                path.display(),
                basename
            )));
        }
        csv_paths.push(outdir.as_ref().join(format!("{}.csv", basename)));
    }

    Ok(csv_paths)
}
