//! Depth-distribution summary: quantile bounds on normalised depth
//!
//! Reads `{period, copy_number, depth}` per locus, skipping loci the caller
//! flagged as uninformative, and fits nearest-rank quantile bounds on the
//! normalised depth of coverage. The bounds are meant to be fed back to
//! ConSTRain as `--min-norm-depth` / `--max-norm-depth` to filter outlier
//! loci.

use crate::{
    normalised_depth, utils, vcf, DepthBounds, DepthObs, DepthRow, StrQcError, StrQcResult,
};
use std::fs::File;
use std::path::Path;

/// Read depth rows from a single-sample VCF, skipping records whose `FT`
/// flag is in [`vcf::SKIP_TAGS`]. Missing fields are kept as `None` here;
/// dropping them is a separate, later decision.
pub fn depth_rows_from_vcf<P: AsRef<Path>>(path: P) -> StrQcResult<Vec<DepthRow>> {
    let mut scanner = vcf::VcfScanner::open(path)?;

    let mut rows = Vec::new();
    for record in scanner.records() {
        let record = record?;
        if vcf::is_skipped(&record) {
            continue;
        }

        rows.push(DepthRow {
            period: vcf::info_int(&record, "PERIOD"),
            copy_number: vcf::format_int(&record, "CN"),
            depth: vcf::format_int(&record, "DP"),
            depth_norm: None,
        });
    }

    for row in &mut rows {
        row.depth_norm = normalised_depth(row.depth, row.copy_number);
    }

    Ok(rows)
}

/// Drop rows with any missing value, keeping only what the bound fit needs.
pub fn drop_missing(rows: &[DepthRow]) -> Vec<DepthObs> {
    rows.iter()
        .filter_map(|row| match (row.period, row.depth_norm) {
            (Some(period), Some(depth_norm)) => Some(DepthObs { period, depth_norm }),
            _ => None,
        })
        .collect()
}

/// Nearest-rank quantile: the returned value is always a member of `values`,
/// never an interpolation between two observations.
pub fn nearest_rank_quantile(values: &[f64], q: f64) -> StrQcResult<f64> {
    if values.is_empty() {
        return Err(StrQcError::EmptyPopulation);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    Ok(sorted[rank.min(sorted.len() - 1)])
}

/// `alpha` must lie strictly between 0 and 1.
pub fn validate_alpha(alpha: f64) -> StrQcResult<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(StrQcError::InvalidAlpha(alpha))
    }
}

/// Fit quantile bounds on the normalised depth distribution.
///
/// The lower bound sits at quantile `alpha/2`, the upper bound at
/// `1 - alpha/2`, both floored/taken from the fitting population: all rows
/// when `include_mononuc` is set, otherwise only loci with a repeat unit
/// longer than one base. The lower bound is never below 1.0, as a genotype
/// cannot be estimated from fewer reads than there are alleles.
///
/// `n_within` and `n_total` are always computed over the full population,
/// regardless of how the fitting population was restricted.
pub fn fit_depth_bounds(
    observations: &[DepthObs],
    alpha: f64,
    include_mononuc: bool,
) -> StrQcResult<DepthBounds> {
    validate_alpha(alpha)?;

    let fitting: Vec<f64> = observations
        .iter()
        .filter(|obs| include_mononuc || obs.period > 1)
        .map(|obs| obs.depth_norm)
        .collect();

    let lower = nearest_rank_quantile(&fitting, alpha / 2.0)?.max(1.0);
    let upper = nearest_rank_quantile(&fitting, 1.0 - alpha / 2.0)?;

    let n_within = observations
        .iter()
        .filter(|obs| obs.depth_norm >= lower && obs.depth_norm <= upper)
        .count();

    Ok(DepthBounds {
        lower,
        upper,
        n_within,
        n_total: observations.len(),
    })
}

/// Write the bounds as a pretty-printed JSON record
/// `{lower, upper, n_within, n}`.
pub fn write_bounds_json<P: AsRef<Path>>(bounds: &DepthBounds, path: P) -> StrQcResult<()> {
    utils::ensure_parent_dirs(&path)?;
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, bounds)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcf::test_util::write_test_vcf;

    fn obs(pairs: &[(i64, f64)]) -> Vec<DepthObs> {
        pairs
            .iter()
            .map(|&(period, depth_norm)| DepthObs { period, depth_norm })
            .collect()
    }

    #[test]
    fn test_nearest_rank_quantile() {
        let population = [1.0, 1.0, 2.0, 3.0, 3.0, 3.0, 4.0, 5.0, 100.0];

        let lower = nearest_rank_quantile(&population, 0.05).unwrap();
        let upper = nearest_rank_quantile(&population, 0.95).unwrap();

        // Bounds must be observed values, never interpolated ones
        assert!(population.contains(&lower));
        assert!(population.contains(&upper));
        assert_eq!(lower, 1.0);
        assert_eq!(upper, 100.0);

        assert_eq!(nearest_rank_quantile(&[7.5], 0.5).unwrap(), 7.5);
    }

    #[test]
    fn test_nearest_rank_quantile_empty() {
        assert!(matches!(
            nearest_rank_quantile(&[], 0.5),
            Err(StrQcError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_validate_alpha() {
        assert!(validate_alpha(0.05).is_ok());
        assert!(validate_alpha(0.999).is_ok());
        assert!(validate_alpha(0.0).is_err());
        assert!(validate_alpha(1.0).is_err());
        assert!(validate_alpha(-0.1).is_err());
        assert!(validate_alpha(f64::NAN).is_err());
    }

    #[test]
    fn test_fit_depth_bounds() {
        let observations = obs(&[
            (2, 1.0),
            (2, 1.0),
            (2, 2.0),
            (3, 3.0),
            (3, 3.0),
            (3, 3.0),
            (2, 4.0),
            (2, 5.0),
            (2, 100.0),
        ]);

        let bounds = fit_depth_bounds(&observations, 0.1, true).unwrap();
        assert_eq!(bounds.lower, 1.0);
        assert_eq!(bounds.upper, 100.0);
        assert_eq!(bounds.n_total, 9);
        assert_eq!(bounds.n_within, 9);
        assert!(bounds.n_within <= bounds.n_total);
    }

    #[test]
    fn test_lower_bound_floor() {
        // Even when every observation is below 1, the floor applies
        let observations = obs(&[(2, 0.2), (2, 0.3)]);
        let bounds = fit_depth_bounds(&observations, 0.1, true).unwrap();
        assert_eq!(bounds.lower, 1.0);
    }

    #[test]
    fn test_mononuc_restriction_changes_bounds_not_totals() {
        let observations = obs(&[
            (1, 0.5),
            (1, 0.6),
            (2, 10.0),
            (2, 11.0),
            (3, 12.0),
            (3, 13.0),
            (4, 14.0),
            (1, 200.0),
            (1, 300.0),
        ]);

        let restricted = fit_depth_bounds(&observations, 0.2, false).unwrap();
        let full = fit_depth_bounds(&observations, 0.2, true).unwrap();

        assert_eq!(restricted.lower, 10.0);
        assert_eq!(restricted.upper, 14.0);
        assert_ne!(restricted.lower, full.lower);
        assert_ne!(restricted.upper, full.upper);

        // n_total always covers the full cleaned population
        assert_eq!(restricted.n_total, 9);
        assert_eq!(full.n_total, 9);
        assert_eq!(restricted.n_within, 5);
    }

    #[test]
    fn test_fit_depth_bounds_empty_fitting_population() {
        // Only mononucleotide loci available, fitting restricted away
        let observations = obs(&[(1, 10.0), (1, 12.0)]);
        assert!(matches!(
            fit_depth_bounds(&observations, 0.1, false),
            Err(StrQcError::EmptyPopulation)
        ));

        assert!(matches!(
            fit_depth_bounds(&[], 0.1, true),
            Err(StrQcError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_fit_depth_bounds_invalid_alpha() {
        let observations = obs(&[(2, 10.0)]);
        assert!(matches!(
            fit_depth_bounds(&observations, 1.5, true),
            Err(StrQcError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn test_depth_rows_skip_flagged_records() {
        let vcf = write_test_vcf(
            &["sample1"],
            &[
                "chr1\t1001\t.\tATATAT\t.\t.\t.\tPERIOD=2\tFT:CN:DP\tPASS:2:30",
                "chr1\t2001\t.\tAAAA\t.\t.\t.\tPERIOD=1\tFT:CN:DP\tCNZERO:0:30",
                "chr1\t3001\t.\tAGAGAG\t.\t.\t.\tPERIOD=2\tFT:CN:DP\tDPZERO:2:0",
                "chr1\t4001\t.\tACACAC\t.\t.\t.\tPERIOD=2\tFT:CN:DP\tCNMISSING:.:25",
                "chr2\t1001\t.\tATATAT\t.\t.\t.\tPERIOD=2\tFT:CN:DP\tPASS:4:40",
            ],
        );

        let rows = depth_rows_from_vcf(vcf.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].depth_norm, Some(15.0));
        assert_eq!(rows[1].depth_norm, Some(10.0));

        let observations = drop_missing(&rows);
        assert_eq!(observations.len(), 2);
    }

    #[test]
    fn test_drop_missing() {
        let rows = vec![
            DepthRow {
                period: Some(2),
                copy_number: Some(2),
                depth: Some(30),
                depth_norm: Some(15.0),
            },
            DepthRow {
                period: None,
                copy_number: Some(2),
                depth: Some(30),
                depth_norm: Some(15.0),
            },
            DepthRow {
                period: Some(2),
                copy_number: None,
                depth: Some(30),
                depth_norm: None,
            },
        ];

        let observations = drop_missing(&rows);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].period, 2);
        assert_eq!(observations[0].depth_norm, 15.0);
    }

    #[test]
    fn test_write_bounds_json() {
        let bounds = DepthBounds {
            lower: 2.0,
            upper: 40.5,
            n_within: 90,
            n_total: 100,
        };

        let out = tempfile::NamedTempFile::new().unwrap();
        write_bounds_json(&bounds, out.path()).unwrap();

        let content = std::fs::read_to_string(out.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["lower"], 2.0);
        assert_eq!(parsed["upper"], 40.5);
        assert_eq!(parsed["n_within"], 90);
        assert_eq!(parsed["n"], 100);
    }
}
