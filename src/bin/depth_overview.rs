//! CLI binary for summarizing the normalised depth distribution

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use strqc_rs::{
    depth::{depth_rows_from_vcf, drop_missing, fit_depth_bounds, validate_alpha, write_bounds_json},
    plot::{render_histogram, OutputKind},
    utils::{validate_file_readable, Timer},
    StrQcError, StrQcResult,
};

#[derive(Parser)]
#[command(name = "depth_overview")]
#[command(about = "Overview of normalised depth of coverage values from ConSTRain VCF output")]
#[command(long_about = "
Generate an overview of normalised depth of coverage values from ConSTRain
VCF output. Normalised depth of coverage is determined by dividing the number
of reads mapping to a repeat locus by the copy number (i.e., the number of
alleles that exists for this locus in the genome). This information is useful
to rerun ConSTRain with new --min-norm-depth and --max-norm-depth values
based on the observed depth distribution, filtering out outlier loci.

If the output file extension is .json, a JSON file with the bounds is
written. Otherwise (.png, .jpg, .jpeg, .bmp, .svg) a histogram of the
distribution is rendered with the bounds drawn in.
")]
struct Args {
    /// VCF file output by ConSTRain for which to generate the depth overview
    #[arg(short, long, value_name = "FILE")]
    vcf: PathBuf,

    /// Output file; the output kind is selected from the file extension
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Significance level for the bounds: lower bound at quantile alpha/2,
    /// upper bound at quantile 1 - alpha/2. The lower bound is floored at 1,
    /// as a genotype cannot be estimated from fewer reads than alleles
    #[arg(short, long)]
    alpha: f64,

    /// Include mononucleotide repeats when determining the bounds. They are
    /// always part of the final overview either way, they just do not count
    /// towards the bounds unless this flag is set
    #[arg(long)]
    include_mononuc: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn run() -> StrQcResult<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    // Configuration failures surface before any VCF record is read
    let output_kind = OutputKind::from_path(&args.output)?;
    validate_alpha(args.alpha)?;
    validate_file_readable(&args.vcf)?;

    log::info!("Parsing VCF file {:?}", args.vcf);
    let rows = {
        let _timer = Timer::new("Reading VCF");
        depth_rows_from_vcf(&args.vcf)?
    };

    let observations = drop_missing(&rows);
    log::info!(
        "Kept {} of {} loci after dropping missing values",
        observations.len(),
        rows.len()
    );

    let bounds = fit_depth_bounds(&observations, args.alpha, args.include_mononuc)?;
    log::info!(
        "Bounds: [{}, {}], {}/{} loci in range ({:.2}%)",
        bounds.lower,
        bounds.upper,
        bounds.n_within,
        bounds.n_total,
        bounds.percent_within()
    );

    match output_kind {
        OutputKind::Bounds => {
            log::info!("Writing bounds to {:?}", args.output);
            write_bounds_json(&bounds, &args.output)?;
        }
        OutputKind::Image(format) => {
            log::info!("Rendering histogram to {:?}", args.output);
            let _timer = Timer::new("Rendering histogram");
            render_histogram(&observations, &bounds, &args.output, format)?;
        }
    }

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: StrQcError) -> ! {
    match error {
        StrQcError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        StrQcError::MultiSample(n) => {
            eprintln!("Error: VCF file contains {} samples.", n);
            eprintln!("Only VCF files with exactly one sample are supported.");
        }
        StrQcError::UnsupportedFormat(ext) => {
            eprintln!("Error: Unsupported output format: {}", ext);
            eprintln!("Use .json for a bounds record, or .png/.jpg/.jpeg/.bmp/.svg for a plot.");
        }
        StrQcError::InvalidAlpha(alpha) => {
            eprintln!("Error: alpha must be in the open interval (0, 1), got {}", alpha);
        }
        StrQcError::EmptyPopulation => {
            eprintln!("Error: No loci available to fit depth bounds.");
            eprintln!("The VCF may be empty, fully filtered, or contain only mononucleotide");
            eprintln!("repeats while --include-mononuc is not set.");
        }
        StrQcError::Htslib(ref e) => {
            eprintln!("Error: VCF processing error: {}", e);
            eprintln!("Please check that your VCF file is properly formatted.");
        }
        StrQcError::Plot(ref msg) => {
            eprintln!("Error: Plotting error: {}", msg);
        }
        StrQcError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
