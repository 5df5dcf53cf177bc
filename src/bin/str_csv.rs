//! CLI binary for extracting STR genotyping results from ConSTRain VCFs

use clap::Parser;
use env_logger::Env;
use rayon::prelude::*;
use std::path::PathBuf;
use strqc_rs::{
    extract::{csv_output_paths, run_file, vcf_paths_from_dir},
    utils::{validate_file_readable, Timer},
    StrQcError, StrQcResult,
};

#[derive(Parser)]
#[command(name = "str_csv")]
#[command(about = "Create CSV files from ConSTRain VCF output")]
#[command(long_about = "
Create a CSV file based on ConSTRain VCF output. The CSV file has six columns:

  str_id:       {chromosome}_{start position} (0-based)
  copy_number:  the number of alleles that exists for this locus in the genome
  frequencies:  mapping from allele length to the number of observed reads
  genotype:     the allele lengths of the inferred genotype
  depth:        the number of reads that mapped to this locus
  depth_norm:   depth divided by copy_number

Run either on a single file (--vcf and --output) or on every .vcf / .vcf.gz
file under a directory (--directory and --outdir), in which case files are
converted in parallel and each input <name>.vcf[.gz] produces <name>.csv.
")]
struct Args {
    /// VCF file output by ConSTRain from which to create a CSV file
    #[arg(short, long, value_name = "FILE", conflicts_with = "directory")]
    vcf: Option<PathBuf>,

    /// File path where the CSV file should be written
    #[arg(short, long, value_name = "FILE", requires = "vcf")]
    output: Option<PathBuf>,

    /// Directory to search for VCF files to convert
    #[arg(short, long, value_name = "DIR", requires = "outdir")]
    directory: Option<PathBuf>,

    /// Directory where output CSV files should be written
    #[arg(long, value_name = "DIR", requires = "directory")]
    outdir: Option<PathBuf>,

    /// Search for VCF files recursively under --directory
    #[arg(short, long)]
    recursive: bool,

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

    match (&args.vcf, &args.directory) {
        (Some(vcf), None) => {
            let output = args.output.as_ref().ok_or_else(|| {
                StrQcError::InvalidConfig("--output is required with --vcf".to_string())
            })?;

            validate_file_readable(vcf)?;
            let _timer = Timer::new("Converting VCF to CSV");
            run_file(vcf, output)?;
            log::info!("CSV written to {:?}", output);
        }
        (None, Some(directory)) => {
            let outdir = args.outdir.as_ref().ok_or_else(|| {
                StrQcError::InvalidConfig("--outdir is required with --directory".to_string())
            })?;

            let vcf_paths = vcf_paths_from_dir(directory, args.recursive)?;
            if vcf_paths.is_empty() {
                return Err(StrQcError::InvalidConfig(format!(
                    "no VCF files found under --directory '{}'",
                    directory.display()
                )));
            }
            let csv_paths = csv_output_paths(&vcf_paths, outdir)?;

            let _timer = Timer::new("Converting VCF files to CSV");
            log::info!("Converting {} VCF files", vcf_paths.len());

            vcf_paths
                .par_iter()
                .zip(csv_paths.par_iter())
                .try_for_each(|(vcf_path, csv_path)| run_file(vcf_path, csv_path))?;

            log::info!("CSV files written to {:?}", outdir);
        }
        _ => {
            return Err(StrQcError::InvalidConfig(
                "use either --vcf with --output, or --directory with --outdir".to_string(),
            ));
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
        StrQcError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid arguments: {}", msg);
        }
        StrQcError::Htslib(ref e) => {
            eprintln!("Error: VCF processing error: {}", e);
            eprintln!("Please check that your VCF file is properly formatted.");
        }
        StrQcError::Csv(ref e) => {
            eprintln!("Error: CSV processing error: {}", e);
            eprintln!("Please check the output file path and permissions.");
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
