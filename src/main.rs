fn main() {
    println!("strqc-rs - ConSTRain post-processing utilities");
    println!();
    println!("Available tools:");
    println!("  str_csv        - Extract per-locus STR genotyping results (VCF -> CSV)");
    println!("  depth_overview - Summarize the normalised depth distribution (VCF -> JSON or plot)");
    println!();
    println!("For help with each tool:");
    println!("  cargo run --bin str_csv -- --help");
    println!("  cargo run --bin depth_overview -- --help");
}
