//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Sales analytics CLI: clean a sales CSV, aggregate it, render charts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data/sales_data_sample.csv")]
    pub input: String,

    /// Encoding label of the input file (the reference dataset is ISO-8859-1)
    #[arg(short, long, default_value = "ISO-8859-1")]
    pub encoding: String,

    /// Directory where chart artifacts are written
    #[arg(short, long, default_value = "reports")]
    pub out_dir: String,

    /// Number of product lines in the top-products ranking
    #[arg(short = 'n', long, default_value = "5")]
    pub top_n: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Reject argument combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> crate::Result<()> {
        if self.top_n == 0 {
            anyhow::bail!("--top-n must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["salescope"]);
        assert_eq!(args.input, "data/sales_data_sample.csv");
        assert_eq!(args.encoding, "ISO-8859-1");
        assert_eq!(args.out_dir, "reports");
        assert_eq!(args.top_n, 5);
        assert!(!args.verbose);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let args = Args::parse_from(["salescope", "--top-n", "0"]);
        assert!(args.validate().is_err());
    }
}
