//! SaleScope: Sales analytics CLI over a static sales CSV
//!
//! This is the main entrypoint that orchestrates data loading, cleaning,
//! aggregation, and chart rendering: one linear batch run per invocation.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use salescope::{aggregate, clean, load, viz, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate()?;

    if args.verbose {
        println!("SaleScope - Sales Data Analysis");
        println!("===============================\n");
    }

    run_pipeline(&args)
}

/// Logging is process-wide state, initialized exactly once here; the
/// cleaning and aggregation functions themselves stay data-in/data-out.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
}

/// Run the full load -> clean -> aggregate -> render pipeline.
fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load and clean
    log::info!("Step 1: loading {}", args.input);
    let data_start = Instant::now();
    let table = load(Path::new(&args.input), &args.encoding)?;
    let dataset = clean(&table)?;
    let data_time = data_start.elapsed();

    println!("✓ Data cleaned: {} records", dataset.len());
    if args.verbose {
        println!("  Processing time: {:.2}s", data_time.as_secs_f64());
        println!(
            "  Dropped: {} missing-field, {} bad-quantity, {} duplicate",
            dataset.stats.dropped_missing,
            dataset.stats.dropped_nonpositive_qty,
            dataset.stats.duplicates_removed
        );
    }

    // Step 2: Aggregate
    log::info!("Step 2: computing aggregates");
    let agg_start = Instant::now();
    let result = aggregate(&dataset, args.top_n);
    let agg_time = agg_start.elapsed();

    println!("✓ Aggregates computed: {} metrics", result.len());
    if args.verbose {
        println!("  Aggregation time: {:.2}s", agg_time.as_secs_f64());
    }

    // Step 3: Render
    log::info!("Step 3: rendering charts to {}", args.out_dir);
    let viz_start = Instant::now();
    let artifacts = viz::render_report(&result, Path::new(&args.out_dir))?;
    let viz_time = viz_start.elapsed();

    println!("✓ Charts rendered: {} files in {}", artifacts.len(), args.out_dir);
    if args.verbose {
        println!("  Rendering time: {:.2}s", viz_time.as_secs_f64());
        for path in &artifacts {
            println!("  {}", path.display());
        }
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
