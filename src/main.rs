use anyhow::{Context, Result};
use clap::Parser;
use cluster_verify::config::TableArgs;
use cluster_verify::io::{read_table, write_table};
use cluster_verify::models::MatchPass;
use cluster_verify::orchestrator::verify_clusters;
use cluster_verify::progress::{create_spinner, format_duration, set_log_only};
use cluster_verify::safety::validate_output_path;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "cluster-verify")]
#[command(about = "Verify that pre-clustered investigator records describe the same person")]
struct Args {
    /// Input table (.csv, .xlsx, or .sqlite/.sqlite3/.db)
    input: PathBuf,

    /// Output table; same formats as input. Excel rows are filled by verdict
    output: PathBuf,

    #[command(flatten)]
    table: TableArgs,

    /// Rayon worker threads (0 = one per core)
    #[arg(long, default_value = "0")]
    workers: usize,

    /// Write the run summary as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    validate_output_path(&args.output, &args.input)?;

    let start = Instant::now();

    log::info!("Reading input table: {:?}", args.input);
    let spinner = create_spinner("Reading input table");
    let table = read_table(&args.input, &args.table.table, &args.table.columns())?;
    spinner.finish_with_message(format!("Read {} records", table.len()));

    let outcome = verify_clusters(table.records.clone(), args.table.delimiter);

    log::info!("Writing output table: {:?}", args.output);
    let spinner = create_spinner("Writing output table");
    write_table(&args.output, &table, &outcome, &args.table.table)?;
    spinner.finish_with_message(format!("Wrote {} records", table.len()));

    let summary = &outcome.summary;
    summary.log_summary();
    if let Some(path) = &args.stats {
        summary
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }

    println!("\n{:=<60}", "");
    println!("Verification complete!");
    for pass in MatchPass::ALL {
        println!("  {:<8} {}", pass.label(), summary.count_for(pass));
    }
    println!("  {:<8} {}", "unmatched", summary.unmatched);
    println!(
        "  Matched: {}/{} = {:.3}%",
        summary.total_matches, summary.total_clusters, summary.match_rate
    );
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
