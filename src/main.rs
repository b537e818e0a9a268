use anyhow::{Context, Result};
use clap::Parser;
use refscraper::{
    batch,
    config::{Config, JobKind},
    context::RunContext,
    input,
    provider::HttpProvider,
};
use std::{fs, path::PathBuf, thread, time::Duration};
use tracing::info;

/// Interval between provider requests, per the vendor's rate limits.
/// Applied after every item, success or failure.
const REQUEST_PACING: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(
    name = "refscraper",
    about = "Batch-fetch financial reference data for a list of identifiers"
)]
struct Cli {
    /// Input file: CSV with identifier,name,start_date,end_date columns,
    /// or any other extension for one identifier per line
    input: PathBuf,

    /// Which dataset to pull
    #[arg(long, value_enum, default_value = "shareholders")]
    job: JobKind,

    /// Directory for the result file and run logs
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config {
        input_path: cli.input,
        output_dir: cli.out_dir,
        job: cli.job,
    };

    // ─── 1) run context: dated log file + clocks ─────────────────────
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("cannot create output dir {}", cfg.output_dir.display()))?;
    let ctx = RunContext::begin(&cfg.output_dir)?;

    // ─── 2) read the full item list up front ─────────────────────────
    let items = input::read_items(&cfg.input_path)?;
    info!(
        "loaded {} request items from {}",
        items.len(),
        cfg.input_path.display()
    );

    // ─── 3) provider session ─────────────────────────────────────────
    let provider = HttpProvider::from_env()?;

    // ─── 4) fetch loop ───────────────────────────────────────────────
    let report = batch::run(&items, &provider, cfg.job, &mut || {
        thread::sleep(REQUEST_PACING)
    })?;

    // ─── 5) single export at run end ─────────────────────────────────
    let out_path = cfg.output_dir.join(format!(
        "refscraper_{}_{}.tsv",
        cfg.job.slug(),
        ctx.started_at.format("%Y-%m-%d_%H-%M-%S"),
    ));
    report.table.write_tsv(&out_path)?;
    println!(
        "Wrote {} rows to {}",
        report.table.row_count(),
        out_path.display()
    );
    info!(
        "exported {} rows ({} of {} items succeeded) to {}",
        report.table.row_count(),
        report.attempted - report.failures.len(),
        report.attempted,
        out_path.display()
    );

    ctx.finish();
    Ok(())
}
