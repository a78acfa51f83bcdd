use crate::engine::chrome::ChromeProvider;
use crate::engine::{SamplerEngine, SessionProvider};
use crate::model::{RunConfig, RunResult, SampleEvent};
use crate::{storage, text_summary};
use anyhow::{Context, Result};
use clap::Parser;
use rand::RngCore;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Route for the blocking writer: summaries and JSON go to stdout,
/// progress lines to stderr.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer so progress and summary output never stalls the
/// async event loop.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "resource-timing-cli",
    version,
    about = "Sample browser resource timings across repeated page loads"
)]
pub struct Cli {
    /// Page to sample
    #[arg(long, default_value = "https://en.wikipedia.org/wiki/Software_metric")]
    pub url: String,

    /// Number of load-and-measure repetitions
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub cycles: u32,

    /// CSS selector for the page-identity heading element
    #[arg(long, default_value = "#firstHeading > span")]
    pub heading_selector: String,

    /// Substring the heading text must contain for the page to count as loaded
    #[arg(long, default_value = "Software metric")]
    pub expected_heading: String,

    /// Use --headless true or --headless false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Where to write the raw per-cycle duration map
    #[arg(long, default_value = "map.json")]
    pub raw_output: PathBuf,

    /// Where to write the per-resource average map
    #[arg(long, default_value = "processedMap.json")]
    pub averages_output: PathBuf,

    /// Print the full run result as JSON to stdout instead of a text summary
    #[arg(long)]
    pub json: bool,

    /// Suppress progress lines and the text summary
    #[arg(long)]
    pub silent: bool,
}

/// Generate a random measurement ID for the run.
fn gen_meas_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    u64::from_le_bytes(b).to_string()
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        url: args.url.clone(),
        cycles: args.cycles,
        heading_selector: args.heading_selector.clone(),
        expected_heading: args.expected_heading.clone(),
        headless: args.headless,
        meas_id: gen_meas_id(),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let provider = ChromeProvider::new(cfg.headless);
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<SampleEvent>();

    // The engine body is synchronous (one blocking browser session at a
    // time); progress flows back over the event channel.
    let raw_output = args.raw_output.clone();
    let averages_output = args.averages_output.clone();
    let handle = tokio::task::spawn_blocking(move || {
        sample_and_persist(cfg, provider, &raw_output, &averages_output, &evt_tx)
    });

    while let Some(ev) = evt_rx.recv().await {
        if args.silent {
            continue;
        }
        match ev {
            SampleEvent::CycleStarted { cycle, total } => {
                let _ = out_tx.send(OutputLine::Stderr(format!("Cycle {cycle}/{total}")));
            }
            SampleEvent::PageVerified { cycle, heading } => {
                if cycle == 1 {
                    let _ =
                        out_tx.send(OutputLine::Stderr(format!("Verified heading: {heading:?}")));
                }
            }
            SampleEvent::EntriesCollected { count, .. } => {
                let _ = out_tx.send(OutputLine::Stderr(format!("  {count} timing entries")));
            }
        }
    }

    let result = handle.await.context("sampler task failed")??;

    if args.json {
        let out = serde_json::to_string_pretty(&result)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if !args.silent {
        let summary = text_summary::build_text_summary(&result, 10);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Saved: {} and {}",
            args.raw_output.display(),
            args.averages_output.display()
        )));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Run the engine to completion, then write both artifacts: the raw sample
/// map first, then the averages. A failed run returns before either file is
/// touched, so no partial JSON is left behind.
fn sample_and_persist<P: SessionProvider>(
    cfg: RunConfig,
    provider: P,
    raw_output: &Path,
    averages_output: &Path,
    event_tx: &mpsc::UnboundedSender<SampleEvent>,
) -> Result<RunResult> {
    let result = SamplerEngine::new(cfg, provider)
        .run(event_tx)
        .context("sampling run failed")?;
    storage::export_json(raw_output, &result.samples).context("failed to write raw sample map")?;
    storage::export_json(averages_output, &result.averages)
        .context("failed to write averages map")?;
    Ok(result)
}
