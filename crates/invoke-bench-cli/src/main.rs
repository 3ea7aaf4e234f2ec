mod args;

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use invoke_bench::report::generate_suite_report;
use invoke_bench::suite::write_json_file;
use invoke_bench::trace::{TraceConfig, init_tracing};
use invoke_bench::{FailurePolicy, Result, RunCancel, RunOptions, SuiteConfig};
use invoke_client::{
    ClientOptions, Credential, DataUriEncoder, FunctionReference, InvocationInput, InvokeClient,
};
use invoke_config::{FinalInvokeConfig, load_config};

use crate::args::{Cli, build_runtime};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("invoke-bench error: {}", err.format_chain());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(
        "invoke-bench",
        TraceConfig {
            level: cli.log_level.into(),
            ..TraceConfig::default()
        },
    )?;

    // Config problems are fatal before any network traffic.
    let mut cfg = load_config(&cli.config)?;
    cli.apply_overrides(&mut cfg);
    cfg.check()?;
    tracing::info!(config = ?cfg, path = %cli.config.display(), "config loaded");

    let runtime = build_runtime()?;
    runtime.block_on(run_benchmark(&cli, &cfg))
}

async fn run_benchmark(cli: &Cli, cfg: &FinalInvokeConfig) -> Result<()> {
    let options = ClientOptions {
        scheme: cfg.scheme.clone(),
        host: cfg.host.clone(),
        timeout: Duration::from_secs(cfg.timeout_secs),
    };
    let client = InvokeClient::new(
        Credential::new(&cfg.access_token)?,
        FunctionReference::new(&cfg.function_id)?,
        options,
    )?;
    let encoder = DataUriEncoder::from_client(&client);
    let image_url = InvocationInput::new(cfg.image_url.clone())?;

    let cancel = RunCancel::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling in-flight calls");
            on_signal.cancel();
        }
    });

    let suite_cfg = SuiteConfig {
        iterations: cfg.iterations,
        media_type: cfg.media_type.clone(),
        run: RunOptions {
            failure_policy: FailurePolicy::from(cfg.failure_policy),
            max_in_flight: cfg.max_in_flight,
            cancel: Some(cancel),
        },
    };

    let mut stdout = std::io::stdout().lock();
    let result =
        invoke_bench::run_suite(&client, &encoder, &image_url, &suite_cfg, &mut stdout).await?;
    stdout.flush()?;
    drop(stdout);

    if let Some(path) = &cli.output_json {
        write_json_file(path, &result)?;
        tracing::info!(path = %path.display(), "suite result written");
    }
    if let Some(dir) = &cli.report_dir {
        let artifacts = generate_suite_report(&result, dir)?;
        tracing::info!(
            markdown = %artifacts.markdown.display(),
            charts = artifacts.charts.len(),
            "report written"
        );
    }

    if result
        .scenarios
        .iter()
        .filter_map(|report| report.run())
        .any(|run| run.summary.failed > 0)
    {
        tracing::warn!("some calls failed; see the per-run summaries");
    }
    Ok(())
}
