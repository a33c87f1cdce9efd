use anyhow::{bail, Context, Result};
use clap::Parser;
use logtier_pipeline::{EligibilityPipeline, ErrorPolicy, PipelineConfig, StagePolicies};
use std::env;
use std::io;
use std::path::PathBuf;

mod output;
mod progress;

pub use output::write_candidates;
pub use progress::StageProgress;

const REGION_ENV: &str = "AWS_REGION";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "logtier")]
#[command(about = "Find CloudWatch log groups that can move to Infrequent Access", long_about = None)]
#[command(version)]
struct Cli {
    /// AWS region (defaults to the AWS_REGION environment variable)
    region: Option<String>,

    /// File receiving one eligible log group name per line
    #[arg(long, default_value = "ia.txt")]
    outfile: PathBuf,

    /// TOML file with pipeline settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subscription filter lookups in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Subscription filter lookups per second
    #[arg(long)]
    requests_per_second: Option<f64>,

    /// Event history window in days
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Abort on the first stage error instead of keeping its input
    #[arg(long)]
    fail_fast: bool,

    /// Print the result and per-stage report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    let quiet = cli.quiet || cli.json;
    init_logging(quiet, cli.verbose);

    let region = resolve_region(cli.region.clone(), env::var(REGION_ENV).ok())?;
    let config = load_config(&cli)?;

    let backend = logtier_aws::backend_for_region(&region).await;
    let pipeline = EligibilityPipeline::new(backend, config)?;

    let progress = StageProgress::new(!quiet);
    let outcome = pipeline
        .run_with(&progress)
        .await
        .with_context(|| format!("Eligibility check failed in {region}"))?;

    log::info!(
        "Log groups that should be considered for transition to IA: {}",
        outcome.eligible.len()
    );
    if !outcome.report.is_complete() {
        log::warn!("Some checks failed and were skipped; review the list before transitioning");
    }

    log::info!("Writing list to: {}", cli.outfile.display());
    write_candidates(&cli.outfile, &outcome.eligible)?;

    if cli.json {
        print_stdout(&serde_json::to_string_pretty(&outcome)?)?;
    }
    Ok(())
}

fn init_logging(quiet: bool, verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // The SDK stack logs every request at debug level.
    if !verbose {
        for module in [
            "aws_config",
            "aws_smithy_runtime",
            "aws_sdk_cloudwatchlogs",
            "aws_sdk_cloudtrail",
            "hyper",
            "rustls",
        ] {
            builder.filter_module(module, log::LevelFilter::Warn);
        }
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn resolve_region(arg: Option<String>, from_env: Option<String>) -> Result<String> {
    let non_empty = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    match non_empty(arg).or_else(|| non_empty(from_env)) {
        Some(region) => Ok(region),
        None => bail!("No region provided and {REGION_ENV} environment variable not set"),
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(rate) = cli.requests_per_second {
        config.requests_per_second = rate;
    }
    if let Some(days) = cli.lookback_days {
        config.lookback_days = days;
    }
    if cli.fail_fast {
        config.error_policy = ErrorPolicy::Abort;
        config.stage_policies = StagePolicies::default();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("logtier").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn region_argument_wins_over_environment() {
        let region = resolve_region(Some("eu-west-1".into()), Some("us-east-1".into()));
        assert_eq!(region.expect("region"), "eu-west-1");
    }

    #[test]
    fn region_falls_back_to_environment() {
        assert_eq!(
            resolve_region(None, Some("us-east-2".into())).expect("region"),
            "us-east-2"
        );
        assert_eq!(
            resolve_region(Some("  ".into()), Some("us-east-2".into())).expect("region"),
            "us-east-2"
        );
    }

    #[test]
    fn missing_region_is_an_error() {
        let err = resolve_region(None, Some(String::new())).expect_err("no region");
        assert!(err.to_string().contains("No region provided"));
    }

    #[test]
    fn defaults_when_no_flags_are_given() {
        let cli = parse(&["us-east-1"]);
        assert_eq!(cli.outfile, PathBuf::from("ia.txt"));
        assert_eq!(load_config(&cli).expect("config"), PipelineConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logtier.toml");
        std::fs::write(&path, "concurrency = 4\nlookback_days = 14\n").expect("write");

        let cli = parse(&[
            "--config",
            path.to_str().expect("utf-8 path"),
            "--concurrency",
            "3",
            "--requests-per-second",
            "2.5",
        ]);
        let config = load_config(&cli).expect("config");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.requests_per_second, 2.5);
        assert_eq!(config.lookback_days, 14);
    }

    #[test]
    fn fail_fast_aborts_every_stage() {
        let cli = parse(&["--fail-fast"]);
        let config = load_config(&cli).expect("config");
        for stage in logtier_pipeline::Stage::ALL {
            assert_eq!(config.policy_for(stage), ErrorPolicy::Abort);
        }
    }

    #[test]
    fn out_of_range_override_is_rejected() {
        let cli = parse(&["--concurrency", "0"]);
        assert!(load_config(&cli).is_err());
    }
}
