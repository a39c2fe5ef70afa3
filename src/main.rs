//! multisend - send SOL or an SPL token to many recipients in one transaction

use anyhow::{Context, Result};
use clap::Parser;
use multisend::config::Config;
use multisend::ledger::RpcLedgerClient;
use multisend::metrics::metrics;
use multisend::signer::KeypairSigner;
use multisend::wallet::Wallet;
use multisend::{
    validate_recipients, AssetSelection, BatchExecutor, BatchState, TransactionLifecycle,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "MULTISEND_CONFIG")]
    config: PathBuf,

    /// SOL, a configured token symbol, or a mint address
    #[arg(short, long, default_value = "SOL")]
    asset: String,

    /// Recipient as ADDRESS=AMOUNT (repeatable)
    #[arg(long = "to", value_name = "ADDRESS=AMOUNT")]
    to: Vec<String>,

    /// JSON file with an array of {"address", "amount"} objects
    #[arg(long)]
    recipients_file: Option<PathBuf>,

    /// Print the fee estimate and total without sending
    #[arg(long)]
    estimate_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    print_metrics: bool,
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    address: String,
    amount: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting multisend");

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let registry = config.asset_registry()?;

    let rows = collect_recipients(&args)?;
    if rows.is_empty() {
        anyhow::bail!("No recipients given; use --to or --recipients-file");
    }

    let asset = AssetSelection::from_selector(&args.asset, &registry);
    let mut batch = BatchState::with_recipients(asset, rows);
    let total = batch.calculate_total().to_string();

    let report = validate_recipients(&batch.recipients);
    if !report.is_valid() {
        for problem in &report.errors {
            error!(
                recipient = problem.index + 1,
                field = ?problem.field,
                "{}",
                problem.message
            );
        }
        anyhow::bail!("{} invalid recipient field(s)", report.errors.len());
    }

    let fee = config
        .fee_estimator()
        .estimate(batch.len(), !batch.asset.is_native());
    println!(
        "Sending {} {} to {} recipient(s), estimated fee {}",
        total,
        batch.asset.display_symbol(),
        batch.len(),
        fee
    );

    if args.estimate_only {
        return finish(&args, &config);
    }

    let wallet = Wallet::from_file(config.keypair_path()).context("Failed to load wallet")?;
    info!(sender = %wallet.pubkey(), rpc = %config.rpc.url, "Wallet loaded");

    let ledger = RpcLedgerClient::from_url(
        config.rpc.url.clone(),
        config.rpc_timeout(),
        config.commitment()?,
        config.confirm_policy(),
    );
    let signer = KeypairSigner::new(wallet, ledger.rpc_client());
    let executor = BatchExecutor::new(Arc::new(ledger), Arc::new(signer), registry)
        .with_fee_estimator(config.fee_estimator())
        .with_commitment(config.commitment()?);

    let balance = executor.check_balance(&batch).await;
    match balance.current {
        Some(current) if !balance.sufficient => warn!(
            current,
            required = balance.required,
            "Sender balance looks insufficient"
        ),
        None => warn!("Sender balance unavailable"),
        _ => {}
    }

    let mut lifecycle = TransactionLifecycle::new();
    let outcome = executor.handle_send(&batch, &mut lifecycle).await;
    println!("{}", serde_json::to_string_pretty(&lifecycle)?);

    finish(&args, &config)?;
    outcome?;
    Ok(())
}

fn finish(args: &Args, config: &Config) -> Result<()> {
    if args.print_metrics && config.monitoring.enable_metrics {
        print!("{}", metrics().render()?);
    }
    Ok(())
}

/// Initialize logging
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "multisend=debug,info"
    } else {
        "multisend=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

fn collect_recipients(args: &Args) -> Result<Vec<(String, String)>> {
    let mut rows = args
        .to
        .iter()
        .map(|arg| parse_recipient_arg(arg))
        .collect::<Result<Vec<_>>>()?;

    if let Some(path) = &args.recipients_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_rows: Vec<RecipientRow> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        rows.extend(file_rows.into_iter().map(|r| (r.address, r.amount)));
    }

    Ok(rows)
}

fn parse_recipient_arg(arg: &str) -> Result<(String, String)> {
    let (address, amount) = arg
        .split_once('=')
        .with_context(|| format!("expected ADDRESS=AMOUNT, got '{}'", arg))?;
    Ok((address.to_string(), amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient_arg() {
        assert_eq!(
            parse_recipient_arg("abc=1.5").unwrap(),
            ("abc".to_string(), "1.5".to_string())
        );
        assert!(parse_recipient_arg("abc").is_err());
    }

    #[test]
    fn test_args_collect_repeated_recipients() {
        let args = Args::parse_from([
            "multisend",
            "--asset",
            "usdc",
            "--to",
            "a=1",
            "--to",
            "b=2",
            "--estimate-only",
        ]);
        assert!(args.estimate_only);
        assert_eq!(
            collect_recipients(&args).unwrap(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_recipients_file_is_appended() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{"address": "c", "amount": "3"}]"#,
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = Args::parse_from(["multisend", "--to", "a=1", "--recipients-file", &path]);
        let rows = collect_recipients(&args).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], ("c".to_string(), "3".to_string()));
    }
}
