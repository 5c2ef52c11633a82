use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use keyword_recon::adapters::FastRandSource;
use keyword_recon::config::toml_config::LogFormat;
use keyword_recon::domain::model::StageOutcome;
use keyword_recon::domain::ports::RandomSource;
use keyword_recon::utils::error::ErrorSeverity;
use keyword_recon::utils::logger;
use keyword_recon::{
    CliConfig, DiscoveryOutcome, DiscoveryPipeline, DiscoveryReport, ReconError, TrackerSnapshot,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct JsonReport<'a> {
    domain: &'a str,
    organization: Option<&'a str>,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a DiscoveryReport,
    stages: &'a [StageOutcome],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}: {}", e, e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    match config.logging.format {
        LogFormat::Json => logger::init_json_logger(),
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
    }
    tracing::debug!("CLI config: {:?}", cli);

    let random: Arc<dyn RandomSource> = match config.fallback.seed {
        Some(seed) => Arc::new(FastRandSource::with_seed(seed)),
        None => Arc::new(FastRandSource::new()),
    };

    let token = CancellationToken::new();
    let mut pipeline = DiscoveryPipeline::from_config(&config, random)
        .context("failed to build discovery pipeline")?
        .with_cancellation(token.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, stopping at the next stage boundary");
            token.cancel();
        }
    });

    // 一邊執行一邊印出新的進度行
    let mut progress = pipeline.subscribe();
    let mut printed = 0;
    let result = {
        let run = pipeline.run_discovery(&cli.domain);
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result,
                Ok(()) = progress.changed(), if !cli.json => {
                    printed = print_progress(&progress.borrow_and_update(), printed);
                }
            }
        }
    };
    if !cli.json {
        print_progress(&pipeline.snapshot(), printed);
    }

    match result {
        Ok(outcome) if cli.json => {
            let document = JsonReport {
                domain: &cli.domain,
                organization: outcome.organization.as_deref(),
                generated_at: Utc::now(),
                report: &outcome.report,
                stages: &outcome.stages,
            };
            let json = serde_json::to_string_pretty(&document).context("failed to encode report")?;
            println!("{}", json);
        }
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn print_progress(snapshot: &TrackerSnapshot, printed: usize) -> usize {
    for line in snapshot.lines().skip(printed) {
        println!("{}", line);
    }
    snapshot.log.len().max(printed)
}

fn print_outcome(outcome: &DiscoveryOutcome) {
    let report = &outcome.report;
    println!();
    if let Some(org) = &outcome.organization {
        println!("🏢 Organization: {}", org);
    }

    println!("🔤 Name keywords ({}):", report.name_keywords.len());
    for keyword in &report.name_keywords {
        println!("    {}", keyword);
    }

    println!("🌐 Domain keywords ({}):", report.domain_keywords.len());
    for keyword in &report.domain_keywords {
        println!("    {}", keyword);
    }

    println!("✅ Total unique keywords: {}", report.total_count);
}

fn exit_with(e: ReconError) -> ! {
    tracing::error!(
        "❌ Discovery failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2, // 被中斷，可重跑
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
