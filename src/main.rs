use anyhow::{bail, Context, Result};
use clap::Parser;
use scoreboard_ai::analyzer::{self, AnalysisOutcome, Backend, ScoreboardAnalyzer};
use scoreboard_ai::cli::{Cli, Commands};
use scoreboard_ai::config::Config;
use scoreboard_ai::error::ScoreboardAiError;
use scoreboard_ai::scanner;
use serde::Serialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "scoreboard_ai=debug"
    } else {
        "scoreboard_ai=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// JSONをファイルまたは標準出力へ書き出す
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("結果を書き込めません: {}", path.display()))?;
            info!("結果を保存: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// 失敗を出力した場合は終了コード1
fn exit_for(outcome: &AnalysisOutcome) {
    if !outcome.is_success() {
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().context("設定ファイルの読み込みに失敗しました")?;

    match cli.command {
        Commands::Analyze { path, game_version, output, concurrency } => {
            let provider = cli.ai_provider.unwrap_or(config.provider);
            let backend = Backend::from_config(provider, &config)?;
            let analyzer = ScoreboardAnalyzer::from_config(backend, &config);

            // Ctrl-C で解析中の呼び出しを破棄
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("中断要求を受け付けました");
                    token.cancel();
                }
            });

            if path.is_dir() {
                let images = scanner::scan_folder(&path)?;
                if images.is_empty() {
                    return Err(ScoreboardAiError::NoImagesFound(path.display().to_string()).into());
                }
                info!("{}枚のスクリーンショットを検出 ({})", images.len(), provider);

                let report = analyzer
                    .analyze_batch(
                        &images,
                        game_version,
                        concurrency.unwrap_or(config.concurrency),
                        &cancel,
                        true,
                    )
                    .await;
                write_json(&report, output.as_deref())?;

                if report.cancelled {
                    bail!("解析を中断しました（{}/{}枚を出力）", report.entries.len(), report.total);
                }
            } else {
                let bytes = scanner::read_image(&path)?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());

                let Some(outcome) = analyzer
                    .analyze_with_cancel(&file_name, bytes, game_version, &cancel)
                    .await
                else {
                    bail!("解析を中断しました");
                };
                write_json(&outcome, output.as_deref())?;
                exit_for(&outcome);
            }
        }

        Commands::Parse { response, game_version, output } => {
            let text = std::fs::read_to_string(&response)
                .with_context(|| format!("応答ファイルを読めません: {}", response.display()))?;
            let outcome = analyzer::analyze_response(&text, game_version, &config.salvage);
            write_json(&outcome, output.as_deref())?;
            exit_for(&outcome);
        }

        Commands::Normalize { input, output } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("結果ファイルを読めません: {}", input.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)?;
            let outcome = analyzer::renormalize_value(&value, &config.salvage);
            write_json(&outcome, output.as_deref())?;
            exit_for(&outcome);
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定 ({}):", Config::config_path()?.display());
                println!("  プロバイダ: {}", config.provider);
                println!("  モデル: {}", config.model);
                println!("  最大画像サイズ: {} bytes", config.max_image_bytes);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  再試行: {}回 (初回待機 {}ms, 上限 {}ms)",
                    config.retry.max_attempts, config.retry.initial_backoff_ms, config.retry.max_backoff_ms
                );
                println!(
                    "  救済: 読めない必須項目の割合 > {} で選手を除外, 既定モード {}, OCR補正 {}",
                    config.salvage.max_unrecoverable_ratio,
                    config.salvage.default_mode,
                    if config.salvage.ocr_substitutions { "有効" } else { "無効" }
                );
                println!("  同時実行数: {}", config.concurrency);
                let key_status = if !config.provider.requires_api_key() {
                    "不要（CLI側の認証を使用）"
                } else if config.get_api_key(config.provider).is_ok() {
                    "設定済み"
                } else {
                    "未設定"
                };
                println!("  APIキー: {}", key_status);
            }
        }
    }

    Ok(())
}
