mod bootstrap;
mod report;

use anyhow::Result;
use chat_core::settings::{PipelineConfig, Settings};
use chat_data::analysis::find_transcripts;
use chat_data::metrics::MetricAggregator;
use chat_data::table::{save_snapshot, TableFilter};
use chat_runtime::batch::{BatchRunner, FailurePolicy};
use chat_runtime::table_manager::{TableManager, DEFAULT_CACHE_TTL_SECS};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    let input_dir = settings.input_dir();
    let output_dir = settings.output_dir();

    bootstrap::ensure_directories(&input_dir, &output_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Chat Analyzer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Input: {}, Output: {}",
        settings.view,
        input_dir.display(),
        output_dir.display()
    );

    match settings.view.as_str() {
        "aggregate" => {
            let files = find_transcripts(&input_dir);
            if files.is_empty() {
                tracing::warn!("No transcripts found in {}", input_dir.display());
                println!("No .txt transcripts found in {}", input_dir.display());
                return Ok(());
            }

            let policy = if settings.fail_fast {
                FailurePolicy::AbortOnError
            } else {
                FailurePolicy::SkipAndContinue
            };
            let runner = BatchRunner::new(PipelineConfig::from(&settings), policy);
            let batch = runner.run(&files).await?;

            let snapshot = save_snapshot(&output_dir, &batch.records)?;
            print!("{}", report::batch_summary(&batch, &snapshot));
        }

        "metrics" | "hourly" | "weekday" | "daily" => {
            let mut manager = TableManager::new(DEFAULT_CACHE_TTL_SECS, &output_dir);
            let table = manager.get_table(false).cloned();
            let Some(table) = table else {
                anyhow::bail!(
                    "No feature table available: {}",
                    manager.last_error().unwrap_or("unknown error")
                );
            };

            let filter = build_filter(&settings);
            let records: Vec<_> = table.filter(&filter).collect();
            tracing::debug!("{} of {} records match the filter", records.len(), table.len());

            let rendered = match settings.view.as_str() {
                "metrics" => report::sender_report(
                    &MetricAggregator::by_sender_receiver(records.iter().copied()),
                    &MetricAggregator::calculate_totals(records.iter().copied()),
                ),
                "hourly" => {
                    report::hourly_report(&MetricAggregator::hourly_statistics(records.iter().copied()))
                }
                "weekday" => {
                    report::weekday_report(&MetricAggregator::by_weekday(records.iter().copied()))
                }
                _ => report::daily_report(
                    &MetricAggregator::messages_per_day(records.iter().copied()),
                    &MetricAggregator::by_date(records.iter().copied()),
                ),
            };
            print!("{rendered}");
        }

        unknown => {
            eprintln!("Unknown view mode: {}", unknown);
        }
    }

    Ok(())
}

/// Translate the CLI filter flags into a [`TableFilter`].
///
/// `--start` is inclusive from midnight; `--end` is exclusive from midnight.
fn build_filter(settings: &Settings) -> TableFilter {
    let mut filter = TableFilter::new()
        .with_chats(settings.chats.iter().cloned())
        .with_senders(settings.senders.iter().cloned())
        .with_receivers(settings.receivers.iter().cloned());
    if let Some(start) = settings.start.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        filter = filter.with_start(start);
    }
    if let Some(end) = settings.end.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        filter = filter.with_end(end);
    }
    filter
}
