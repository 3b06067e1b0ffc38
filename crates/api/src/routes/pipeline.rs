//! Pipeline endpoints.
//!
//! Each handler decodes the posted tables, runs one pure stage on them and
//! wraps the result in the standard envelope. Stage work is synchronous and
//! CPU-bound, so it runs on the blocking pool.

use axum::{extract::State, Json};
use chrono::{DateTime, Datelike, Utc};
use pipeline_core::{
    codec::parse_timestamp, decode_metrics_input, deduplicate_table, Error, MetricsInput, RowSet,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::{error, info, warn};

use crate::extractors::JsonBody;
use crate::response::{ApiError, ApiResponse, DedupData, MetricsData, SummaryData};
use crate::state::AppState;

/// Body of `POST /v1/deduplicate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeduplicateRequest {
    pub raw_events: RowSet,
}

/// Body of `POST /v1/customer-metrics` and `POST /v1/customer-summaries`.
///
/// Missing tables are treated as empty.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CustomerTablesRequest {
    #[serde(default)]
    pub web_events: RowSet,
    #[serde(default)]
    pub purchases: RowSet,
    #[serde(default)]
    pub profiles: RowSet,
    /// Reference instant for every window; server clock when absent
    #[serde(default)]
    pub as_of: Option<String>,
}

/// Calendar years accepted for `as_of`.
const AS_OF_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

impl CustomerTablesRequest {
    fn as_of(&self) -> Result<DateTime<Utc>, Error> {
        let Some(raw) = self.as_of.as_deref() else {
            return Ok(Utc::now());
        };
        let as_of = parse_timestamp(raw).ok_or_else(|| {
            Error::invalid_field("as_of", format!("unparseable timestamp '{}'", raw))
        })?;
        if !AS_OF_YEARS.contains(&as_of.year()) {
            return Err(Error::invalid_field(
                "as_of",
                format!("timestamp '{}' is outside years 1-9999", raw),
            ));
        }
        Ok(as_of)
    }

    fn row_count(&self) -> usize {
        self.web_events.len() + self.purchases.len() + self.profiles.len()
    }
}

/// Runs a pipeline stage off the async executor.
async fn run_stage<T, F>(stage: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(stage).await.map_err(|e| {
        error!(error = %e, "Pipeline stage panicked");
        ApiError::internal("pipeline stage failed")
    })?;

    result.map_err(|e| {
        if e.is_schema() {
            metrics().schema_errors.inc();
        }
        warn!(error = %e, "Pipeline request rejected");
        ApiError::from(e)
    })
}

fn record_table_stats(input: &MetricsInput) {
    let stats = &input.stats;
    let invalid = stats.web_events.invalid_records
        + stats.purchases.invalid_records
        + stats.profiles.invalid_records;
    metrics().table_rows_invalid.inc_by(invalid);
}

/// POST /v1/deduplicate - Collapse raw sales events to one record per natural key.
pub async fn deduplicate_handler(
    JsonBody(request): JsonBody<DeduplicateRequest>,
) -> Result<Json<ApiResponse<DedupData>>, ApiError> {
    let start = Instant::now();
    let received = request.raw_events.len();
    metrics().raw_records_received.inc_by(received as u64);

    let outcome = run_stage(move || deduplicate_table(&request.raw_events)).await?;

    let invalid = outcome.stats.invalid_records + outcome.report.invalid_records as u64;
    metrics().raw_records_invalid.inc_by(invalid);
    metrics().duplicates_removed.inc_by(outcome.report.duplicates_removed as u64);
    metrics().canonical_records_emitted.inc_by(outcome.records.len() as u64);
    metrics().dedup_latency_us.observe_duration(start.elapsed());

    info!(
        received = received,
        invalid = invalid,
        duplicates_removed = outcome.report.duplicates_removed,
        emitted = outcome.records.len(),
        latency_us = start.elapsed().as_micros() as u64,
        "Deduplication complete"
    );

    let count = outcome.records.len();
    Ok(Json(ApiResponse::new(
        format!("Deduplicated {} raw events into {} records", received, count),
        count,
        DedupData {
            records: outcome.records,
            report: outcome.report,
            validation: outcome.stats,
        },
    )))
}

/// POST /v1/customer-metrics - Grouped metrics per segment, tier and location.
pub async fn customer_metrics_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CustomerTablesRequest>,
) -> Result<Json<ApiResponse<MetricsData>>, ApiError> {
    let start = Instant::now();
    let as_of = request.as_of()?;
    let windows = state.windows;
    metrics().table_rows_received.inc_by(request.row_count() as u64);

    let (rows, input) = run_stage(move || {
        let input =
            decode_metrics_input(&request.web_events, &request.purchases, &request.profiles)?;
        Ok((input.metrics(as_of, &windows), input))
    })
    .await?;

    record_table_stats(&input);
    metrics().customers_summarized.inc_by(input.profiles.len() as u64);
    metrics().metrics_rows_emitted.inc_by(rows.len() as u64);
    metrics().aggregation_latency_us.observe_duration(start.elapsed());

    info!(
        %as_of,
        customers = input.profiles.len(),
        groups = rows.len(),
        latency_us = start.elapsed().as_micros() as u64,
        "Customer metrics computed"
    );

    let count = rows.len();
    Ok(Json(ApiResponse::new(
        format!(
            "Computed {} metric groups for {} customers",
            count,
            input.profiles.len()
        ),
        count,
        MetricsData {
            as_of,
            customers: input.profiles.len(),
            rows,
            validation: input.stats,
        },
    )))
}

/// POST /v1/customer-summaries - Per-customer joined rows with segment and status.
pub async fn customer_summaries_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CustomerTablesRequest>,
) -> Result<Json<ApiResponse<SummaryData>>, ApiError> {
    let start = Instant::now();
    let as_of = request.as_of()?;
    let windows = state.windows;
    metrics().table_rows_received.inc_by(request.row_count() as u64);

    let (customers, input) = run_stage(move || {
        let input =
            decode_metrics_input(&request.web_events, &request.purchases, &request.profiles)?;
        Ok((input.summaries(as_of, &windows), input))
    })
    .await?;

    record_table_stats(&input);
    metrics().customers_summarized.inc_by(customers.len() as u64);
    metrics().aggregation_latency_us.observe_duration(start.elapsed());

    info!(
        %as_of,
        customers = customers.len(),
        latency_us = start.elapsed().as_micros() as u64,
        "Customer summaries computed"
    );

    let count = customers.len();
    Ok(Json(ApiResponse::new(
        format!("Summarized {} customers", count),
        count,
        SummaryData {
            as_of,
            customers,
            validation: input.stats,
        },
    )))
}
