//! Natural-key deduplication of raw sales events.
//!
//! Late updates re-send a line item with the same
//! `(order_id, line_item_id, transaction_timestamp)`. Only the most recent
//! version survives. Rank inside a key, highest first:
//!
//! 1. `source_timestamp` (null ranks lowest)
//! 2. `created_at` (null ranks lowest)
//! 3. `transaction_id` (null ranks lowest)
//! 4. earliest position in the input
//!
//! The last two make the order total, so the result does not depend on how
//! ties happen to be stored, and running the stage on its own output is a
//! no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::records::{NaturalKey, RawSalesEvent};

/// Counts from one deduplication run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    pub input_records: usize,
    /// Failed the validity filter before partitioning
    pub invalid_records: usize,
    /// Valid records that lost to a newer version of the same key
    pub duplicates_removed: usize,
    pub output_records: usize,
}

type RankKey<'a> = (Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<&'a str>);

fn rank_key(event: &RawSalesEvent) -> RankKey<'_> {
    (
        event.source_timestamp,
        event.created_at,
        event.transaction_id.as_deref(),
    )
}

/// Whether `candidate` should replace `current` as the canonical record.
///
/// Strictly greater only: on a full tie the earlier record stays.
fn outranks(candidate: &RawSalesEvent, current: &RawSalesEvent) -> bool {
    rank_key(candidate) > rank_key(current)
}

/// Collapses raw events to one canonical record per natural key.
///
/// Invalid records are dropped. Output is ordered by natural key.
pub fn deduplicate(raw_events: Vec<RawSalesEvent>) -> Vec<RawSalesEvent> {
    deduplicate_with_report(raw_events).0
}

/// [`deduplicate`] plus the counts of what was dropped.
pub fn deduplicate_with_report(
    raw_events: Vec<RawSalesEvent>,
) -> (Vec<RawSalesEvent>, DedupReport) {
    let input_records = raw_events.len();
    let mut invalid_records = 0;
    let mut partitions: BTreeMap<NaturalKey, RawSalesEvent> = BTreeMap::new();

    for event in raw_events {
        if !event.is_valid() {
            invalid_records += 1;
            continue;
        }
        let Some(key) = event.natural_key() else {
            invalid_records += 1;
            continue;
        };

        match partitions.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(mut slot) => {
                if outranks(&event, slot.get()) {
                    slot.insert(event);
                }
            }
        }
    }

    let output: Vec<RawSalesEvent> = partitions.into_values().collect();
    let report = DedupReport {
        input_records,
        invalid_records,
        duplicates_removed: input_records - invalid_records - output.len(),
        output_records: output.len(),
    };

    if invalid_records > 0 {
        warn!(
            dropped = invalid_records,
            input = input_records,
            "Dropped raw sales events failing validity filter"
        );
    }
    debug!(
        input = report.input_records,
        duplicates_removed = report.duplicates_removed,
        output = report.output_records,
        "Deduplicated raw sales events"
    );

    (output, report)
}
