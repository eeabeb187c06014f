//! Aggregation of per-account results into a run's counters and summary.

use std::collections::HashMap;
use std::time::Duration;

use super::types::{
    AccountStatus, AccountSyncResult, BatchSyncResult, ItemCounters, ResultSummary, RunStatus,
    TOP_ERRORS_LIMIT, TopError,
};

/// Terminal status for a set of account outcomes.
///
/// No failures is `completed` (including an empty run), all failures is
/// `failed`, anything in between is `partial`.
#[must_use]
pub fn derive_status(processed: usize, failed: usize) -> RunStatus {
    if failed == 0 {
        RunStatus::Completed
    } else if failed == processed {
        RunStatus::Failed
    } else {
        RunStatus::Partial
    }
}

/// Rate per minute for `count` units over `elapsed`, zero for an empty interval.
#[must_use]
pub fn per_minute(count: f64, elapsed: Duration) -> f64 {
    let ms = elapsed.as_secs_f64() * 1_000.0;
    if ms <= 0.0 {
        0.0
    } else {
        count / ms * 60_000.0
    }
}

/// The most frequent distinct error messages across all accounts.
///
/// Sorted by count descending, ties by first appearance. Affected account ids
/// are listed once each, in input order.
#[must_use]
pub fn top_errors(account_results: &[AccountSyncResult], limit: usize) -> Vec<TopError> {
    let mut order: Vec<&str> = Vec::new();
    let mut tally: HashMap<&str, (usize, Vec<String>)> = HashMap::new();

    for account in account_results {
        for message in &account.errors {
            let entry = tally.entry(message.as_str()).or_insert_with(|| {
                order.push(message.as_str());
                (0, Vec::new())
            });
            entry.0 += 1;
            if !entry.1.contains(&account.account_id) {
                entry.1.push(account.account_id.clone());
            }
        }
    }

    let mut errors: Vec<TopError> = order
        .into_iter()
        .filter_map(|message| {
            tally.remove(message).map(|(count, account_ids)| TopError {
                message: message.to_string(),
                count,
                account_ids,
            })
        })
        .collect();

    // Stable sort keeps first-appearance order among equal counts.
    errors.sort_by(|a, b| b.count.cmp(&a.count));
    errors.truncate(limit);
    errors
}

/// Fill a result's counters, summary and status from its account outcomes.
///
/// `elapsed` is the run's monotonic duration; it drives the throughput
/// figures in the summary.
pub fn apply_account_results(
    result: &mut BatchSyncResult,
    account_results: Vec<AccountSyncResult>,
    elapsed: Duration,
) {
    let mut items = ItemCounters::default();
    let (mut successful, mut failed, mut skipped) = (0usize, 0usize, 0usize);
    let mut confidence_sum = 0.0;

    for account in &account_results {
        match account.status {
            AccountStatus::Completed => successful += 1,
            AccountStatus::Failed => failed += 1,
            AccountStatus::Skipped => skipped += 1,
        }
        items.add(&account.items);
        confidence_sum += account.confidence;
    }

    let processed = account_results.len();
    result.processed_accounts = processed;
    result.successful_accounts = successful;
    result.failed_accounts = failed;
    result.skipped_accounts = skipped;
    result.items = items;

    result.summary = ResultSummary {
        average_confidence: if processed == 0 {
            0.0
        } else {
            confidence_sum / processed as f64
        },
        accounts_per_minute: per_minute(processed as f64, elapsed),
        items_per_minute: per_minute(items.total as f64, elapsed),
        success_rate: if processed == 0 {
            0.0
        } else {
            successful as f64 / processed as f64 * 100.0
        },
        top_errors: top_errors(&account_results, TOP_ERRORS_LIMIT),
    };

    for account in &account_results {
        for warning in &account.warnings {
            result
                .warnings
                .push(format!("{}: {}", account.account_id, warning));
        }
    }

    result.account_results = account_results;
    result.status = derive_status(processed, failed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn account(id: &str, status: AccountStatus, errors: &[&str]) -> AccountSyncResult {
        let now = Utc::now();
        AccountSyncResult {
            status,
            errors: errors.iter().map(|e| e.to_string()).collect(),
            confidence: if status == AccountStatus::Failed { 0.0 } else { 0.8 },
            items: ItemCounters {
                total: 3,
                updated: 2,
                failed: 0,
                skipped: 1,
            },
            ..AccountSyncResult::failed(id, "", now, now)
        }
    }

    #[test]
    fn derive_status_covers_all_outcomes() {
        assert_eq!(derive_status(0, 0), RunStatus::Completed);
        assert_eq!(derive_status(3, 0), RunStatus::Completed);
        assert_eq!(derive_status(3, 3), RunStatus::Failed);
        assert_eq!(derive_status(3, 1), RunStatus::Partial);
    }

    #[test]
    fn per_minute_handles_zero_elapsed() {
        assert_eq!(per_minute(10.0, Duration::ZERO), 0.0);
        assert!((per_minute(1.0, Duration::from_secs(2)) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn top_errors_ranks_by_count_and_lists_accounts_once() {
        let results = vec![
            account("a", AccountStatus::Failed, &["timeout", "quota"]),
            account("b", AccountStatus::Failed, &["timeout"]),
            account("c", AccountStatus::Completed, &["quota", "quota", "auth"]),
            account("d", AccountStatus::Failed, &["timeout"]),
        ];

        let top = top_errors(&results, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].message, "timeout");
        assert_eq!(top[0].count, 3);
        assert_eq!(top[0].account_ids, vec!["a", "b", "d"]);
        assert_eq!(top[1].message, "quota");
        assert_eq!(top[1].count, 3);
        assert_eq!(top[1].account_ids, vec!["a", "c"]);
    }

    #[test]
    fn empty_run_is_completed_with_zero_success_rate() {
        let mut result = BatchSyncResult::running(Uuid::new_v4(), 0, false, Utc::now());

        apply_account_results(&mut result, Vec::new(), Duration::ZERO);

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.processed_accounts, 0);
        assert_eq!(result.summary.success_rate, 0.0);
        assert_eq!(result.summary.average_confidence, 0.0);
        assert!(!result.summary.success_rate.is_nan());
    }

    #[test]
    fn counters_add_up_and_warnings_are_prefixed() {
        let mut skipped = account("c", AccountStatus::Skipped, &[]);
        skipped.warnings.push("low confidence".to_string());
        let results = vec![
            account("a", AccountStatus::Completed, &[]),
            account("b", AccountStatus::Failed, &["boom"]),
            skipped,
        ];
        let mut result = BatchSyncResult::running(Uuid::new_v4(), 3, false, Utc::now());

        apply_account_results(&mut result, results, Duration::from_secs(60));

        assert_eq!(result.status, RunStatus::Partial);
        assert_eq!(
            result.processed_accounts,
            result.successful_accounts + result.failed_accounts + result.skipped_accounts
        );
        assert_eq!(result.items.total, 9);
        assert!((result.summary.accounts_per_minute - 3.0).abs() < 1e-9);
        assert!((result.summary.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.warnings, vec!["c: low confidence"]);
        assert_eq!(result.summary.top_errors[0].message, "boom");
    }
}
