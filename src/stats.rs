//! Call-log aggregation for the statistics and dashboard screens
//!
//! Everything here is a pure reduction over already-fetched logs; the
//! summary endpoint (when the backend provides one) decodes into the same
//! shapes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CallLog, CallResult, NeedHuman};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultHistogram {
    #[serde(alias = "notPossible", default)]
    pub not_possible: u32,
    #[serde(alias = "noActionNeeded", default)]
    pub no_action_needed: u32,
    #[serde(alias = "deepDiveNeeded", default)]
    pub deep_dive_needed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedHumanHistogram {
    #[serde(default)]
    pub none: u32,
    #[serde(default)]
    pub requested: u32,
    #[serde(default)]
    pub critical: u32,
}

/// One row of a top-N type frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub index: u8,
    pub label: String,
    pub count: u32,
}

/// Full reduction of a set of call logs
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallStats {
    pub total_consultations: usize,
    pub successful_consultations: usize,
    /// Percentage: (no-action-needed + deep-dive-needed) / total
    pub success_rate: f64,
    pub by_result: ResultHistogram,
    pub by_need_human: NeedHumanHistogram,
    /// Seconds
    pub average_runtime: f64,
    pub aggregated_risk_counts: BTreeMap<u8, u32>,
    pub aggregated_desire_counts: BTreeMap<u8, u32>,
}

/// Reduce logs into the statistics screen's numbers
pub fn reduce(logs: &[CallLog]) -> CallStats {
    if logs.is_empty() {
        return CallStats::default();
    }

    let total = logs.len();
    let mut stats = CallStats {
        total_consultations: total,
        ..CallStats::default()
    };

    let mut total_runtime: u64 = 0;
    for log in logs {
        match log.result {
            CallResult::NotPossible => stats.by_result.not_possible += 1,
            CallResult::NoActionNeeded => stats.by_result.no_action_needed += 1,
            CallResult::DeepDiveNeeded => stats.by_result.deep_dive_needed += 1,
        }
        match log.need_human {
            NeedHuman::None => stats.by_need_human.none += 1,
            NeedHuman::Requested => stats.by_need_human.requested += 1,
            NeedHuman::Critical => stats.by_need_human.critical += 1,
        }
        total_runtime += u64::from(log.runtime);

        if let Some(delta) = &log.result_vulnerabilities {
            accumulate_counts(&mut stats.aggregated_risk_counts, &delta.risk_index_count);
            accumulate_counts(&mut stats.aggregated_desire_counts, &delta.desire_index_count);
        }
    }

    stats.successful_consultations = logs.iter().filter(|l| l.result.is_success()).count();
    stats.success_rate = (stats.successful_consultations as f64 / total as f64) * 100.0;
    stats.average_runtime = total_runtime as f64 / total as f64;
    stats
}

fn accumulate_counts(acc: &mut BTreeMap<u8, u32>, counts: &BTreeMap<String, u32>) {
    for (index, count) in counts {
        // The backend stringifies the type index; unparsable keys are dropped
        if let Ok(index) = index.parse::<u8>() {
            *acc.entry(index).or_insert(0) += count;
        } else {
            tracing::warn!("ignoring non-numeric type index in counts: {}", index);
        }
    }
}

/// Distinct outreach rounds present in the logs, ascending
pub fn rounds(logs: &[CallLog]) -> Vec<u32> {
    let mut rounds: Vec<u32> = logs.iter().map(|l| l.s_index).collect();
    rounds.sort_unstable();
    rounds.dedup();
    rounds
}

/// Logs restricted to one round; `None` keeps everything
pub fn filter_round(logs: &[CallLog], round: Option<u32>) -> Vec<CallLog> {
    match round {
        None => logs.to_vec(),
        Some(r) => logs.iter().filter(|l| l.s_index == r).cloned().collect(),
    }
}

/// Logs dated `today` (backend timestamps are UTC)
pub fn today_count(logs: &[CallLog], today: NaiveDate) -> usize {
    logs.iter().filter(|l| l.time.date_naive() == today).count()
}

/// Top-N frequency table: count descending, then type index ascending so
/// ties order the same everywhere
pub fn top_types(
    counts: &BTreeMap<u8, u32>,
    label: impl Fn(u8) -> String,
    n: usize,
) -> Vec<TypeCount> {
    let mut rows: Vec<TypeCount> = counts
        .iter()
        .map(|(&index, &count)| TypeCount {
            index,
            label: label(index),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then(a.index.cmp(&b.index)));
    rows.truncate(n);
    rows
}

/// Pre-aggregated summary served by `GET /api/dashboard/summary`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardSummary {
    #[serde(alias = "todayCount", default)]
    pub today_count: u64,
    #[serde(alias = "totalCount", default)]
    pub total_count: u64,
    #[serde(alias = "byResult", default)]
    pub by_result: ResultHistogram,
    #[serde(alias = "successRate", default)]
    pub success_rate: f64,
    #[serde(alias = "aggregatedRiskCounts", default)]
    pub aggregated_risk_counts: BTreeMap<String, u32>,
    #[serde(alias = "aggregatedDesireCounts", default)]
    pub aggregated_desire_counts: BTreeMap<String, u32>,
}

impl DashboardSummary {
    /// Build the same summary client-side when the endpoint is unavailable
    pub fn from_logs(logs: &[CallLog], today: NaiveDate) -> Self {
        let stats = reduce(logs);
        Self {
            today_count: today_count(logs, today) as u64,
            total_count: logs.len() as u64,
            by_result: stats.by_result,
            success_rate: stats.success_rate,
            aggregated_risk_counts: stringify_keys(&stats.aggregated_risk_counts),
            aggregated_desire_counts: stringify_keys(&stats.aggregated_desire_counts),
        }
    }
}

fn stringify_keys(counts: &BTreeMap<u8, u32>) -> BTreeMap<String, u32> {
    counts.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn log(result: u8, need_human: u8, s_index: u32, runtime: u32) -> CallLog {
        serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "s_index": s_index,
            "time": "2025-05-01T09:00:00Z",
            "runtime": runtime,
            "result": result,
            "need_human": need_human
        }))
        .unwrap()
    }

    fn log_with_counts(risk: &[(&str, u32)], desire: &[(&str, u32)]) -> CallLog {
        let mut l = log(1, 0, 1, 60);
        let mut delta = crate::models::VulnerabilityDelta::default();
        for (k, v) in risk {
            delta.risk_index_count.insert((*k).to_string(), *v);
        }
        for (k, v) in desire {
            delta.desire_index_count.insert((*k).to_string(), *v);
        }
        l.result_vulnerabilities = Some(delta);
        l
    }

    #[test]
    fn test_result_histogram_and_success_rate() {
        let logs = vec![log(0, 0, 1, 30), log(1, 0, 1, 60), log(1, 1, 1, 90), log(2, 2, 1, 120)];
        let stats = reduce(&logs);

        assert_eq!(stats.by_result.not_possible, 1);
        assert_eq!(stats.by_result.no_action_needed, 2);
        assert_eq!(stats.by_result.deep_dive_needed, 1);
        assert!((stats.success_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(stats.successful_consultations, 3);
        assert!((stats.average_runtime - 75.0).abs() < f64::EPSILON);
        assert_eq!(stats.by_need_human.none, 2);
        assert_eq!(stats.by_need_human.requested, 1);
        assert_eq!(stats.by_need_human.critical, 1);
    }

    #[test]
    fn test_empty_logs() {
        let stats = reduce(&[]);
        assert_eq!(stats.total_consultations, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_runtime, 0.0);
    }

    #[test]
    fn test_counts_sum_across_logs() {
        let logs = vec![
            log_with_counts(&[("1", 2), ("3", 1)], &[("2", 1)]),
            log_with_counts(&[("1", 1)], &[("2", 2), ("6", 1)]),
        ];
        let stats = reduce(&logs);
        assert_eq!(stats.aggregated_risk_counts.get(&1), Some(&3));
        assert_eq!(stats.aggregated_risk_counts.get(&3), Some(&1));
        assert_eq!(stats.aggregated_desire_counts.get(&2), Some(&3));
        assert_eq!(stats.aggregated_desire_counts.get(&6), Some(&1));
    }

    #[test]
    fn test_rounds_and_round_filter() {
        let logs = vec![log(1, 0, 2, 10), log(1, 0, 1, 10), log(0, 0, 2, 10)];
        assert_eq!(rounds(&logs), vec![1, 2]);
        assert_eq!(filter_round(&logs, Some(2)).len(), 2);
        assert_eq!(filter_round(&logs, None).len(), 3);
    }

    #[test]
    fn test_today_count() {
        let mut a = log(1, 0, 1, 10);
        a.time = Utc.with_ymd_and_hms(2025, 5, 1, 23, 0, 0).unwrap();
        let mut b = log(1, 0, 1, 10);
        b.time = Utc.with_ymd_and_hms(2025, 4, 30, 10, 0, 0).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(today_count(&[a, b], today), 1);
    }

    #[test]
    fn test_top_types_deterministic_tie_order() {
        let mut counts = BTreeMap::new();
        counts.insert(5u8, 3u32);
        counts.insert(2u8, 7u32);
        counts.insert(1u8, 3u32);
        counts.insert(8u8, 1u32);

        let top = top_types(&counts, |i| format!("type {}", i), 3);
        let order: Vec<(u8, u32)> = top.iter().map(|t| (t.index, t.count)).collect();
        // Ties on count resolve by ascending index
        assert_eq!(order, vec![(2, 7), (1, 3), (5, 3)]);
    }

    #[test]
    fn test_dashboard_summary_fallback() {
        let logs = vec![log(0, 0, 1, 30), log(1, 0, 1, 60), log(1, 0, 1, 60), log(2, 0, 1, 60)];
        let summary = DashboardSummary::from_logs(&logs, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.today_count, 4);
        assert_eq!(summary.by_result.no_action_needed, 2);
        assert!((summary.success_rate - 75.0).abs() < f64::EPSILON);
    }
}
