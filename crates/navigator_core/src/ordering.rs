use std::{cmp::Ordering, collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::{domain::RecordId, protocol::Record};
use tracing::{warn, Span};

use crate::config::CategoryRanks;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    Truncate,
    AtLeastOne,
    /// Floor of the spread divided by the number of gaps between container
    /// rows, never below 1. An evenly spaced container dropped back in its
    /// original order plans exactly its stored priorities.
    #[default]
    Span,
}

impl FromStr for StepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "at_least_one" => Ok(Self::AtLeastOne),
            "span" => Ok(Self::Span),
            other => Err(format!("unknown step policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    #[default]
    StopOnFailure,
    BestEffort,
}

impl FromStr for PersistPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop_on_failure" => Ok(Self::StopOnFailure),
            "best_effort" => Ok(Self::BestEffort),
            other => Err(format!("unknown persist policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityChange {
    pub id: RecordId,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityPlan {
    pub min_priority: i64,
    pub max_priority: i64,
    pub step: i64,
    pub assignments: Vec<(RecordId, i64)>,
}

impl PriorityPlan {
    /// Assignments whose target differs from the stored priority. Ids missing
    /// from `records` are skipped.
    pub fn changes(&self, records: &[Record]) -> Vec<PriorityChange> {
        self.assignments
            .iter()
            .filter_map(|(id, to)| {
                let record = records.iter().find(|r| r.id == *id)?;
                (record.priority != *to).then_some(PriorityChange {
                    id: *id,
                    from: record.priority,
                    to: *to,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub step: i64,
    pub persisted: Vec<PriorityChange>,
    pub resorted: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingEngine {
    step_policy: StepPolicy,
    persist_policy: PersistPolicy,
}

impl OrderingEngine {
    pub fn new(step_policy: StepPolicy, persist_policy: PersistPolicy) -> Self {
        Self {
            step_policy,
            persist_policy,
        }
    }

    pub fn persist_policy(&self) -> PersistPolicy {
        self.persist_policy
    }

    /// Plans priorities for `container`, the ids of one drop container in their
    /// new visual order. Returns `None` when none of them is in `records`, or
    /// when the planned priorities would overflow `i64`.
    pub fn plan(&self, records: &[Record], container: &[RecordId]) -> Option<PriorityPlan> {
        let count = i64::try_from(container.len()).ok().filter(|c| *c > 0)?;

        let (min_priority, max_priority) = container
            .iter()
            .filter_map(|id| records.iter().find(|r| r.id == *id))
            .fold(None, |bounds: Option<(i64, i64)>, record| {
                Some(match bounds {
                    None => (record.priority, record.priority),
                    Some((lo, hi)) => (lo.min(record.priority), hi.max(record.priority)),
                })
            })?;

        let max_priority = max_priority.max(min_priority.saturating_add(count));
        let spread = max_priority.checked_sub(min_priority)?;
        let step = match self.step_policy {
            StepPolicy::Truncate => spread.div_euclid(count),
            StepPolicy::AtLeastOne => spread.div_euclid(count).max(1),
            StepPolicy::Span => spread.div_euclid((count - 1).max(1)).max(1),
        };

        // Priorities that cannot be spread within i64 get no plan at all.
        let assignments = container
            .iter()
            .zip(0_i64..)
            .map(|(id, slot)| {
                let priority = step.checked_mul(slot)?.checked_add(min_priority)?;
                Some((*id, priority))
            })
            .collect::<Option<Vec<_>>>()?;

        Some(PriorityPlan {
            min_priority,
            max_priority,
            step,
            assignments,
        })
    }
}

pub fn compare_records(a: &Record, b: &Record, ranks: &CategoryRanks) -> Ordering {
    b.valid
        .cmp(&a.valid)
        .then_with(|| {
            let a_rank = ranks.rank(&a.category).unwrap_or(i64::MAX);
            let b_rank = ranks.rank(&b.category).unwrap_or(i64::MAX);
            a_rank.cmp(&b_rank)
        })
        .then_with(|| a.priority.cmp(&b.priority))
}

pub fn resort_by_rank(mut records: Vec<Record>, ranks: &CategoryRanks, span: &Span) -> Vec<Record> {
    let unranked: BTreeSet<&str> = records
        .iter()
        .filter(|r| ranks.rank(&r.category).is_none())
        .map(|r| r.category.as_str())
        .collect();
    if !unranked.is_empty() {
        warn!(
            parent: span,
            categories = ?unranked,
            "resort: categories without a rank are placed last"
        );
    }

    records.sort_by(|a, b| compare_records(a, b, ranks));
    records
}

#[cfg(test)]
#[path = "tests/ordering_tests.rs"]
mod tests;
