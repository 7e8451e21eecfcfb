//! Viewer-side filters for transaction history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of a transaction the viewed account sat on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money arrived: a deposit, or a transfer in.
    Inbound,
    /// Money left: a withdrawal, or a transfer out.
    Outbound,
}

/// Inclusive time window. Open ends match everything on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// History filter as submitted by a viewer. All criteria are conjunctive;
/// the default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Case-insensitive substring matched against the transaction message
    /// and the names attached to the entry.
    pub search: Option<String>,
    pub direction: Option<Direction>,
    pub range: DateRange,
}

impl TransactionFilter {
    pub fn matches(
        &self,
        direction: Direction,
        occurred_at: DateTime<Utc>,
        haystacks: &[&str],
    ) -> bool {
        if let Some(wanted) = self.direction {
            if wanted != direction {
                return false;
            }
        }
        if !self.range.contains(occurred_at) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                haystacks
                    .iter()
                    .any(|text| text.to_lowercase().contains(&needle))
            }
        }
    }
}
