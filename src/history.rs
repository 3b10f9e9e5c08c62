//! Append-only trade history log.
//!
//! Every executed or attempted leg lands here, one entry per leg. The log
//! lives behind a single `RwLock` writer, which serializes concurrent
//! appends from multiple job tasks; reads page over a consistent snapshot.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::{JobId, TradeHistoryEntry};

/// One page of history entries plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<TradeHistoryEntry>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// In-memory append-only log of trade legs.
#[derive(Default)]
pub struct TradeHistoryLog {
    entries: RwLock<Vec<TradeHistoryEntry>>,
}

impl TradeHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one leg record.
    pub fn append(&self, entry: TradeHistoryEntry) {
        self.entries.write().push(entry);
    }

    /// Number of recorded legs across all jobs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Page through the log, optionally filtered by job id.
    ///
    /// `page` is 1-based; a zero page is treated as the first page.
    pub fn query(&self, job_filter: Option<&JobId>, page: usize, page_size: usize) -> HistoryPage {
        let entries = self.entries.read();
        let matching: Vec<&TradeHistoryEntry> = entries
            .iter()
            .filter(|e| job_filter.map_or(true, |id| &e.job_id == id))
            .collect();

        let total = matching.len();
        let page = page.max(1);
        let start = (page - 1) * page_size;
        let page_entries = matching
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        HistoryPage {
            entries: page_entries,
            total,
            page,
            page_size,
        }
    }

    /// All entries for one job, in append order.
    pub fn entries_for_job(&self, job_id: &JobId) -> Vec<TradeHistoryEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| &e.job_id == job_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LegStatus, TradeLeg};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn entry(job_id: &JobId, leg: TradeLeg) -> TradeHistoryEntry {
        TradeHistoryEntry {
            job_id: job_id.clone(),
            timestamp: Utc::now(),
            token_mint: "Mint".to_string(),
            leg,
            amount: dec!(0.05),
            fee: dec!(0.001),
            status: LegStatus::Confirmed,
            signature: Some("sig".to_string()),
        }
    }

    #[test]
    fn append_and_filter_by_job() {
        let log = TradeHistoryLog::new();
        let a = JobId::generate();
        let b = JobId::generate();
        for _ in 0..3 {
            log.append(entry(&a, TradeLeg::Buy));
        }
        log.append(entry(&b, TradeLeg::Sell));

        assert_eq!(log.len(), 4);
        let page = log.query(Some(&a), 1, 50);
        assert_eq!(page.total, 3);
        assert_eq!(page.entries.len(), 3);

        let all = log.query(None, 1, 50);
        assert_eq!(all.total, 4);
    }

    #[test]
    fn pagination_math() {
        let log = TradeHistoryLog::new();
        let id = JobId::generate();
        for _ in 0..25 {
            log.append(entry(&id, TradeLeg::Buy));
        }

        let first = log.query(None, 1, 10);
        assert_eq!(first.entries.len(), 10);
        assert_eq!(first.total, 25);

        let last = log.query(None, 3, 10);
        assert_eq!(last.entries.len(), 5);

        let beyond = log.query(None, 4, 10);
        assert!(beyond.entries.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn zero_page_means_first_page() {
        let log = TradeHistoryLog::new();
        let id = JobId::generate();
        log.append(entry(&id, TradeLeg::Buy));
        let page = log.query(None, 0, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.entries.len(), 1);
    }
}
