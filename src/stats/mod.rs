use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub records_queued: usize,
    pub records_processed: usize,
    pub records_rejected: usize,
    pub broken_tasks: usize,
}

/// Shared run counters, updated by the launcher and the pipeline.
#[derive(Debug, Clone)]
pub struct StatsTracker {
    stats: Arc<RwLock<CrawlStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(CrawlStats {
                start_time: Utc::now(),
                end_time: None,
                records_queued: 0,
                records_processed: 0,
                records_rejected: 0,
                broken_tasks: 0,
            })),
        }
    }

    pub fn record_queued(&self) {
        self.stats.write().records_queued += 1;
    }

    pub fn record_processed(&self) {
        self.stats.write().records_processed += 1;
    }

    pub fn record_rejected(&self) {
        self.stats.write().records_rejected += 1;
    }

    pub fn record_broken_task(&self) {
        self.stats.write().broken_tasks += 1;
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> CrawlStats {
        self.stats.read().clone()
    }

    pub fn print_summary(&self) {
        let stats = self.stats.read();
        let duration = stats
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(stats.start_time);

        println!("\nCrawl Statistics:");
        println!("=================");
        println!("Duration: {} seconds", duration.num_seconds());
        println!("Records Queued: {}", stats.records_queued);
        println!("Records Processed: {}", stats.records_processed);
        println!("Records Rejected: {}", stats.records_rejected);
        println!("Broken Tasks: {}", stats.broken_tasks);
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
