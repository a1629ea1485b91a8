use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indexing and answering activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    chunks_dropped: AtomicU64,
    questions_answered: AtomicU64,
    answers_degraded: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a built index: chunks kept and chunks dropped after embedding failures.
    pub fn record_index(&self, indexed: u64, dropped: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.chunks_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Record one answered question; `degraded` marks a sentinel produced by a failed upstream.
    pub fn record_answer(&self, degraded: bool) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.answers_degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            answers_degraded: self.answers_degraded.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents indexed since startup.
    pub documents_indexed: u64,
    /// Chunks embedded successfully across all indexes.
    pub chunks_indexed: u64,
    /// Chunks left out after embedding failures.
    pub chunks_dropped: u64,
    /// Questions answered, including sentinel answers.
    pub questions_answered: u64,
    /// Answers that fell back to the sentinel because an upstream call failed.
    pub answers_degraded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_indexes_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_index(2, 0);
        metrics.record_index(3, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_indexed, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.chunks_dropped, 1);
    }

    #[test]
    fn degraded_answers_are_counted_separately() {
        let metrics = PipelineMetrics::new();
        metrics.record_answer(false);
        metrics.record_answer(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.questions_answered, 2);
        assert_eq!(snapshot.answers_degraded, 1);
    }

    #[test]
    fn fresh_snapshot_is_zeroed() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
