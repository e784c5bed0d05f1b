//! Prometheus metrics for the span detector.

use aegis_metrics::TimingGuard;

/// Time one attestation ingest end-to-end.
pub fn ingest_timer() -> TimingGuard {
    static AEGIS_SLASHER_INGEST_TIME_SECONDS: std::sync::LazyLock<prometheus::Histogram> =
        std::sync::LazyLock::new(|| {
            prometheus::register_histogram!(
                "aegis_slasher_ingest_time_seconds",
                "Duration to ingest one network attestation",
                vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]
            )
            .unwrap()
        });
    TimingGuard::new(&AEGIS_SLASHER_INGEST_TIME_SECONDS)
}

/// Increment the ingested-attestations counter.
pub fn inc_attestations_ingested() {
    static AEGIS_SLASHER_ATTESTATIONS_INGESTED_TOTAL: std::sync::LazyLock<prometheus::IntCounter> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter!(
                "aegis_slasher_attestations_ingested_total",
                "Count of network attestations ingested by the span detector"
            )
            .unwrap()
        });
    AEGIS_SLASHER_ATTESTATIONS_INGESTED_TOTAL.inc();
}

/// Increment the detected-offenses counter for one offense kind.
pub fn inc_offenses_detected(kind: &str) {
    static AEGIS_SLASHER_OFFENSES_DETECTED_TOTAL: std::sync::LazyLock<prometheus::IntCounterVec> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter_vec!(
                "aegis_slasher_offenses_detected_total",
                "Count of slashable offenses detected",
                &["kind"]
            )
            .unwrap()
        });
    AEGIS_SLASHER_OFFENSES_DETECTED_TOTAL
        .with_label_values(&[kind])
        .inc();
}

/// Increment the span-cache hit counter.
pub fn inc_span_cache_hit() {
    static AEGIS_SLASHER_SPAN_CACHE_HITS_TOTAL: std::sync::LazyLock<prometheus::IntCounter> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter!(
                "aegis_slasher_span_cache_hits_total",
                "Count of span lookups served from the cache"
            )
            .unwrap()
        });
    AEGIS_SLASHER_SPAN_CACHE_HITS_TOTAL.inc();
}

/// Increment the span-cache miss counter.
pub fn inc_span_cache_miss() {
    static AEGIS_SLASHER_SPAN_CACHE_MISSES_TOTAL: std::sync::LazyLock<prometheus::IntCounter> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter!(
                "aegis_slasher_span_cache_misses_total",
                "Count of span lookups that reloaded from the store"
            )
            .unwrap()
        });
    AEGIS_SLASHER_SPAN_CACHE_MISSES_TOTAL.inc();
}
