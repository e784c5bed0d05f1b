//! Prometheus metrics for the signing guard.

use aegis_metrics::TimingGuard;

/// Increment the refused-signings counter for one violation kind.
pub fn inc_signing_refused(kind: &str) {
    static AEGIS_SIGNING_REFUSED_TOTAL: std::sync::LazyLock<prometheus::IntCounterVec> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter_vec!(
                "aegis_signing_refused_total",
                "Count of signing requests refused by the protection guard",
                &["violation"]
            )
            .unwrap()
        });
    AEGIS_SIGNING_REFUSED_TOTAL
        .with_label_values(&[kind])
        .inc();
}

/// Increment the recorded-blocks counter.
pub fn inc_blocks_recorded() {
    static AEGIS_BLOCKS_RECORDED_TOTAL: std::sync::LazyLock<prometheus::IntCounter> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter!(
                "aegis_blocks_recorded_total",
                "Count of block signatures committed to the protection store"
            )
            .unwrap()
        });
    AEGIS_BLOCKS_RECORDED_TOTAL.inc();
}

/// Increment the recorded-attestations counter.
pub fn inc_attestations_recorded() {
    static AEGIS_ATTESTATIONS_RECORDED_TOTAL: std::sync::LazyLock<prometheus::IntCounter> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter!(
                "aegis_attestations_recorded_total",
                "Count of attestation signatures committed to the protection store"
            )
            .unwrap()
        });
    AEGIS_ATTESTATIONS_RECORDED_TOTAL.inc();
}

/// Time one block pre-sign check.
pub fn block_check_timer() -> TimingGuard {
    static AEGIS_BLOCK_CHECK_TIME_SECONDS: std::sync::LazyLock<prometheus::Histogram> =
        std::sync::LazyLock::new(|| {
            prometheus::register_histogram!(
                "aegis_block_check_time_seconds",
                "Duration of block pre-sign validation",
                vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]
            )
            .unwrap()
        });
    TimingGuard::new(&AEGIS_BLOCK_CHECK_TIME_SECONDS)
}

/// Time one attestation pre-sign check.
pub fn attestation_check_timer() -> TimingGuard {
    static AEGIS_ATTESTATION_CHECK_TIME_SECONDS: std::sync::LazyLock<prometheus::Histogram> =
        std::sync::LazyLock::new(|| {
            prometheus::register_histogram!(
                "aegis_attestation_check_time_seconds",
                "Duration of attestation pre-sign validation",
                vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]
            )
            .unwrap()
        });
    TimingGuard::new(&AEGIS_ATTESTATION_CHECK_TIME_SECONDS)
}
