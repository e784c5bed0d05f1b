//! Metrics utilities and prometheus re-exports for the aegis workspace.

mod gather;
mod timing;

// Re-export prometheus types and macros we use
pub use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Error as PrometheusError, TextEncoder, gather, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
};

pub use gather::{GatherError, gather_default_metrics};
pub use timing::TimingGuard;
