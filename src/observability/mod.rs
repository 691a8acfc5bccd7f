//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling produces:
//!     → logging.rs (tracing events with target URL and cause)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tower-http TraceLayer spans, tagged with x-request-id
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → optional Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
