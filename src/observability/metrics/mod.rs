//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text rendering
//! - `controller_metrics` - Reconciliations, status reports, events, requeues
//! - `processing_metrics` - Client construction, signing calls, issued certificates

pub mod controller_metrics;
pub mod processing_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use processing_metrics::*;
pub use registry::*;
