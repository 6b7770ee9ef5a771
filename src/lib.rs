//! # Certificate Request Controller
//!
//! A Kubernetes controller that signs `CertificateRequest` resources with a
//! Vault PKI issuer and reports progress on the request status.
//!
//! ## Overview
//!
//! 1. **Watch requests** - `CertificateRequest` resources in all namespaces
//! 2. **Resolve the issuer** - the `VaultIssuer` named by `spec.issuerRef`
//! 3. **Sign** - through a [`provider::ClientBuilder`] supplied by the embedding binary
//! 4. **Report** - a single `Ready` condition plus Kubernetes events
//!
//! Missing Secrets and missing issuers leave the request `Pending` and are
//! retried on the periodic resync. Client construction errors are retried with
//! Fibonacci backoff. Signing errors mark the request `Failed` until its spec
//! changes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! # use certificate_request_controller::provider::ClientBuilder;
//! # async fn example(builder: Arc<dyn ClientBuilder>) -> anyhow::Result<()> {
//! certificate_request_controller::runtime::run(builder).await
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod events;
pub mod observability;
pub mod provider;
pub mod runtime;

pub use crd::*;
