//! # Providers
//!
//! Issuer backends the controller signs requests with.

pub mod vault;

pub use vault::{
    ClientBuildError, ClientBuilder, FailureKind, KubeSecretLookup, LookupError, SecretLookup,
    SignedCertificate, SigningClient, SigningError,
};
