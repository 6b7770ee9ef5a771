//! # CRD Generator
//!
//! Prints the `CertificateRequest` and `VaultIssuer` CustomResourceDefinitions
//! as a multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/crds.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use certificate_request_controller::{CertificateRequest, VaultIssuer};
use kube::CustomResourceExt;

fn main() {
    for crd in [CertificateRequest::crd(), VaultIssuer::crd()] {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => print!("---\n{yaml}"),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
