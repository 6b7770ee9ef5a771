//! # Secret Lookup
//!
//! Namespaced Secret access for client builders.

use super::error::{ClientBuildError, LookupError};
use crate::crd::SecretKeySelector;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use tracing::debug;

/// Read access to Secrets, with "not found" distinguishable from other failures
#[async_trait]
pub trait SecretLookup: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, LookupError>;
}

/// Secret lookup backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretLookup {
    client: Client,
}

impl std::fmt::Debug for KubeSecretLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretLookup").finish_non_exhaustive()
    }
}

impl KubeSecretLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretLookup for KubeSecretLookup {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, LookupError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        debug!(secret.namespace = namespace, secret.name = name, "Looking up secret");
        match api.get_opt(name).await {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) => Err(LookupError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(source) => Err(LookupError::Api {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Read one key of a referenced Secret as UTF-8
///
/// A missing Secret maps to [`ClientBuildError::MissingSecret`]; a missing key
/// or non-UTF-8 value is a construction error, since waiting will not fix it.
pub async fn resolve_secret_value(
    secrets: &dyn SecretLookup,
    namespace: &str,
    selector: &SecretKeySelector,
    default_key: &str,
) -> Result<String, ClientBuildError> {
    let secret = secrets.get(namespace, &selector.name).await?;
    let key = selector.key.as_deref().unwrap_or(default_key);

    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.clone())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .map(|value| value.clone().into_bytes())
        })
        .ok_or_else(|| {
            ClientBuildError::Init(format!(
                "secret {}/{} does not contain key \"{}\"",
                namespace, selector.name, key
            ))
        })?;

    let value = String::from_utf8(bytes).map_err(|e| {
        ClientBuildError::Init(format!(
            "secret {}/{} key \"{}\" is not valid UTF-8: {}",
            namespace, selector.name, key, e
        ))
    })?;
    Ok(value.trim().to_string())
}
