//! # Events
//!
//! Kubernetes Event recording for certificate requests.
//!
//! Events are fire-and-forget: `publish()` never blocks reconciliation and
//! never returns an error. The Kubernetes-backed publisher hands the API call
//! to the tokio runtime and logs failures as warnings.

use crate::observability::metrics;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Action recorded on every event this controller emits
pub const ACTION_SIGN: &str = "Sign";

/// Sink for user-visible notifications about a resource
///
/// Implementations must be safe to share between reconcile workers.
pub trait EventPublisher: Send + Sync {
    /// Publish an event on the given resource
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "MissingSecret")
    /// * `note` - Human-readable message
    fn publish(&self, resource_ref: &ObjectReference, type_: EventType, reason: &str, note: &str);
}

/// Short name for an event type, as shown by `kubectl get events`
pub fn event_type_str(type_: &EventType) -> &'static str {
    match type_ {
        EventType::Normal => "Normal",
        EventType::Warning => "Warning",
    }
}

/// Production implementation wrapping `kube::runtime::events::Recorder`
#[derive(Clone)]
pub struct KubeEventPublisher {
    recorder: Arc<Recorder>,
}

impl std::fmt::Debug for KubeEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventPublisher").finish_non_exhaustive()
    }
}

impl KubeEventPublisher {
    /// Create a new publisher for the given controller name
    ///
    /// The controller name appears as the "reportingComponent" on Events.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: None,
        };
        Self {
            recorder: Arc::new(Recorder::new(client, reporter)),
        }
    }
}

impl EventPublisher for KubeEventPublisher {
    fn publish(&self, resource_ref: &ObjectReference, type_: EventType, reason: &str, note: &str) {
        metrics::increment_events_emitted(event_type_str(&type_), reason);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(reason, "No tokio runtime available, dropping Kubernetes event");
            return;
        };
        let recorder = Arc::clone(&self.recorder);
        let resource_ref = resource_ref.clone();
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note.to_string()),
            action: ACTION_SIGN.to_string(),
            secondary: None,
        };
        runtime.spawn(async move {
            if let Err(e) = recorder.publish(&event, &resource_ref).await {
                warn!(
                    reason = %event.reason,
                    resource.name = resource_ref.name.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "Failed to publish Kubernetes event"
                );
            }
        });
    }
}

/// In-memory publisher that records `"<Type> <Reason> <note>"` lines
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, in emission order
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, _resource_ref: &ObjectReference, type_: EventType, reason: &str, note: &str) {
        metrics::increment_events_emitted(event_type_str(&type_), reason);
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{} {} {}", event_type_str(&type_), reason, note));
    }
}
