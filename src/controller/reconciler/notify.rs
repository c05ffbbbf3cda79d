//! # Notifications
//!
//! Lifecycle notifications published as Kubernetes Events on the Migration.
//!
//! Publishing is best effort: failures are logged and never change the
//! outcome of a reconciliation.

use crate::constants::CONTROLLER_NAME;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::{debug, warn};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// Something worth telling the owner of a Migration about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The Job for the current spec completed successfully
    Succeeded { job: String },
    /// A Job was created for a Migration that had none
    JobCreated { job: String },
    /// An outdated Job was deleted and its replacement submitted
    JobReplaced { job: String },
    /// The Job failed and was removed for a fresh attempt
    JobFailed { job: String },
    /// The Migration is being deleted
    Deleting,
    /// The Migration spec cannot be turned into a Job
    InvalidSpec { message: String },
}

impl Notification {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Notification::Succeeded { .. }
            | Notification::JobCreated { .. }
            | Notification::JobReplaced { .. } => Severity::Normal,
            Notification::JobFailed { .. }
            | Notification::Deleting
            | Notification::InvalidSpec { .. } => Severity::Warning,
        }
    }

    /// Event reason, in `UpperCamelCase`
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Notification::Succeeded { .. } => "Succeeded",
            Notification::JobCreated { .. } => "JobCreated",
            Notification::JobReplaced { .. } => "JobReplaced",
            Notification::JobFailed { .. } => "JobFailed",
            Notification::Deleting => "Deleting",
            Notification::InvalidSpec { .. } => "InvalidSpec",
        }
    }

    /// Event action, the operation the controller was performing
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Notification::Succeeded { .. } => "Observe",
            Notification::JobCreated { .. } => "Create",
            Notification::JobReplaced { .. } | Notification::JobFailed { .. } => "Replace",
            Notification::Deleting => "Delete",
            Notification::InvalidSpec { .. } => "Validate",
        }
    }

    /// Human readable note for `migration` (`namespace/name`)
    #[must_use]
    pub fn note(&self, migration: &str) -> String {
        match self {
            Notification::Succeeded { job } => {
                format!("Migration succeeded: {migration} (job {job})")
            }
            Notification::JobCreated { job } => format!("Created migration job {job}"),
            Notification::JobReplaced { job } => {
                format!("Replaced outdated migration job {job}")
            }
            Notification::JobFailed { job } => {
                format!("Migration job {job} failed and was deleted")
            }
            Notification::Deleting => format!("Migration deleted: {migration}"),
            Notification::InvalidSpec { message } => format!("Invalid migration spec: {message}"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish `notification` against the Migration referenced by `target`
    async fn notify(&self, target: &ObjectReference, notification: &Notification);
}

/// Publishes notifications as Kubernetes Events
#[derive(Clone)]
pub struct EventNotifier {
    recorder: Recorder,
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier").finish_non_exhaustive()
    }
}

impl EventNotifier {
    /// `instance` identifies this controller replica, usually the pod name
    #[must_use]
    pub fn new(client: Client, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn notify(&self, target: &ObjectReference, notification: &Notification) {
        let migration = format!(
            "{}/{}",
            target.namespace.as_deref().unwrap_or_default(),
            target.name.as_deref().unwrap_or_default()
        );
        let event = Event {
            type_: match notification.severity() {
                Severity::Normal => EventType::Normal,
                Severity::Warning => EventType::Warning,
            },
            reason: notification.reason().to_string(),
            note: Some(notification.note(&migration)),
            action: notification.action().to_string(),
            secondary: None,
        };

        match self.recorder.publish(&event, target).await {
            Ok(()) => debug!(
                resource = migration.as_str(),
                reason = notification.reason(),
                "event.published"
            ),
            Err(e) => warn!(
                resource = migration.as_str(),
                reason = notification.reason(),
                error = %e,
                "Failed to publish event"
            ),
        }
    }
}
