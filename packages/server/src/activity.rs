//! Audit events published for every bag lifecycle action.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::{FileId, FileResolver, StorageError};
use serde::Serialize;
use thiserror::Error;

pub const ACTIVITY_APP: &str = "bagit";
pub const ACTIVITY_TYPE: &str = "bagit";
pub const OBJECT_TYPE_FILES: &str = "files";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Create,
    Update,
    Validate,
    Delete,
}

impl ActivityAction {
    /// Translatable subject key of the event.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Create => "create_bagit_subject",
            Self::Update => "update_bagit_subject",
            Self::Validate => "validate_bagit_subject",
            Self::Delete => "delete_bagit_subject",
        }
    }
}

/// A structured activity entry, shaped for the host's activity stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub app: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub affected_user: String,
    pub author: String,
    pub subject: String,
    /// `[user, path]` in that order.
    pub subject_params: Vec<String>,
    pub object_type: String,
    pub object_id: i64,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(user_id: &str, action: ActivityAction, file_id: FileId, path: String) -> Self {
        Self {
            app: ACTIVITY_APP.into(),
            kind: ACTIVITY_TYPE.into(),
            affected_user: user_id.into(),
            author: user_id.into(),
            subject: action.subject().into(),
            subject_params: vec![user_id.into(), path],
            object_type: OBJECT_TYPE_FILES.into(),
            object_id: file_id.0,
            timestamp: Utc::now(),
        }
    }

    /// Routing key for sinks that fan out by action.
    pub fn topic(&self) -> &str {
        &self.subject
    }
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("cannot resolve file {0} for activity")]
    UnresolvedFile(FileId),

    #[error("file resolution failed: {0}")]
    Resolve(#[from] StorageError),

    #[error("publish failed: {0}")]
    Publish(String),
}

/// Sink for finished activity events.
#[async_trait]
pub trait ActivityPublisher: Send + Sync {
    async fn publish(&self, event: ActivityEvent) -> Result<(), ActivityError>;
}

/// Writes each event as a structured log record on target `bagit::activity`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityPublisher;

#[async_trait]
impl ActivityPublisher for TracingActivityPublisher {
    async fn publish(&self, event: ActivityEvent) -> Result<(), ActivityError> {
        let payload =
            serde_json::to_string(&event).map_err(|e| ActivityError::Publish(e.to_string()))?;
        tracing::info!(
            target: "bagit::activity",
            topic = event.topic(),
            user = %event.affected_user,
            object_id = event.object_id,
            payload = %payload,
            "Activity published"
        );
        Ok(())
    }
}

/// Builds activity events for lifecycle actions and hands them to a publisher.
#[derive(Clone)]
pub struct AuditEventEmitter {
    resolver: Arc<dyn FileResolver>,
    publisher: Arc<dyn ActivityPublisher>,
}

impl AuditEventEmitter {
    pub fn new(resolver: Arc<dyn FileResolver>, publisher: Arc<dyn ActivityPublisher>) -> Self {
        Self {
            resolver,
            publisher,
        }
    }

    pub async fn emit(
        &self,
        user_id: &str,
        action: ActivityAction,
        file_id: FileId,
    ) -> Result<(), ActivityError> {
        let file = self
            .resolver
            .resolve(user_id, file_id)
            .await?
            .ok_or(ActivityError::UnresolvedFile(file_id))?;

        let event = ActivityEvent::new(user_id, action, file_id, file.internal_path);
        self.publisher.publish(event).await
    }
}
