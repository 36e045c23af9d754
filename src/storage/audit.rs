// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only audit trails.
//!
//! Two streams are kept, each as daily JSONL files:
//!
//! - `access`: one [`AccessLogEntry`] per vendor facility invocation
//! - `files`: one [`FileAuditEvent`] per upload, download attempt or revocation
//!
//! Recording is best-effort: [`AuditRepository::record_access`] and
//! [`AuditRepository::record_file_event`] never fail the caller. The
//! business operation's outcome is authoritative; a failed audit write is
//! reported through `tracing` instead.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

use super::paths::{ACCESS_LOG_STREAM, FILE_AUDIT_STREAM};
use super::{FsStorage, StorageError, StorageResult};

/// Session id recorded for attempts that never obtained a session.
pub const UNAUTHENTICATED_SESSION: &str = "unauthenticated";

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Success,
    Failed,
}

/// One vendor facility invocation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessLogEntry {
    /// Unique entry ID.
    pub entry_id: String,
    /// Session used, or [`UNAUTHENTICATED_SESSION`].
    pub session_id: String,
    /// End user on whose behalf the facility was invoked (as supplied).
    pub user_email: String,
    /// Vendor name, or the presented vendor email when authentication failed.
    pub vendor_name: String,
    /// Facility invoked, e.g. `balance_check`.
    pub facility_used: String,
    pub status: AccessStatus,
    pub access_time: DateTime<Utc>,
    /// Failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AccessLogEntry {
    /// Create a successful entry stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        user_email: impl Into<String>,
        vendor_name: impl Into<String>,
        facility_used: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_email: user_email.into(),
            vendor_name: vendor_name.into(),
            facility_used: facility_used.into(),
            status: AccessStatus::Success,
            access_time: Utc::now(),
            detail: None,
        }
    }

    /// Mark as failed with a reason.
    pub fn failed(mut self, detail: impl Into<String>) -> Self {
        self.status = AccessStatus::Failed;
        self.detail = Some(detail.into());
        self
    }
}

/// File lifecycle actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileAction {
    Upload,
    Download,
    Revoke,
}

/// One file lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileAuditEvent {
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub action: FileAction,
    pub status: AccessStatus,
    /// Identity that performed the action, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default)]
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl FileAuditEvent {
    pub fn new(action: FileAction, file_id: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            file_id: Some(file_id.into()),
            action,
            status: AccessStatus::Success,
            actor: None,
            details: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: Option<impl Into<String>>) -> Self {
        self.actor = actor.map(Into::into);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn failed(mut self, details: impl Into<String>) -> Self {
        self.status = AccessStatus::Failed;
        self.details = details.into();
        self
    }
}

/// Repository over both audit streams.
pub struct AuditRepository<'a> {
    storage: &'a FsStorage,
}

impl<'a> AuditRepository<'a> {
    pub fn new(storage: &'a FsStorage) -> Self {
        Self { storage }
    }

    /// Append an access entry, propagating storage failures.
    pub fn append_access(&self, entry: &AccessLogEntry) -> StorageResult<()> {
        self.append(ACCESS_LOG_STREAM, entry.access_time, entry)
    }

    /// Append a file event, propagating storage failures.
    pub fn append_file_event(&self, event: &FileAuditEvent) -> StorageResult<()> {
        self.append(FILE_AUDIT_STREAM, event.timestamp, event)
    }

    /// Record an access entry; failures are logged and swallowed.
    pub fn record_access(&self, entry: &AccessLogEntry) {
        if let Err(e) = self.append_access(entry) {
            tracing::warn!(
                error = %e,
                session_id = %entry.session_id,
                facility = %entry.facility_used,
                "Failed to write access log entry"
            );
        }
    }

    /// Record a file event; failures are logged and swallowed.
    pub fn record_file_event(&self, event: &FileAuditEvent) {
        if let Err(e) = self.append_file_event(event) {
            tracing::warn!(
                error = %e,
                file_id = event.file_id.as_deref().unwrap_or("-"),
                action = ?event.action,
                "Failed to write file audit event"
            );
        }
    }

    /// Every access entry, newest first.
    pub fn list_access(&self) -> StorageResult<Vec<AccessLogEntry>> {
        let mut entries: Vec<AccessLogEntry> = self.read_stream(ACCESS_LOG_STREAM)?;
        entries.sort_by(|a, b| b.access_time.cmp(&a.access_time));
        Ok(entries)
    }

    /// The most recent `limit` file events, newest first.
    pub fn list_file_events(&self, limit: usize) -> StorageResult<Vec<FileAuditEvent>> {
        let mut events: Vec<FileAuditEvent> = self.read_stream(FILE_AUDIT_STREAM)?;
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit);
        Ok(events)
    }

    fn append<T: Serialize>(
        &self,
        stream: &str,
        at: DateTime<Utc>,
        value: &T,
    ) -> StorageResult<()> {
        let date = at.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(stream, &date);
        let line = serde_json::to_string(value).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize audit record: {e}"))
        })?;
        self.storage.append_line(path, &line)
    }

    fn read_stream<T: DeserializeOwned>(&self, stream: &str) -> StorageResult<Vec<T>> {
        let paths = self.storage.paths();
        let mut records = Vec::new();

        for date in self.storage.list_dirs(paths.audit_stream_dir(stream))? {
            let path = paths.audit_events_file(stream, &date);
            let content = match self.storage.read_raw(&path) {
                Ok(content) => content,
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let content = String::from_utf8_lossy(&content);

            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str(line) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!(
                        error = %e,
                        stream,
                        date = %date,
                        "Skipping unreadable audit line"
                    ),
                }
            }
        }

        Ok(records)
    }
}
