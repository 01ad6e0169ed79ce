// ── Core error types ──
//
// Each component owns a narrow error enum; `CoreError` is the single
// user-facing type returned by `AccessDeviceService`. Transport failures
// from the directory and flow backend arrive as opaque `DirectoryError`
// and `BackendError` values and are never exposed raw.

use thiserror::Error;

use crate::model::{AttachmentPoint, DeviceId, FlowDirection, SubscriberIdentity, VlanPair};

/// Diagnostic carried when topology has no port at an attachment point.
pub const INVALID_CONNECT_POINT: &str = "Invalid connect point";

/// Diagnostic carried by [`CoreError::InvalidAttachmentPoint`].
pub const INVALID_ATTACHMENT_POINT: &str = "Invalid attachment point";

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("malformed attachment point '{input}': {reason}")]
    MalformedAttachmentPoint { input: String, reason: &'static str },

    #[error("VLAN id {0} outside the assignable range 1..=4094")]
    InvalidVlan(u16),
}

// ── Collaborator failures ────────────────────────────────────────────

/// Failure reported by a [`ProfileDirectory`](crate::ProfileDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory unreachable: {reason}")]
    Unavailable { reason: String },

    #[error("directory entry {key} is unusable: {reason}")]
    InvalidEntry { key: String, reason: String },
}

/// Opaque transport or driver failure from a [`FlowBackend`](crate::FlowBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure returned by an [`AccessDeviceListener`](crate::AccessDeviceListener).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

// ── Component errors ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed attachment point {attachment_point}: {reason}")]
    Malformed {
        attachment_point: AttachmentPoint,
        reason: &'static str,
    },

    #[error("Unknown device {device_id}")]
    DeviceNotFound { device_id: DeviceId },

    #[error("Invalid connect point")]
    PortNotFound { attachment_point: AttachmentPoint },

    #[error("Port {attachment_point} is disabled")]
    PortDisabled { attachment_point: AttachmentPoint },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("port {attachment_point} has no '{annotation}' annotation to key the subscriber")]
    MissingSubscriberKey {
        attachment_point: AttachmentPoint,
        annotation: String,
    },

    #[error("no subscriber profile for key {key}")]
    ProfileNotFound { key: String },

    #[error("subscriber profile {key} is missing required field {field}")]
    IncompleteProfile { key: String, field: &'static str },

    #[error("subscriber {identity} is not attached to any enabled access port")]
    NotLocated { identity: SubscriberIdentity },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{attachment_point} is already provisioned with {existing}, refusing {requested}")]
    Conflict {
        attachment_point: AttachmentPoint,
        existing: VlanPair,
        requested: VlanPair,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("{direction} flow install failed on {attachment_point}: {source}")]
    Install {
        attachment_point: AttachmentPoint,
        direction: FlowDirection,
        source: BackendError,
    },

    #[error("{attachment_point} already carries flows with different parameters")]
    Occupied { attachment_point: AttachmentPoint },

    #[error("flow removal failed on {attachment_point}: {source}")]
    Remove {
        attachment_point: AttachmentPoint,
        source: BackendError,
    },

    #[error("dataplane state query failed: {source}")]
    Query { source: BackendError },
}

// ── Unified error ────────────────────────────────────────────────────

/// Unified error type for the provisioning core.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Programming errors ───────────────────────────────────────────
    #[error("Malformed attachment point {attachment_point}: {reason}")]
    MalformedAttachmentPoint {
        attachment_point: AttachmentPoint,
        reason: &'static str,
    },

    // ── Refusals ─────────────────────────────────────────────────────
    #[error("Invalid attachment point")]
    InvalidAttachmentPoint(#[source] ValidationError),

    #[error("Subscriber profile not found for key {key}")]
    ProfileNotFound { key: String },

    #[error(
        "Cannot derive subscriber key on {}: missing '{}' annotation",
        .attachment_point,
        .annotation
    )]
    MissingSubscriberKey {
        attachment_point: AttachmentPoint,
        annotation: String,
    },

    #[error("Subscriber profile {key} is missing required field {field}")]
    IncompleteProfile { key: String, field: &'static str },

    #[error("Subscriber {identity} is not attached to any enabled access port")]
    SubscriberNotLocated { identity: SubscriberIdentity },

    #[error("Subscriber directory unavailable: {0}")]
    DirectoryUnavailable(#[source] DirectoryError),

    #[error(
        "Attachment point {} is already provisioned with {}, refusing {}",
        .attachment_point,
        .existing,
        .requested
    )]
    Conflict {
        attachment_point: AttachmentPoint,
        existing: VlanPair,
        requested: VlanPair,
    },

    // ── Dataplane ────────────────────────────────────────────────────
    #[error("Flow installation failed: {0}")]
    FlowInstall(#[source] FlowError),

    #[error("Flow removal failed: {0}")]
    FlowRemove(#[source] FlowError),

    #[error("Dataplane unavailable: {0}")]
    Dataplane(#[source] FlowError),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Ordinary refusals are reported as `false` by the boolean service
    /// contract; everything else is a programming or internal error.
    pub fn is_refusal(&self) -> bool {
        !matches!(
            self,
            Self::MalformedAttachmentPoint { .. } | Self::Internal(_)
        )
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Malformed {
                attachment_point,
                reason,
            } => CoreError::MalformedAttachmentPoint {
                attachment_point,
                reason,
            },
            other => CoreError::InvalidAttachmentPoint(other),
        }
    }
}

impl From<ResolveError> for CoreError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingSubscriberKey {
                attachment_point,
                annotation,
            } => CoreError::MissingSubscriberKey {
                attachment_point,
                annotation,
            },
            ResolveError::ProfileNotFound { key } => CoreError::ProfileNotFound { key },
            ResolveError::IncompleteProfile { key, field } => {
                CoreError::IncompleteProfile { key, field }
            }
            ResolveError::NotLocated { identity } => CoreError::SubscriberNotLocated { identity },
            ResolveError::Directory(e) => CoreError::DirectoryUnavailable(e),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                attachment_point,
                existing,
                requested,
            } => CoreError::Conflict {
                attachment_point,
                existing,
                requested,
            },
        }
    }
}

impl From<FlowError> for CoreError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Install { .. } | FlowError::Occupied { .. } => CoreError::FlowInstall(err),
            FlowError::Remove { .. } => CoreError::FlowRemove(err),
            FlowError::Query { .. } => CoreError::Dataplane(err),
        }
    }
}
