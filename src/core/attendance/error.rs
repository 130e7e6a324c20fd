use crate::core::store::StoreError;

/// Which class of failure an [`AttendanceError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Upstream,
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Invalid request body: {0}")]
    MalformedRequest(String),
    #[error("Invalid action '{0}' (use 'checkin' or 'checkout')")]
    InvalidAction(String),
    #[error("Email is required")]
    MissingEmail,
    #[error("At least one task is required for checkout")]
    MissingTasks,
    #[error("Task {index}: Task For, Task Name, Task Details, and My Role are required")]
    IncompleteTask { index: usize },
    #[error("Already checked in today")]
    AlreadyCheckedIn,
    #[error("Already checked out today")]
    AlreadyCheckedOut,
    #[error("Check-in required before checkout")]
    CheckInRequired,

    #[error("Email not registered")]
    NotRegistered,
    #[error("Access denied for IP: {0}")]
    DisallowedOrigin(String),

    #[error("Failed to read {what}: {source}")]
    UpstreamRead {
        what: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("Failed to {what}: {source}")]
    UpstreamWrite {
        what: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequest(_)
            | Self::InvalidAction(_)
            | Self::MissingEmail
            | Self::MissingTasks
            | Self::IncompleteTask { .. }
            | Self::AlreadyCheckedIn
            | Self::AlreadyCheckedOut
            | Self::CheckInRequired => ErrorKind::Validation,
            Self::NotRegistered | Self::DisallowedOrigin(_) => ErrorKind::Authorization,
            Self::UpstreamRead { .. } | Self::UpstreamWrite { .. } => ErrorKind::Upstream,
        }
    }

    pub fn read(what: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::UpstreamRead { what, source }
    }

    pub fn write(what: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::UpstreamWrite { what, source }
    }
}
