//! Location and camera permission handling.
//!
//! This crate exposes the two permissions the location screen gates on and a
//! small [`Permissions`] trait so callers can swap the platform backend for a
//! scripted one.

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;

use std::fmt;

/// Types of permissions that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Fine (GPS-grade) device location.
    Location,
    /// Device camera.
    Camera,
}

impl Permission {
    /// Human-readable name used in the UI and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Camera => "Camera",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PermissionStatus {
    /// Not checked yet, or the platform cannot tell.
    #[default]
    Unknown,
    /// Permission has been granted by the user.
    Granted,
    /// Permission has been denied by the user.
    Denied,
}

impl PermissionStatus {
    /// Returns `true` if the permission is granted.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Errors that can occur when requesting permissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The permission type is not supported on this platform.
    #[error("permission not supported on this platform")]
    NotSupported,
    /// The platform backend has no host context to talk to yet.
    #[error("permission backend not initialized")]
    NotInitialized,
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Check the current status of a permission without requesting it.
pub async fn check(permission: Permission) -> PermissionStatus {
    sys::check(permission).await
}

/// Request a permission from the user.
///
/// If the permission has already been granted, this returns the current
/// status without showing a prompt.
///
/// # Errors
/// Returns a `PermissionError` if:
/// - The permission type is not supported on this platform.
/// - An underlying platform error occurs.
pub async fn request(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    sys::request(permission).await
}

/// Source of permission state.
///
/// [`SystemPermissions`] forwards to the platform; tests and harnesses can
/// provide their own.
#[allow(async_fn_in_trait)]
pub trait Permissions {
    /// Check the current status of a permission without prompting.
    async fn check(&self, permission: Permission) -> PermissionStatus;

    /// Prompt the user for a permission.
    ///
    /// # Errors
    /// Returns a `PermissionError` if the platform cannot service the request.
    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError>;
}

/// [`Permissions`] backed by the current platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPermissions;

impl Permissions for SystemPermissions {
    async fn check(&self, permission: Permission) -> PermissionStatus {
        check(permission).await
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        request(permission).await
    }
}
