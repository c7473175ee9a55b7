//! Platform-specific permission implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "linux")]
mod linux;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        pub(crate) use android::{check, request};
    } else if #[cfg(target_os = "linux")] {
        pub(crate) use linux::{check, request};
    } else {
        // Fallback for platforms without a backend
        pub(crate) async fn check(_permission: crate::Permission) -> crate::PermissionStatus {
            crate::PermissionStatus::Unknown
        }

        pub(crate) async fn request(
            _permission: crate::Permission,
        ) -> Result<crate::PermissionStatus, crate::PermissionError> {
            Err(crate::PermissionError::NotSupported)
        }
    }
}
