//! Platform-specific location implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "linux")]
mod linux;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        pub(crate) use android::{last_location, subscribe};
    } else if #[cfg(target_os = "linux")] {
        pub(crate) use linux::{last_location, subscribe};
    } else {
        // Fallback for platforms without a backend
        pub(crate) async fn last_location() -> crate::LocationResult<crate::Location> {
            Err(crate::LocationError::NotAvailable)
        }

        pub(crate) fn subscribe(
            _request: &crate::UpdateRequest,
        ) -> crate::LocationResult<crate::Subscription> {
            Err(crate::LocationError::NotAvailable)
        }
    }
}
