use geoscreen_location::{Coordinate, Location, LocationError, LocationEvent, LocationResult};
use geoscreen_permission::{Permission, PermissionError, PermissionStatus};
use log::{debug, warn};

/// A failure recorded by the screen instead of being thrown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScreenError {
    /// A permission prompt could not be shown or completed.
    #[error("{permission} permission request failed: {source}")]
    Permission {
        /// The permission that was requested.
        permission: Permission,
        /// What went wrong.
        source: PermissionError,
    },
    /// The one-shot last-known read failed; the previous value stays.
    #[error("last known location unavailable: {0}")]
    LastKnown(#[source] LocationError),
    /// The live subscription could not be opened.
    #[error("live location updates unavailable: {0}")]
    Subscribe(#[source] LocationError),
}

/// A state update produced by a platform callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A permission was checked without prompting.
    PermissionChecked {
        /// The permission that was checked.
        permission: Permission,
        /// Its current status.
        status: PermissionStatus,
    },
    /// A permission prompt finished.
    PermissionRequested {
        /// The permission that was requested.
        permission: Permission,
        /// The outcome of the prompt.
        result: Result<PermissionStatus, PermissionError>,
    },
    /// A one-shot last-known read finished.
    LastKnown(LocationResult<Location>),
    /// The live subscription delivered an event.
    Live(LocationEvent),
    /// The live subscription could not be opened.
    SubscribeFailed(LocationError),
}

/// Everything the screen displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenState {
    /// Fine location permission.
    pub location_permission: PermissionStatus,
    /// Camera permission.
    pub camera_permission: PermissionStatus,
    /// Result of the latest successful one-shot read.
    pub last_known: Coordinate,
    /// Latest fix from the live subscription.
    pub live: Coordinate,
    /// Whether the subscribed provider last reported itself enabled.
    pub provider_enabled: Option<bool>,
    /// Most recent recorded failure.
    pub last_error: Option<ScreenError>,
}

impl ScreenState {
    /// Status of `permission`.
    #[must_use]
    pub const fn permission(&self, permission: Permission) -> PermissionStatus {
        match permission {
            Permission::Location => self.location_permission,
            Permission::Camera => self.camera_permission,
        }
    }

    fn set_permission(&mut self, permission: Permission, status: PermissionStatus) {
        match permission {
            Permission::Location => self.location_permission = status,
            Permission::Camera => self.camera_permission = status,
        }
    }

    fn record(&mut self, error: ScreenError) {
        warn!("{error}");
        self.last_error = Some(error);
    }

    /// Applies one message.
    ///
    /// Last-known and live coordinates are written by their own message kinds
    /// only, so neither channel can overwrite the other.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::PermissionChecked { permission, status } => {
                self.set_permission(permission, status);
            }
            Message::PermissionRequested { permission, result } => match result {
                Ok(status) => {
                    debug!("{permission} permission prompt answered: {status:?}");
                    self.set_permission(permission, status);
                }
                Err(source) => self.record(ScreenError::Permission { permission, source }),
            },
            Message::LastKnown(Ok(fix)) => self.last_known = fix.coordinate(),
            Message::LastKnown(Err(e)) => self.record(ScreenError::LastKnown(e)),
            Message::Live(event) => match event {
                LocationEvent::LocationChanged(fix) => self.live = fix.coordinate(),
                LocationEvent::ProviderEnabled(name) => {
                    debug!("provider {name} enabled");
                    self.provider_enabled = Some(true);
                }
                LocationEvent::ProviderDisabled(name) => {
                    debug!("provider {name} disabled");
                    self.provider_enabled = Some(false);
                }
                LocationEvent::StatusChanged {
                    provider,
                    available,
                } => {
                    debug!("provider {provider} available: {available}");
                    self.provider_enabled = Some(available);
                }
            },
            Message::SubscribeFailed(e) => self.record(ScreenError::Subscribe(e)),
        }
    }
}
