//! Last-known and continuous device location.
//!
//! Two acquisition paths are offered through [`LocationProvider`]:
//!
//! - a one-shot read of the most recently cached fix
//!   ([`LocationProvider::last_location`]), and
//! - a standing [`Subscription`] that yields a [`LocationEvent`] for every
//!   qualifying movement ([`LocationProvider::subscribe`]).
//!
//! ```ignore
//! use futures::StreamExt;
//! use geoscreen_location::{LocationProvider, SystemLocation, UpdateRequest};
//!
//! let location = SystemLocation;
//! let fix = location.last_location().await?;
//!
//! let mut updates = location.subscribe(&UpdateRequest::default())?;
//! while let Some(event) = updates.next().await {
//!     println!("{event:?}");
//! }
//! // Dropping `updates` stops delivery.
//! ```

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;
mod watch;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use serde::Deserialize;

pub use geoscreen_permission::{Permission, PermissionStatus};
pub use watch::poll_updates;

/// Mean Earth radius used for displacement checks, in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// A geographic location with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub vertical_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
    /// Name of the provider that produced the fix.
    pub provider: String,
}

impl Location {
    /// Creates a bare fix with no altitude or accuracy information.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, provider: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            timestamp: 0,
            provider: provider.into(),
        }
    }

    /// Returns the latitude/longitude of this fix.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A location source on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Satellite positioning.
    #[default]
    Gps,
    /// Cell and Wi-Fi positioning.
    Network,
    /// Fixes requested by other applications only.
    Passive,
}

impl Provider {
    /// The platform name of this provider.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Network => "network",
            Self::Passive => "passive",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for a continuous location subscription.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    /// Provider the subscription is filtered to.
    pub provider: Provider,
    /// Minimum time between updates, in milliseconds.
    pub min_interval_ms: u64,
    /// Minimum distance between updates, in meters.
    pub min_displacement_m: f64,
}

impl UpdateRequest {
    /// Minimum time between updates.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            provider: Provider::Gps,
            min_interval_ms: 1000,
            min_displacement_m: 1.0,
        }
    }
}

/// An event delivered on a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// A new fix passed the subscription's interval and displacement filters.
    LocationChanged(Location),
    /// The named provider was switched on.
    ProviderEnabled(String),
    /// The named provider was switched off.
    ProviderDisabled(String),
    /// The named provider changed availability.
    StatusChanged {
        /// Provider name.
        provider: String,
        /// Whether the provider can currently produce fixes.
        available: bool,
    },
}

/// Errors that can occur when accessing location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location permission was not granted.
    #[error("location permission denied")]
    PermissionDenied,
    /// Location services are disabled on the device.
    #[error("location services disabled")]
    ServiceDisabled,
    /// Location request timed out.
    #[error("location request timed out")]
    Timeout,
    /// Location is not available.
    #[error("location not available")]
    NotAvailable,
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Result alias for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

/// A boxed stream of location events.
pub type LocationStream = Pin<Box<dyn Stream<Item = LocationEvent> + Send>>;

/// A live location subscription.
///
/// Events are read by polling it as a [`Stream`]. Dropping the subscription
/// stops delivery and releases the platform registration.
pub struct Subscription {
    request: UpdateRequest,
    stream: LocationStream,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps an event stream.
    pub fn new(
        request: UpdateRequest,
        stream: impl Stream<Item = LocationEvent> + Send + 'static,
    ) -> Self {
        Self {
            request,
            stream: Box::pin(stream),
            release: None,
        }
    }

    /// Wraps an event stream and runs `release` when the subscription drops.
    pub fn with_release(
        request: UpdateRequest,
        stream: impl Stream<Item = LocationEvent> + Send + 'static,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            request,
            stream: Box::pin(stream),
            release: Some(Box::new(release)),
        }
    }
}

impl Stream for Subscription {
    type Item = LocationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        log::debug!("releasing {} location updates", self.request.provider);
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Picks the most recent fix among the results of several providers.
///
/// # Errors
/// Returns the first error when none of the results holds a fix.
pub fn freshest(
    results: impl IntoIterator<Item = LocationResult<Location>>,
) -> LocationResult<Location> {
    let mut newest: Option<Location> = None;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(fix) => {
                if newest.as_ref().is_none_or(|best| fix.timestamp > best.timestamp) {
                    newest = Some(fix);
                }
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    newest.ok_or_else(|| first_error.unwrap_or(LocationError::NotAvailable))
}

/// Source of device location.
#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    /// Read the most recently cached fix from any source.
    ///
    /// # Errors
    /// Returns [`LocationError::NotAvailable`] when no fix is cached, or
    /// [`LocationError::PermissionDenied`] when location access is not granted.
    async fn last_location(&self) -> LocationResult<Location>;

    /// Open a continuous subscription.
    ///
    /// # Errors
    /// Returns [`LocationError::PermissionDenied`] when location access is
    /// revoked at call time, or another error if the platform refuses.
    fn subscribe(&self, request: &UpdateRequest) -> LocationResult<Subscription>;
}

/// [`LocationProvider`] backed by the current platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocation;

impl LocationProvider for SystemLocation {
    async fn last_location(&self) -> LocationResult<Location> {
        sys::last_location().await
    }

    fn subscribe(&self, request: &UpdateRequest) -> LocationResult<Subscription> {
        sys::subscribe(request)
    }
}
