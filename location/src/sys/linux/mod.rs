//! Linux location implementation using the GeoClue2 D-Bus service.
//!
//! A GeoClue client only learns its location after `Start`, and announces
//! every fix with a `LocationUpdated` signal. One-shot reads wait a bounded
//! time for the first signal. Subscriptions keep a single client running and
//! turn each signal into a [`LocationEvent`]. GeoClue drops a client when
//! its bus connection closes, which happens when the subscription drops.

use std::future::Future;
use std::time::Duration;

use futures::future::{self, Either};
use futures::{StreamExt, pin_mut, stream};
use zbus::message::Message;
use zbus::proxy::SignalStream;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Proxy};

use crate::{
    Location, LocationError, LocationEvent, LocationResult, Provider, Subscription, UpdateRequest,
};

const GEOCLUE_BUS: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const LOCATION_UPDATED: &str = "LocationUpdated";
const DESKTOP_ID: &str = "geoscreen";

/// How long a one-shot read waits for GeoClue's first fix.
const FIRST_FIX_TIMEOUT: Duration = Duration::from_secs(10);

/// Maps a D-Bus failure, treating access refusals as a permission problem.
fn dbus_error<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> LocationError + '_ {
    move |e| {
        let message = e.to_string();
        if message.contains("AccessDenied") {
            LocationError::PermissionDenied
        } else {
            LocationError::Unknown(format!("{context}: {message}"))
        }
    }
}

/// GeoClue accuracy level matching each provider.
const fn accuracy_level(provider: Provider) -> u32 {
    match provider {
        Provider::Gps => 8,
        Provider::Network => 6,
        Provider::Passive => 4,
    }
}

/// `DistanceThreshold` (meters) and `TimeThreshold` (seconds) for a request,
/// both rounded up.
fn thresholds(request: &UpdateRequest) -> (u32, u32) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let distance = request.min_displacement_m.max(0.0).ceil().min(f64::from(u32::MAX)) as u32;
    let seconds = request.min_interval_ms.div_ceil(1000);
    (distance, u32::try_from(seconds).unwrap_or(u32::MAX))
}

/// GeoClue timestamps are `(seconds, microseconds)` since the epoch.
fn epoch_millis((seconds, micros): (u64, u64)) -> u64 {
    seconds.saturating_mul(1000).saturating_add(micros / 1000)
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// The new location object announced by a `LocationUpdated` signal.
fn updated_path(message: &Message) -> LocationResult<OwnedObjectPath> {
    let (_old, new): (OwnedObjectPath, OwnedObjectPath) = message
        .body()
        .deserialize()
        .map_err(dbus_error("LocationUpdated body"))?;
    Ok(new)
}

/// Resolves `fix`, or fails with [`LocationError::Timeout`] after `limit`.
async fn within<T>(
    limit: Duration,
    fix: impl Future<Output = LocationResult<T>>,
) -> LocationResult<T> {
    let deadline = futures_timer::Delay::new(limit);
    pin_mut!(fix);
    match future::select(fix, deadline).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(LocationError::Timeout),
    }
}

async fn read_fix(connection: &Connection, path: &OwnedObjectPath) -> LocationResult<Location> {
    let location = Proxy::new(connection, GEOCLUE_BUS, path.as_str(), LOCATION_IFACE)
        .await
        .map_err(dbus_error("location proxy"))?;

    let latitude: f64 = location
        .get_property("Latitude")
        .await
        .map_err(dbus_error("latitude"))?;
    let longitude: f64 = location
        .get_property("Longitude")
        .await
        .map_err(dbus_error("longitude"))?;
    let altitude = location.get_property::<f64>("Altitude").await.ok();
    let accuracy = location.get_property::<f64>("Accuracy").await.ok();
    let timestamp = location
        .get_property::<(u64, u64)>("Timestamp")
        .await
        .map_or_else(|_| now_millis(), epoch_millis);

    Ok(Location {
        latitude,
        longitude,
        altitude,
        horizontal_accuracy: accuracy,
        vertical_accuracy: None,
        timestamp,
        provider: "geoclue".to_owned(),
    })
}

/// A started GeoClue client and the stream of its location signals.
struct Session {
    client: Proxy<'static>,
    updates: SignalStream<'static>,
}

impl Session {
    /// Creates a client on a fresh system bus connection, configures it and
    /// starts it. The signal stream is opened before `Start` so the first fix
    /// cannot be missed.
    async fn start(request: &UpdateRequest) -> LocationResult<Self> {
        let connection = Connection::system()
            .await
            .map_err(dbus_error("system bus"))?;

        let manager = Proxy::new(&connection, GEOCLUE_BUS, MANAGER_PATH, MANAGER_IFACE)
            .await
            .map_err(dbus_error("manager proxy"))?;

        // A missing manager means location services are off or not installed.
        let client_path: OwnedObjectPath = manager.call("GetClient", &()).await.map_err(|e| {
            log::debug!("GeoClue2 unavailable: {e}");
            LocationError::ServiceDisabled
        })?;

        let client = Proxy::new(&connection, GEOCLUE_BUS, client_path, CLIENT_IFACE)
            .await
            .map_err(dbus_error("client proxy"))?;

        let (distance, seconds) = thresholds(request);
        client
            .set_property("DesktopId", DESKTOP_ID)
            .await
            .map_err(dbus_error("set desktop id"))?;
        client
            .set_property("RequestedAccuracyLevel", accuracy_level(request.provider))
            .await
            .map_err(dbus_error("set accuracy level"))?;
        client
            .set_property("DistanceThreshold", distance)
            .await
            .map_err(dbus_error("set distance threshold"))?;
        client
            .set_property("TimeThreshold", seconds)
            .await
            .map_err(dbus_error("set time threshold"))?;

        let updates = client
            .receive_signal(LOCATION_UPDATED)
            .await
            .map_err(dbus_error("subscribe LocationUpdated"))?;

        let () = client
            .call("Start", &())
            .await
            .map_err(dbus_error("start client"))?;

        Ok(Self { client, updates })
    }

    /// Waits for the next signal that carries a readable fix.
    ///
    /// Returns `None` once the signal stream ends.
    async fn next_fix(&mut self) -> Option<Location> {
        while let Some(message) = self.updates.next().await {
            let fix = match updated_path(&message) {
                Ok(path) => read_fix(self.client.connection(), &path).await,
                Err(e) => Err(e),
            };
            match fix {
                Ok(fix) => return Some(fix),
                Err(e) => log::debug!("skipping GeoClue update: {e}"),
            }
        }
        None
    }

    /// The fix the client already holds, or the first one it announces.
    async fn first_fix(&mut self) -> LocationResult<Location> {
        // A client that has already located reports a path other than "/".
        if let Ok(path) = self.client.get_property::<OwnedObjectPath>("Location").await {
            if path.as_str() != "/" {
                return read_fix(self.client.connection(), &path).await;
            }
        }
        self.next_fix().await.ok_or(LocationError::NotAvailable)
    }

    async fn stop(self) {
        let stopped: zbus::Result<()> = self.client.call("Stop", &()).await;
        if let Err(e) = stopped {
            log::debug!("failed to stop GeoClue client: {e}");
        }
    }
}

pub(crate) async fn last_location() -> LocationResult<Location> {
    let request = UpdateRequest::default();
    let mut session = Session::start(&request).await?;
    let fix = within(FIRST_FIX_TIMEOUT, session.first_fix()).await;
    session.stop().await;
    fix
}

enum Feed {
    Starting(UpdateRequest),
    Running(Session),
}

pub(crate) fn subscribe(request: &UpdateRequest) -> LocationResult<Subscription> {
    let provider = request.provider;
    let events = stream::unfold(Some(Feed::Starting(request.clone())), move |feed| async move {
        let mut session = match feed? {
            Feed::Running(session) => session,
            Feed::Starting(request) => match Session::start(&request).await {
                Ok(session) => session,
                Err(LocationError::ServiceDisabled) => {
                    let event = LocationEvent::ProviderDisabled(provider.name().to_owned());
                    return Some((event, None));
                }
                Err(e) => {
                    log::warn!("GeoClue {provider} updates unavailable: {e}");
                    return None;
                }
            },
        };
        let fix = session.next_fix().await?;
        Some((
            LocationEvent::LocationChanged(fix),
            Some(Feed::Running(session)),
        ))
    });

    Ok(Subscription::new(request.clone(), events))
}
