//! Android location implementation using JNI.
//!
//! The host calls [`init_with_context`] once. If it also hands over a
//! `LocationListener` that forwards its callbacks to [`on_location_changed`],
//! [`on_provider_enabled`], [`on_provider_disabled`] and
//! [`on_status_changed`], subscriptions are registered with
//! `LocationManager.requestLocationUpdates` on the main looper. Without a
//! listener, subscriptions fall back to polling the last-known fix.

use crate::{
    Location, LocationError, LocationEvent, LocationResult, Provider, Subscription, UpdateRequest,
    freshest, poll_updates,
};
use async_channel::Sender;
use jni::objects::{GlobalRef, JObject, JValue};
use jni::{JNIEnv, JavaVM};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};

struct Host {
    vm: JavaVM,
    context: GlobalRef,
    listener: Option<GlobalRef>,
}

static HOST: OnceLock<Host> = OnceLock::new();

/// Senders of every open listener-backed subscription, keyed by id.
static SUBSCRIBERS: LazyLock<Mutex<Vec<(u64, Sender<LocationEvent>)>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(0);

fn unknown(context: &str) -> impl Fn(jni::errors::Error) -> LocationError + '_ {
    move |e| LocationError::Unknown(format!("{context}: {e}"))
}

/// Converts a pending Java exception into a [`LocationError`].
///
/// `SecurityException` means the permission was revoked between the check
/// and the call.
fn map_java<T>(
    env: &mut JNIEnv,
    result: jni::errors::Result<T>,
    context: &str,
) -> LocationResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(jni::errors::Error::JavaException) => {
            let throwable = env.exception_occurred().map_err(unknown(context))?;
            env.exception_clear().map_err(unknown(context))?;
            if env
                .is_instance_of(&throwable, "java/lang/SecurityException")
                .unwrap_or(false)
            {
                Err(LocationError::PermissionDenied)
            } else {
                Err(LocationError::Unknown(format!("{context}: java exception")))
            }
        }
        Err(e) => Err(unknown(context)(e)),
    }
}

/// Capture the Java VM, an application context and an optional forwarding
/// `LocationListener`.
///
/// Pass `JObject::null()` as `listener` to use polling subscriptions.
///
/// # Errors
/// Returns [`LocationError::Unknown`] if the VM or a global reference cannot
/// be obtained.
pub fn init_with_context(
    env: &mut JNIEnv,
    context: &JObject,
    listener: &JObject,
) -> LocationResult<()> {
    if HOST.get().is_some() {
        return Ok(());
    }

    let vm = env.get_java_vm().map_err(unknown("get_java_vm"))?;
    let context = env
        .new_global_ref(context)
        .map_err(unknown("new_global_ref"))?;
    let listener = if listener.is_null() {
        None
    } else {
        Some(
            env.new_global_ref(listener)
                .map_err(unknown("new_global_ref"))?,
        )
    };

    let _ = HOST.set(Host {
        vm,
        context,
        listener,
    });
    Ok(())
}

fn location_manager<'local>(
    env: &mut JNIEnv<'local>,
    context: &JObject,
) -> LocationResult<JObject<'local>> {
    let service = env
        .new_string("location")
        .map_err(unknown("new_string"))?;
    let result = env
        .call_method(
            context,
            "getSystemService",
            "(Ljava/lang/String;)Ljava/lang/Object;",
            &[JValue::Object(&service)],
        )
        .and_then(|v| v.l());
    let manager = map_java(env, result, "getSystemService")?;

    if manager.is_null() {
        return Err(LocationError::NotAvailable);
    }
    Ok(manager)
}

/// Whether the given provider is switched on.
///
/// # Errors
/// Returns an error if the JNI call fails.
pub fn is_provider_enabled(
    env: &mut JNIEnv,
    context: &JObject,
    provider: Provider,
) -> LocationResult<bool> {
    let manager = location_manager(env, context)?;
    let name = env
        .new_string(provider.name())
        .map_err(unknown("new_string"))?;
    let result = env
        .call_method(
            &manager,
            "isProviderEnabled",
            "(Ljava/lang/String;)Z",
            &[JValue::Object(&name)],
        )
        .and_then(|v| v.z());
    map_java(env, result, "isProviderEnabled")
}

/// Convert an `android.location.Location` into a [`Location`].
///
/// # Errors
/// Returns [`LocationError::Unknown`] if a getter fails.
pub fn location_from_java(env: &mut JNIEnv, location: &JObject) -> LocationResult<Location> {
    let latitude = env
        .call_method(location, "getLatitude", "()D", &[])
        .and_then(|v| v.d())
        .map_err(unknown("getLatitude"))?;
    let longitude = env
        .call_method(location, "getLongitude", "()D", &[])
        .and_then(|v| v.d())
        .map_err(unknown("getLongitude"))?;

    let has_altitude = env
        .call_method(location, "hasAltitude", "()Z", &[])
        .and_then(|v| v.z())
        .map_err(unknown("hasAltitude"))?;
    let altitude = if has_altitude {
        Some(
            env.call_method(location, "getAltitude", "()D", &[])
                .and_then(|v| v.d())
                .map_err(unknown("getAltitude"))?,
        )
    } else {
        None
    };

    let has_accuracy = env
        .call_method(location, "hasAccuracy", "()Z", &[])
        .and_then(|v| v.z())
        .map_err(unknown("hasAccuracy"))?;
    let horizontal_accuracy = if has_accuracy {
        Some(f64::from(
            env.call_method(location, "getAccuracy", "()F", &[])
                .and_then(|v| v.f())
                .map_err(unknown("getAccuracy"))?,
        ))
    } else {
        None
    };

    let time = env
        .call_method(location, "getTime", "()J", &[])
        .and_then(|v| v.j())
        .map_err(unknown("getTime"))?;

    let provider = env
        .call_method(location, "getProvider", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .map_err(unknown("getProvider"))?;
    let provider = if provider.is_null() {
        String::new()
    } else {
        env.get_string((&provider).into())
            .map_err(unknown("get_string"))?
            .into()
    };

    Ok(Location {
        latitude,
        longitude,
        altitude,
        horizontal_accuracy,
        vertical_accuracy: None,
        timestamp: u64::try_from(time).unwrap_or(0),
        provider,
    })
}

/// Read the last-known fix of `provider` using the given context.
///
/// # Errors
/// Returns [`LocationError::NotAvailable`] when no fix is cached and
/// [`LocationError::PermissionDenied`] when the call is refused.
pub fn last_location_with_context(
    env: &mut JNIEnv,
    context: &JObject,
    provider: Provider,
) -> LocationResult<Location> {
    let manager = location_manager(env, context)?;
    let name = env
        .new_string(provider.name())
        .map_err(unknown("new_string"))?;
    let result = env
        .call_method(
            &manager,
            "getLastKnownLocation",
            "(Ljava/lang/String;)Landroid/location/Location;",
            &[JValue::Object(&name)],
        )
        .and_then(|v| v.l());
    let location = map_java(env, result, "getLastKnownLocation")?;

    if location.is_null() {
        return Err(LocationError::NotAvailable);
    }
    location_from_java(env, &location)
}

fn with_host<T>(f: impl FnOnce(&mut JNIEnv, &Host) -> LocationResult<T>) -> LocationResult<T> {
    let host = HOST
        .get()
        .ok_or_else(|| LocationError::Unknown("Android: call init_with_context() first".into()))?;
    let mut env = host
        .vm
        .attach_current_thread()
        .map_err(unknown("attach_current_thread"))?;
    f(&mut *env, host)
}

/// Last-known fixes are cached per provider, so every provider is asked and
/// the newest fix wins.
pub(crate) async fn last_location() -> LocationResult<Location> {
    with_host(|env, host| {
        let fixes: Vec<_> = [Provider::Gps, Provider::Network, Provider::Passive]
            .into_iter()
            .map(|provider| last_location_with_context(env, host.context.as_obj(), provider))
            .collect();
        freshest(fixes)
    })
}

/// Polled fetch that reports a disabled provider as such.
async fn poll_fix(provider: Provider) -> LocationResult<Location> {
    with_host(|env, host| {
        if !is_provider_enabled(env, host.context.as_obj(), provider)? {
            return Err(LocationError::ServiceDisabled);
        }
        last_location_with_context(env, host.context.as_obj(), provider)
    })
}

fn request_updates(
    env: &mut JNIEnv,
    host: &Host,
    listener: &GlobalRef,
    request: &UpdateRequest,
) -> LocationResult<()> {
    let manager = location_manager(env, host.context.as_obj())?;
    let name = env
        .new_string(request.provider.name())
        .map_err(unknown("new_string"))?;
    let looper = env
        .call_static_method(
            "android/os/Looper",
            "getMainLooper",
            "()Landroid/os/Looper;",
            &[],
        )
        .and_then(|v| v.l())
        .map_err(unknown("getMainLooper"))?;

    #[allow(clippy::cast_possible_truncation)]
    let min_distance = request.min_displacement_m as f32;
    let min_time = i64::try_from(request.min_interval_ms).unwrap_or(i64::MAX);

    let result = env
        .call_method(
            &manager,
            "requestLocationUpdates",
            "(Ljava/lang/String;JFLandroid/location/LocationListener;Landroid/os/Looper;)V",
            &[
                JValue::Object(&name),
                JValue::Long(min_time),
                JValue::Float(min_distance),
                JValue::Object(listener.as_obj()),
                JValue::Object(&looper),
            ],
        )
        .and_then(|v| v.v());
    map_java(env, result, "requestLocationUpdates")
}

fn remove_updates(listener: &GlobalRef) -> LocationResult<()> {
    with_host(|env, host| {
        let manager = location_manager(env, host.context.as_obj())?;
        let result = env
            .call_method(
                &manager,
                "removeUpdates",
                "(Landroid/location/LocationListener;)V",
                &[JValue::Object(listener.as_obj())],
            )
            .and_then(|v| v.v());
        map_java(env, result, "removeUpdates")
    })
}

fn release_subscriber(id: u64) {
    let remaining = {
        let mut subscribers = SUBSCRIBERS.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|(other, _)| *other != id);
        subscribers.len()
    };

    if remaining > 0 {
        return;
    }
    if let Some(listener) = HOST.get().and_then(|host| host.listener.as_ref()) {
        if let Err(e) = remove_updates(listener) {
            log::warn!("failed to remove location updates: {e}");
        }
    }
}

pub(crate) fn subscribe(request: &UpdateRequest) -> LocationResult<Subscription> {
    let listener = HOST.get().and_then(|host| host.listener.clone());
    let Some(listener) = listener else {
        let provider = request.provider;
        return Ok(poll_updates(request.clone(), move || poll_fix(provider)));
    };

    with_host(|env, host| request_updates(env, host, &listener, request))?;

    let id = NEXT_SUBSCRIBER.fetch_add(1, Ordering::Relaxed);
    let (sender, receiver) = async_channel::unbounded();
    SUBSCRIBERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, sender));

    log::debug!("registered {} listener #{id}", request.provider);
    Ok(Subscription::with_release(
        request.clone(),
        receiver,
        move || release_subscriber(id),
    ))
}

fn broadcast(event: &LocationEvent) {
    let mut subscribers = SUBSCRIBERS.lock().unwrap_or_else(PoisonError::into_inner);
    subscribers.retain(|(_, sender)| match sender.try_send(event.clone()) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("dropping location event: {err}");
            !sender.is_closed()
        }
    });
}

/// Forward `LocationListener.onLocationChanged` from the host.
pub fn on_location_changed(location: Location) {
    broadcast(&LocationEvent::LocationChanged(location));
}

/// Forward `LocationListener.onLocationChanged` with the Java object.
///
/// # Errors
/// Returns an error if the Java location cannot be read.
pub fn on_location_changed_java(env: &mut JNIEnv, location: &JObject) -> LocationResult<()> {
    on_location_changed(location_from_java(env, location)?);
    Ok(())
}

/// Forward `LocationListener.onProviderEnabled` from the host.
pub fn on_provider_enabled(provider: &str) {
    broadcast(&LocationEvent::ProviderEnabled(provider.to_owned()));
}

/// Forward `LocationListener.onProviderDisabled` from the host.
pub fn on_provider_disabled(provider: &str) {
    broadcast(&LocationEvent::ProviderDisabled(provider.to_owned()));
}

/// Forward `LocationListener.onStatusChanged` from the host.
pub fn on_status_changed(provider: &str, available: bool) {
    broadcast(&LocationEvent::StatusChanged {
        provider: provider.to_owned(),
        available,
    });
}
