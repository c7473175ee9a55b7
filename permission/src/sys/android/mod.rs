//! Android permission implementation using JNI.
//!
//! The host activity must call [`init_with_activity`] once and forward its
//! `onRequestPermissionsResult` callback to [`on_request_permissions_result`].

use crate::{Permission, PermissionError, PermissionStatus};
use futures::channel::oneshot;
use jni::objects::{GlobalRef, JObject, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// Request codes handed to `requestPermissions`, offset to stay clear of the
/// host application's own codes.
static NEXT_REQUEST_CODE: AtomicI32 = AtomicI32::new(0x4750);

/// Host VM and activity captured by [`init_with_activity`].
static HOST: OnceLock<(JavaVM, GlobalRef)> = OnceLock::new();

/// Outstanding prompts keyed by request code.
static PENDING: LazyLock<Mutex<HashMap<jint, oneshot::Sender<PermissionStatus>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

const fn manifest_name(permission: Permission) -> &'static str {
    match permission {
        Permission::Location => "android.permission.ACCESS_FINE_LOCATION",
        Permission::Camera => "android.permission.CAMERA",
    }
}

fn jni_error(context: &str) -> impl Fn(jni::errors::Error) -> PermissionError + '_ {
    move |e| PermissionError::Unknown(format!("{context}: {e}"))
}

/// Capture the Java VM and the activity used for checks and prompts.
///
/// Calling this more than once is harmless; the first activity wins.
///
/// # Errors
/// Returns [`PermissionError::Unknown`] if the VM or a global reference
/// cannot be obtained.
pub fn init_with_activity(env: &mut JNIEnv, activity: &JObject) -> Result<(), PermissionError> {
    if HOST.get().is_some() {
        return Ok(());
    }

    let vm = env.get_java_vm().map_err(jni_error("get_java_vm"))?;
    let activity = env
        .new_global_ref(activity)
        .map_err(jni_error("new_global_ref"))?;

    let _ = HOST.set((vm, activity));
    Ok(())
}

/// Check a permission against the given activity.
///
/// # Errors
/// Returns [`PermissionError::Unknown`] if the JNI call fails.
pub fn check_with_activity(
    env: &mut JNIEnv,
    activity: &JObject,
    permission: Permission,
) -> Result<PermissionStatus, PermissionError> {
    let name = env
        .new_string(manifest_name(permission))
        .map_err(jni_error("new_string"))?;

    let result = env
        .call_method(
            activity,
            "checkSelfPermission",
            "(Ljava/lang/String;)I",
            &[JValue::Object(&name)],
        )
        .map_err(jni_error("checkSelfPermission"))?
        .i()
        .map_err(jni_error("checkSelfPermission result"))?;

    Ok(if result == PERMISSION_GRANTED {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    })
}

fn launch_prompt(
    env: &mut JNIEnv,
    activity: &JObject,
    permission: Permission,
    request_code: jint,
) -> Result<(), PermissionError> {
    let name = env
        .new_string(manifest_name(permission))
        .map_err(jni_error("new_string"))?;

    let names = env
        .new_object_array(1, "java/lang/String", JObject::null())
        .map_err(jni_error("new_object_array"))?;
    env.set_object_array_element(&names, 0, &name)
        .map_err(jni_error("set_object_array_element"))?;

    env.call_method(
        activity,
        "requestPermissions",
        "([Ljava/lang/String;I)V",
        &[JValue::Object(&names), JValue::Int(request_code)],
    )
    .map_err(jni_error("requestPermissions"))?;

    Ok(())
}

/// Complete a prompt started by [`request`].
///
/// Call this from the activity's `onRequestPermissionsResult` with the
/// request code and grant results it received. Unknown request codes are
/// ignored so the host can forward every result unconditionally.
pub fn on_request_permissions_result(request_code: jint, grant_results: &[jint]) {
    let sender = PENDING
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&request_code);

    let Some(sender) = sender else {
        return;
    };

    // An empty result means the prompt was interrupted.
    let status = if !grant_results.is_empty()
        && grant_results.iter().all(|&r| r == PERMISSION_GRANTED)
    {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    };

    let _ = sender.send(status);
}

pub(crate) async fn check(permission: Permission) -> PermissionStatus {
    let Some((vm, activity)) = HOST.get() else {
        log::warn!("permission check before init_with_activity");
        return PermissionStatus::Unknown;
    };

    let result = vm
        .attach_current_thread()
        .map_err(jni_error("attach_current_thread"))
        .and_then(|mut env| check_with_activity(&mut env, activity.as_obj(), permission));

    result.unwrap_or_else(|e| {
        log::warn!("{permission} permission check failed: {e}");
        PermissionStatus::Unknown
    })
}

pub(crate) async fn request(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    let (vm, activity) = HOST.get().ok_or(PermissionError::NotInitialized)?;

    let receiver = {
        let mut env = vm
            .attach_current_thread()
            .map_err(jni_error("attach_current_thread"))?;

        if check_with_activity(&mut env, activity.as_obj(), permission)?.is_granted() {
            return Ok(PermissionStatus::Granted);
        }

        let request_code = NEXT_REQUEST_CODE.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        PENDING
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_code, sender);

        if let Err(e) = launch_prompt(&mut env, activity.as_obj(), permission, request_code) {
            PENDING
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&request_code);
            return Err(e);
        }

        receiver
    };

    receiver
        .await
        .map_err(|_| PermissionError::Unknown("permission prompt abandoned".into()))
}
