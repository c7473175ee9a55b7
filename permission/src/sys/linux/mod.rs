//! Linux permission implementation.
//!
//! Traditional Linux desktops have no runtime permission prompts: camera
//! access is governed by device node ownership and location by GeoClue's own
//! agent. Both permissions are reported as granted.

use crate::{Permission, PermissionError, PermissionStatus};

pub(crate) async fn check(permission: Permission) -> PermissionStatus {
    log::debug!("{permission} permission is implicit on Linux");
    PermissionStatus::Granted
}

pub(crate) async fn request(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    Ok(check(permission).await)
}
