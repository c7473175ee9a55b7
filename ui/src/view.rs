use std::fmt;

use geoscreen_permission::{Permission, PermissionStatus};

use crate::ScreenState;

/// A user action bound to a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Prompt for fine location access and read the last-known fix.
    RequestLocationPermission,
    /// Prompt for camera access.
    RequestCameraPermission,
    /// Re-read the last-known fix if location access is granted.
    RefreshLocation,
}

/// A single element on the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Static text.
    Text(String),
    /// A button that dispatches `action` when tapped.
    Button {
        /// Button caption.
        label: String,
        /// Action dispatched on tap.
        action: Action,
    },
}

impl Widget {
    fn button(label: &str, action: Action) -> Self {
        Self::Button {
            label: label.to_owned(),
            action,
        }
    }

    /// The action bound to this widget, if it is a button.
    #[must_use]
    pub const fn action(&self) -> Option<Action> {
        match self {
            Self::Text(_) => None,
            Self::Button { action, .. } => Some(*action),
        }
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Button { label, .. } => write!(f, "[{label}]"),
        }
    }
}

/// Renderable snapshot of a [`ScreenState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Granted text or the location request button.
    pub location_permission: Widget,
    /// Granted text or the camera request button.
    pub camera_permission: Widget,
    /// `Long:` line for the last-known fix.
    pub last_known_longitude: String,
    /// `Lat:` line for the last-known fix.
    pub last_known_latitude: String,
    /// The "Update Location" button.
    pub refresh: Widget,
    /// `Long Right Now:` line for the live fix.
    pub live_longitude: String,
    /// `Lat Right Now:` line for the live fix.
    pub live_latitude: String,
}

impl View {
    /// Actions of every visible button, top to bottom.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        [
            &self.location_permission,
            &self.camera_permission,
            &self.refresh,
        ]
        .into_iter()
        .filter_map(Widget::action)
        .collect()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} | {}", self.location_permission, self.camera_permission)?;
        writeln!(f, "{}", self.last_known_longitude)?;
        writeln!(f, "{}", self.last_known_latitude)?;
        writeln!(f, "{}", self.refresh)?;
        writeln!(f, "{}", self.live_longitude)?;
        write!(f, "{}", self.live_latitude)
    }
}

/// Formats degrees the way the platform's double-to-string does: plain
/// decimals with at least one fractional digit (`37.0`, `-122.0`) between
/// 10^-3 and 10^7, and `1.0E-7` style notation outside that range.
fn degrees(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let magnitude = value.abs();
    if value.is_nan() || magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{value:?}");
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

fn permission_widget(permission: Permission, status: PermissionStatus) -> Widget {
    match (permission, status) {
        (_, PermissionStatus::Granted) => Widget::Text(format!("{permission} permission Granted")),
        (Permission::Location, _) => {
            Widget::button("Request location permission", Action::RequestLocationPermission)
        }
        (Permission::Camera, _) => {
            Widget::button("Request camera permission", Action::RequestCameraPermission)
        }
    }
}

impl ScreenState {
    /// Derives the renderable view.
    #[must_use]
    pub fn view(&self) -> View {
        View {
            location_permission: permission_widget(Permission::Location, self.location_permission),
            camera_permission: permission_widget(Permission::Camera, self.camera_permission),
            last_known_longitude: format!("Long:{}", degrees(self.last_known.longitude)),
            last_known_latitude: format!("Lat:{}", degrees(self.last_known.latitude)),
            refresh: Widget::button("Update Location", Action::RefreshLocation),
            live_longitude: format!("Long Right Now:{}", degrees(self.live.longitude)),
            live_latitude: format!("Lat Right Now:{}", degrees(self.live.latitude)),
        }
    }
}
