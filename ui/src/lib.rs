//! A permission-gated location screen.
//!
//! The screen gates two permissions (fine location and camera) and, once
//! location access is granted, shows both the last-known fix and a live
//! stream of updates.
//!
//! All mutable data lives in one [`ScreenState`]. Platform callbacks never
//! touch it directly: they become [`Message`]s applied by
//! [`ScreenState::apply`], and the renderer only ever sees the derived
//! [`View`].
//!
//! ```ignore
//! use geoscreen_ui::{Action, LocationScreen};
//! use geoscreen_location::SystemLocation;
//! use geoscreen_permission::SystemPermissions;
//!
//! let (actions, inbox) = async_channel::unbounded::<Action>();
//! let screen = LocationScreen::new(SystemPermissions, SystemLocation);
//! let final_state = screen.run(inbox, |view| println!("{view}")).await;
//! ```

#![warn(missing_docs)]

mod config;
mod screen;
mod state;
mod view;

pub use config::{ConfigError, ScreenConfig};
pub use screen::LocationScreen;
pub use state::{Message, ScreenError, ScreenState};
pub use view::{Action, View, Widget};
