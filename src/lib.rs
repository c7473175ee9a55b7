//! # Geoscreen
//!
//! A permission-gated location screen and the small platform kit behind it.
//!
//! Geoscreen is split into feature-gated crates so an application can pull in
//! only the layers it needs:
//!
//! - `permission`: location and camera permission checks and prompts.
//! - `location`: last-known fixes and continuous location subscriptions.
//! - `ui`: the screen itself (state container, view model, driver loop).
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geoscreen = { version = "0.1", features = ["ui"] }
//! ```
//!
//! ```ignore
//! use geoscreen::location::SystemLocation;
//! use geoscreen::permission::SystemPermissions;
//! use geoscreen::ui::LocationScreen;
//!
//! async fn show(actions: async_channel::Receiver<geoscreen::ui::Action>) {
//!     let screen = LocationScreen::new(SystemPermissions, SystemLocation);
//!     screen.run(actions, |view| println!("{view}")).await;
//! }
//! ```

#[cfg(feature = "location")]
pub use geoscreen_location as location;

#[cfg(feature = "permission")]
pub use geoscreen_permission as permission;

#[cfg(feature = "ui")]
pub use geoscreen_ui as ui;
