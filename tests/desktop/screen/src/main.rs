//! Desktop test binary for geoscreen-ui.
//!
//! Run with: cargo run -p geoscreen-screen-test [config.json]
//!
//! Keys: `l` request location, `c` request camera, `r` update location,
//! `q` quit.

use std::io::BufRead;

use geoscreen_location::SystemLocation;
use geoscreen_permission::SystemPermissions;
use geoscreen_ui::{Action, LocationScreen, ScreenConfig};

fn load_config() -> ScreenConfig {
    let Some(path) = std::env::args().nth(1) else {
        return ScreenConfig::default();
    };

    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|json| ScreenConfig::from_json(&json).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring {path}: {e}");
            ScreenConfig::default()
        }
    }
}

fn parse(line: &str) -> Option<Option<Action>> {
    match line.trim() {
        "l" => Some(Some(Action::RequestLocationPermission)),
        "c" => Some(Some(Action::RequestCameraPermission)),
        "r" => Some(Some(Action::RefreshLocation)),
        "q" => Some(None),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("=== Geoscreen Location Screen Test ===");
    println!("l: request location | c: request camera | r: update location | q: quit\n");

    let (actions, inbox) = async_channel::unbounded();

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse(&line) {
                Some(Some(action)) => {
                    if actions.send_blocking(action).is_err() {
                        break;
                    }
                }
                Some(None) => break,
                None => println!("unknown command: {}", line.trim()),
            }
        }
        // Dropping `actions` closes the screen.
    });

    let screen = LocationScreen::with_config(SystemPermissions, SystemLocation, load_config());
    let state = screen.run(inbox, |view| println!("{view}\n")).await;

    if let Some(error) = state.last_error {
        println!("last error: {error}");
    }
}
