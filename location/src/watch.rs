//! Continuous updates synthesized from a one-shot source.
//!
//! Backends without a push API poll their last-known fix every
//! `min_interval` and emit only fixes that moved at least
//! `min_displacement_m` from the previous emitted one.

use std::collections::VecDeque;
use std::future::Future;

use futures::stream;

use crate::{
    Coordinate, Location, LocationError, LocationEvent, LocationResult, Subscription, UpdateRequest,
};

struct PollState<F> {
    fetch: F,
    request: UpdateRequest,
    last_emitted: Option<Coordinate>,
    enabled: Option<bool>,
    queued: VecDeque<LocationEvent>,
    primed: bool,
}

impl<F> PollState<F> {
    fn observe(&mut self, result: LocationResult<Location>) -> bool {
        let provider = self.request.provider.name();
        match result {
            Ok(fix) => {
                if self.enabled == Some(false) {
                    self.queued
                        .push_back(LocationEvent::ProviderEnabled(provider.to_owned()));
                }
                self.enabled = Some(true);

                let moved = self.last_emitted.is_none_or(|last| {
                    last.distance_to(&fix.coordinate()) >= self.request.min_displacement_m
                });
                if moved {
                    self.last_emitted = Some(fix.coordinate());
                    self.queued.push_back(LocationEvent::LocationChanged(fix));
                }
            }
            Err(LocationError::ServiceDisabled) => {
                if self.enabled != Some(false) {
                    self.queued
                        .push_back(LocationEvent::ProviderDisabled(provider.to_owned()));
                }
                self.enabled = Some(false);
            }
            Err(LocationError::PermissionDenied) => {
                log::warn!("location permission revoked, ending {provider} updates");
                return false;
            }
            Err(e) => log::debug!("no {provider} fix this round: {e}"),
        }
        true
    }
}

/// Builds a [`Subscription`] that polls `fetch` at the request's interval.
///
/// The first poll happens immediately. The stream ends if `fetch` reports
/// [`LocationError::PermissionDenied`].
pub fn poll_updates<F, Fut>(request: UpdateRequest, fetch: F) -> Subscription
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = LocationResult<Location>> + Send + 'static,
{
    let state = PollState {
        fetch,
        request: request.clone(),
        last_emitted: None,
        enabled: None,
        queued: VecDeque::new(),
        primed: false,
    };

    let events = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queued.pop_front() {
                return Some((event, state));
            }

            if state.primed {
                futures_timer::Delay::new(state.request.min_interval()).await;
            }
            state.primed = true;

            let result = (state.fetch)().await;
            if !state.observe(result) {
                return None;
            }
        }
    });

    Subscription::new(request, events)
}
