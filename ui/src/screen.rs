use async_channel::Receiver;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt, future, pin_mut, select_biased};
use geoscreen_location::{LocationEvent, LocationProvider, Subscription, UpdateRequest};
use geoscreen_permission::{Permission, PermissionStatus, Permissions};
use log::debug;

use crate::{Action, Message, ScreenConfig, ScreenState, View};

/// The location screen controller.
///
/// Owns the state container, the two platform collaborators and the live
/// subscription. The subscription lives from mount (or grant) until
/// [`unmount`](Self::unmount) or drop.
#[derive(Debug)]
pub struct LocationScreen<P, L> {
    permissions: P,
    location: L,
    config: ScreenConfig,
    state: ScreenState,
    live: Option<Subscription>,
}

/// Operations in flight. Each resolves to the messages it produced.
type Pending<'a> = FuturesUnordered<LocalBoxFuture<'a, Vec<Message>>>;

enum Step {
    Live(Option<LocationEvent>),
    Settled(Vec<Message>),
    Action(Option<Action>),
}

async fn next_live(live: Option<&mut Subscription>) -> Option<LocationEvent> {
    match live {
        Some(subscription) => subscription.next().await,
        None => future::pending().await,
    }
}

/// Opens the live subscription unless one is already held.
fn open_live<L: LocationProvider>(
    location: &L,
    request: &UpdateRequest,
    state: &mut ScreenState,
    live: &mut Option<Subscription>,
) {
    if live.is_some() {
        return;
    }
    match location.subscribe(request) {
        Ok(subscription) => {
            debug!("subscribed to {request:?}");
            *live = Some(subscription);
        }
        Err(e) => state.apply(Message::SubscribeFailed(e)),
    }
}

/// Applies what a finished operation produced. A granted location prompt
/// opens the live subscription when the config asks for it.
fn settle<L: LocationProvider>(
    location: &L,
    config: &ScreenConfig,
    state: &mut ScreenState,
    live: &mut Option<Subscription>,
    messages: Vec<Message>,
) {
    for message in messages {
        let granted = matches!(
            message,
            Message::PermissionRequested {
                permission: Permission::Location,
                result: Ok(PermissionStatus::Granted),
            }
        );
        state.apply(message);
        if granted && config.subscribe_on_grant {
            open_live(location, &config.updates, state, live);
        }
    }
}

/// Queues the futures `action` starts.
///
/// The location prompt and the last-known read run side by side and settle
/// independently. A refresh reads the fix only once the check says granted.
fn start<'a, P: Permissions, L: LocationProvider>(
    permissions: &'a P,
    location: &'a L,
    action: Action,
    pending: &mut Pending<'a>,
) {
    match action {
        Action::RequestLocationPermission => {
            pending.push(
                async move {
                    let result = permissions.request(Permission::Location).await;
                    vec![Message::PermissionRequested {
                        permission: Permission::Location,
                        result,
                    }]
                }
                .boxed_local(),
            );
            pending.push(
                async move { vec![Message::LastKnown(location.last_location().await)] }
                    .boxed_local(),
            );
        }
        Action::RequestCameraPermission => pending.push(
            async move {
                let result = permissions.request(Permission::Camera).await;
                vec![Message::PermissionRequested {
                    permission: Permission::Camera,
                    result,
                }]
            }
            .boxed_local(),
        ),
        Action::RefreshLocation => pending.push(
            async move {
                let status = permissions.check(Permission::Location).await;
                let checked = Message::PermissionChecked {
                    permission: Permission::Location,
                    status,
                };
                if !status.is_granted() {
                    debug!("refresh skipped, location not granted");
                    return vec![checked];
                }
                vec![checked, Message::LastKnown(location.last_location().await)]
            }
            .boxed_local(),
        ),
    }
}

impl<P: Permissions, L: LocationProvider> LocationScreen<P, L> {
    /// Creates a screen with the default configuration.
    pub fn new(permissions: P, location: L) -> Self {
        Self::with_config(permissions, location, ScreenConfig::default())
    }

    /// Creates a screen with an explicit configuration.
    pub fn with_config(permissions: P, location: L, config: ScreenConfig) -> Self {
        Self {
            permissions,
            location,
            config,
            state: ScreenState::default(),
            live: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ScreenState {
        &self.state
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> View {
        self.state.view()
    }

    /// Whether a live subscription is held.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.live.is_some()
    }

    async fn check(&mut self, permission: Permission) -> PermissionStatus {
        let status = self.permissions.check(permission).await;
        self.state.apply(Message::PermissionChecked { permission, status });
        status
    }

    /// Resets the coordinates, checks both permissions and, if location is
    /// granted, opens the live subscription.
    pub async fn mount(&mut self) {
        self.unmount();
        self.state = ScreenState::default();

        self.check(Permission::Camera).await;
        if self.check(Permission::Location).await.is_granted() {
            open_live(
                &self.location,
                &self.config.updates,
                &mut self.state,
                &mut self.live,
            );
        }
    }

    /// Releases the live subscription.
    pub fn unmount(&mut self) {
        if self.live.take().is_some() {
            debug!("location screen unmounted");
        }
    }

    /// Prompts for location access and, at the same time, reads the
    /// last-known fix whatever the prompt's outcome. Each result is applied
    /// as soon as it arrives.
    pub async fn request_location_permission(&mut self) {
        self.handle(Action::RequestLocationPermission).await;
    }

    /// Prompts for camera access.
    pub async fn request_camera_permission(&mut self) {
        self.handle(Action::RequestCameraPermission).await;
    }

    /// Re-reads the last-known fix if location access is currently granted.
    pub async fn refresh_location(&mut self) {
        self.handle(Action::RefreshLocation).await;
    }

    /// Runs the operation bound to `action` to completion.
    ///
    /// Live events are not applied meanwhile; [`run`](Self::run) interleaves
    /// them.
    pub async fn handle(&mut self, action: Action) {
        let Self {
            permissions,
            location,
            config,
            state,
            live,
        } = self;
        let location = &*location;

        let mut pending = Pending::new();
        start(&*permissions, location, action, &mut pending);
        while let Some(messages) = pending.next().await {
            settle(location, config, state, live, messages);
        }
    }

    /// Waits for the next live event and applies it.
    ///
    /// Returns `false` without waiting if there is no subscription, and
    /// releases the subscription if its stream has ended.
    pub async fn pump_live(&mut self) -> bool {
        let Some(subscription) = self.live.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(event) => {
                self.state.apply(Message::Live(event));
                true
            }
            None => {
                debug!("live location stream ended");
                self.live = None;
                false
            }
        }
    }

    /// Mounts the screen and reacts to actions, finished operations and live
    /// events until the action channel closes, calling `render` after every
    /// change.
    ///
    /// Operations run concurrently with each other and with live delivery, so
    /// an unanswered prompt holds up nothing. Operations still in flight when
    /// the channel closes are dropped.
    ///
    /// Returns the final state after the subscription has been released.
    pub async fn run(
        mut self,
        actions: Receiver<Action>,
        mut render: impl FnMut(&View),
    ) -> ScreenState {
        self.mount().await;
        render(&self.view());

        {
            let Self {
                permissions,
                location,
                config,
                state,
                live,
            } = &mut self;
            let (permissions, location) = (&*permissions, &*location);
            let mut pending = Pending::new();

            loop {
                let step = {
                    let event = next_live(live.as_mut()).fuse();
                    let action = actions.recv().fuse();
                    pin_mut!(event, action);

                    select_biased! {
                        event = event => Step::Live(event),
                        messages = pending.select_next_some() => Step::Settled(messages),
                        action = action => Step::Action(action.ok()),
                    }
                };

                match step {
                    Step::Live(Some(event)) => state.apply(Message::Live(event)),
                    Step::Live(None) => {
                        debug!("live location stream ended");
                        *live = None;
                    }
                    Step::Settled(messages) => settle(location, config, state, live, messages),
                    Step::Action(Some(action)) => {
                        start(permissions, location, action, &mut pending);
                        continue;
                    }
                    Step::Action(None) => break,
                }
                render(&state.view());
            }
        }

        self.unmount();
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_channel::Sender;
    use geoscreen_location::{
        Coordinate, Location, LocationError, LocationResult, Provider, UpdateRequest,
    };
    use geoscreen_permission::PermissionError;
    use geoscreen_permission::PermissionStatus::{Denied, Granted};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use crate::{ScreenError, Widget};

    #[derive(Default)]
    struct PermissionScript {
        statuses: HashMap<Permission, PermissionStatus>,
        answers: HashMap<Permission, Result<PermissionStatus, PermissionError>>,
        unanswered: HashSet<Permission>,
        prompts: Vec<Permission>,
    }

    #[derive(Clone, Default)]
    struct FakePermissions(Rc<RefCell<PermissionScript>>);

    impl FakePermissions {
        fn with(location: PermissionStatus, camera: PermissionStatus) -> Self {
            let fake = Self::default();
            fake.set(Permission::Location, location);
            fake.set(Permission::Camera, camera);
            fake
        }

        fn set(&self, permission: Permission, status: PermissionStatus) {
            self.0.borrow_mut().statuses.insert(permission, status);
        }

        fn answer(
            &self,
            permission: Permission,
            answer: Result<PermissionStatus, PermissionError>,
        ) {
            self.0.borrow_mut().answers.insert(permission, answer);
        }

        /// Prompts for `permission` never come back, like a dialog the
        /// system dismissed without reporting.
        fn leave_unanswered(&self, permission: Permission) {
            self.0.borrow_mut().unanswered.insert(permission);
        }

        fn prompts(&self) -> Vec<Permission> {
            self.0.borrow().prompts.clone()
        }
    }

    impl Permissions for FakePermissions {
        async fn check(&self, permission: Permission) -> PermissionStatus {
            self.0
                .borrow()
                .statuses
                .get(&permission)
                .copied()
                .unwrap_or(PermissionStatus::Denied)
        }

        async fn request(
            &self,
            permission: Permission,
        ) -> Result<PermissionStatus, PermissionError> {
            let unanswered = {
                let mut script = self.0.borrow_mut();
                script.prompts.push(permission);
                script.unanswered.contains(&permission)
            };
            if unanswered {
                return future::pending().await;
            }

            let mut script = self.0.borrow_mut();
            let answer = script.answers.get(&permission).cloned();
            match answer {
                Some(Ok(status)) => {
                    script.statuses.insert(permission, status);
                    Ok(status)
                }
                Some(Err(e)) => Err(e),
                None => Ok(script
                    .statuses
                    .get(&permission)
                    .copied()
                    .unwrap_or(PermissionStatus::Denied)),
            }
        }
    }

    struct LocationScript {
        last: LocationResult<Location>,
        queries: usize,
        subscribe_error: Option<LocationError>,
        requests: Vec<UpdateRequest>,
        feeds: Vec<Sender<LocationEvent>>,
    }

    #[derive(Clone)]
    struct FakeLocation(Rc<RefCell<LocationScript>>);

    impl FakeLocation {
        fn new(last: LocationResult<Location>) -> Self {
            Self(Rc::new(RefCell::new(LocationScript {
                last,
                queries: 0,
                subscribe_error: None,
                requests: Vec::new(),
                feeds: Vec::new(),
            })))
        }

        fn fail_subscribe(&self, error: LocationError) {
            self.0.borrow_mut().subscribe_error = Some(error);
        }

        fn queries(&self) -> usize {
            self.0.borrow().queries
        }

        fn requests(&self) -> Vec<UpdateRequest> {
            self.0.borrow().requests.clone()
        }

        fn push(&self, event: LocationEvent) {
            let script = self.0.borrow();
            let feed = script.feeds.last().expect("no subscription opened");
            feed.try_send(event).expect("subscription already released");
        }

        fn end_stream(&self) {
            self.0.borrow_mut().feeds.clear();
        }

        fn is_live(&self) -> bool {
            self.0.borrow().feeds.iter().any(|feed| !feed.is_closed())
        }
    }

    impl LocationProvider for FakeLocation {
        async fn last_location(&self) -> LocationResult<Location> {
            let mut script = self.0.borrow_mut();
            script.queries += 1;
            script.last.clone()
        }

        fn subscribe(&self, request: &UpdateRequest) -> LocationResult<Subscription> {
            let mut script = self.0.borrow_mut();
            if let Some(e) = script.subscribe_error.clone() {
                return Err(e);
            }
            let (sender, receiver) = async_channel::unbounded();
            script.requests.push(request.clone());
            script.feeds.push(sender);
            Ok(Subscription::new(request.clone(), receiver))
        }
    }

    fn fix(latitude: f64, longitude: f64) -> Location {
        Location::new(latitude, longitude, "gps")
    }

    fn changed(latitude: f64, longitude: f64) -> LocationEvent {
        LocationEvent::LocationChanged(fix(latitude, longitude))
    }

    #[tokio::test]
    async fn mount_with_location_granted_subscribes_to_gps() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;

        assert!(screen.is_subscribed());
        let requests = location.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider, Provider::Gps);
        assert_eq!(requests[0].min_interval_ms, 1000);
        assert!((requests[0].min_displacement_m - 1.0).abs() < f64::EPSILON);

        let view = screen.view();
        assert_eq!(
            view.location_permission,
            Widget::Text("Location permission Granted".into())
        );
        assert_eq!(
            view.actions(),
            vec![Action::RequestCameraPermission, Action::RefreshLocation]
        );
    }

    #[tokio::test]
    async fn mount_without_location_does_not_subscribe() {
        let permissions = FakePermissions::with(Denied, Granted);
        let location = FakeLocation::new(Ok(fix(1.0, 1.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;

        assert!(!screen.is_subscribed());
        assert!(location.requests().is_empty());
        assert_eq!(location.queries(), 0);
        assert_eq!(screen.state().last_known, Coordinate::default());
        assert_eq!(screen.state().live, Coordinate::default());
    }

    #[tokio::test]
    async fn granting_location_replaces_the_button() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Location, Ok(PermissionStatus::Granted));
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions.clone(), location);

        screen.mount().await;
        assert!(screen.view().actions().contains(&Action::RequestLocationPermission));

        screen.handle(Action::RequestLocationPermission).await;

        assert_eq!(permissions.prompts(), vec![Permission::Location]);
        assert_eq!(
            screen.view().location_permission,
            Widget::Text("Location permission Granted".into())
        );
        assert!(!screen.view().actions().contains(&Action::RequestLocationPermission));
    }

    #[tokio::test]
    async fn request_reads_last_known_whatever_the_answer() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Location, Ok(PermissionStatus::Denied));
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.request_location_permission().await;

        assert_eq!(location.queries(), 1);
        assert_eq!(screen.state().location_permission, PermissionStatus::Denied);
        assert_eq!(screen.state().last_known, Coordinate::new(37.0, -122.0));
        assert!(!screen.is_subscribed());
    }

    #[tokio::test]
    async fn refresh_shows_one_shot_fix() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.handle(Action::RefreshLocation).await;

        let view = screen.view();
        assert_eq!(view.last_known_longitude, "Long:-122.0");
        assert_eq!(view.last_known_latitude, "Lat:37.0");
        assert_eq!(view.live_longitude, "Long Right Now:0.0");
        assert_eq!(view.live_latitude, "Lat Right Now:0.0");
    }

    #[tokio::test]
    async fn refresh_while_denied_performs_no_query() {
        let permissions = FakePermissions::with(Denied, Denied);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        let before = screen.state().clone();
        screen.refresh_location().await;

        assert_eq!(location.queries(), 0);
        assert_eq!(screen.state().last_known, before.last_known);
        assert_eq!(screen.state().live, before.live);
    }

    #[tokio::test]
    async fn refresh_notices_revocation() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let mut screen = LocationScreen::new(permissions.clone(), location.clone());

        screen.mount().await;
        permissions.set(Permission::Location, PermissionStatus::Denied);
        screen.refresh_location().await;

        assert_eq!(location.queries(), 0);
        assert_eq!(screen.state().location_permission, PermissionStatus::Denied);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_value() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(10.0, 20.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.refresh_location().await;
        location.0.borrow_mut().last = Err(LocationError::NotAvailable);
        screen.refresh_location().await;

        assert_eq!(location.queries(), 2);
        assert_eq!(screen.state().last_known, Coordinate::new(10.0, 20.0));
        assert_eq!(
            screen.state().last_error,
            Some(ScreenError::LastKnown(LocationError::NotAvailable))
        );
    }

    #[tokio::test]
    async fn live_events_update_only_live_fields() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.refresh_location().await;
        location.push(changed(40.7, -74.0));
        assert!(screen.pump_live().await);

        let view = screen.view();
        assert_eq!(view.live_longitude, "Long Right Now:-74.0");
        assert_eq!(view.live_latitude, "Lat Right Now:40.7");
        assert_eq!(view.last_known_longitude, "Long:-122.0");
        assert_eq!(view.last_known_latitude, "Lat:37.0");
    }

    #[tokio::test]
    async fn subscribe_failure_is_recorded() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        location.fail_subscribe(LocationError::PermissionDenied);
        let mut screen = LocationScreen::new(permissions, location);

        screen.mount().await;

        assert!(!screen.is_subscribed());
        assert_eq!(
            screen.state().last_error,
            Some(ScreenError::Subscribe(LocationError::PermissionDenied))
        );
        assert_eq!(screen.state().live, Coordinate::default());
        assert!(!screen.pump_live().await);
    }

    #[tokio::test]
    async fn camera_prompt_leaves_location_alone() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Camera, Ok(PermissionStatus::Granted));
        let location = FakeLocation::new(Ok(fix(1.0, 2.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.handle(Action::RequestCameraPermission).await;

        assert_eq!(screen.state().camera_permission, PermissionStatus::Granted);
        assert_eq!(screen.state().location_permission, PermissionStatus::Denied);
        assert_eq!(location.queries(), 0);
        assert_eq!(screen.state().last_known, Coordinate::default());
        assert_eq!(
            screen.view().camera_permission,
            Widget::Text("Camera permission Granted".into())
        );
    }

    #[tokio::test]
    async fn camera_prompt_error_is_recorded() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Camera, Err(PermissionError::NotSupported));
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions, location);

        screen.mount().await;
        screen.request_camera_permission().await;

        assert_eq!(screen.state().camera_permission, PermissionStatus::Denied);
        assert_eq!(
            screen.state().last_error,
            Some(ScreenError::Permission {
                permission: Permission::Camera,
                source: PermissionError::NotSupported,
            })
        );
    }

    #[tokio::test]
    async fn grant_starts_live_updates() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Location, Ok(PermissionStatus::Granted));
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        assert!(!screen.is_subscribed());
        screen.request_location_permission().await;

        assert!(screen.is_subscribed());
        location.push(changed(5.0, 6.0));
        assert!(screen.pump_live().await);
        assert_eq!(screen.state().live, Coordinate::new(5.0, 6.0));
    }

    #[tokio::test]
    async fn grant_waits_for_remount_when_configured() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.answer(Permission::Location, Ok(PermissionStatus::Granted));
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let config = ScreenConfig {
            subscribe_on_grant: false,
            ..ScreenConfig::default()
        };
        let mut screen = LocationScreen::with_config(permissions, location.clone(), config);

        screen.mount().await;
        screen.request_location_permission().await;
        assert!(!screen.is_subscribed());

        screen.mount().await;
        assert!(screen.is_subscribed());
        assert_eq!(location.requests().len(), 1);
    }

    #[tokio::test]
    async fn unmount_and_drop_release_the_subscription() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        assert!(location.is_live());
        screen.unmount();
        assert!(!location.is_live());

        screen.mount().await;
        assert!(location.is_live());
        drop(screen);
        assert!(!location.is_live());
    }

    #[tokio::test]
    async fn remount_resets_coordinates() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(3.0, 4.0)));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        screen.refresh_location().await;
        location.push(changed(1.0, 2.0));
        screen.pump_live().await;
        screen.mount().await;

        assert_eq!(screen.state().last_known, Coordinate::default());
        assert_eq!(screen.state().live, Coordinate::default());
        assert_eq!(location.requests().len(), 2);
    }

    #[tokio::test]
    async fn ended_stream_releases_the_subscription() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Err(LocationError::NotAvailable));
        let mut screen = LocationScreen::new(permissions, location.clone());

        screen.mount().await;
        location.end_stream();

        assert!(!screen.pump_live().await);
        assert!(!screen.is_subscribed());
    }

    #[tokio::test]
    async fn run_applies_actions_and_live_events() {
        let permissions = FakePermissions::with(Granted, Denied);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let screen = LocationScreen::new(permissions, location.clone());
        let (actions, inbox) = async_channel::unbounded();
        let mut frames = Vec::new();

        let driver = {
            let location = location.clone();
            async move {
                location.push(changed(40.7, -74.0));
                actions.send(Action::RefreshLocation).await.unwrap();
            }
        };
        let (state, ()) = futures::join!(
            screen.run(inbox, |view| frames.push(view.to_string())),
            driver,
        );

        assert_eq!(state.last_known, Coordinate::new(37.0, -122.0));
        assert_eq!(state.live, Coordinate::new(40.7, -74.0));
        // Mount, one live event, one action.
        assert_eq!(frames.len(), 3);
        assert!(frames[0].contains("Long:0.0"));
        assert!(frames[2].contains("Long:-122.0"));
        assert!(!location.is_live());
    }

    #[tokio::test]
    async fn unanswered_prompt_does_not_stall_the_screen() {
        let permissions = FakePermissions::with(Granted, Denied);
        permissions.leave_unanswered(Permission::Camera);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let screen = LocationScreen::new(permissions.clone(), location.clone());
        let (actions, inbox) = async_channel::unbounded();
        let mut frames = Vec::new();

        let driver = {
            let location = location.clone();
            async move {
                actions.send(Action::RequestCameraPermission).await.unwrap();
                location.push(changed(40.7, -74.0));
                actions.send(Action::RefreshLocation).await.unwrap();
            }
        };
        let (state, ()) = futures::join!(
            screen.run(inbox, |view| frames.push(view.to_string())),
            driver,
        );

        assert_eq!(permissions.prompts(), vec![Permission::Camera]);
        assert_eq!(state.camera_permission, PermissionStatus::Denied);
        assert_eq!(state.live, Coordinate::new(40.7, -74.0));
        assert_eq!(state.last_known, Coordinate::new(37.0, -122.0));
        assert_eq!(location.queries(), 1);
        // Mount, the live event, the settled refresh.
        assert_eq!(frames.len(), 3);
        assert!(frames[2].contains("[Request camera permission]"));
        assert!(!location.is_live());
    }

    #[tokio::test]
    async fn last_known_shows_while_location_prompt_is_open() {
        let permissions = FakePermissions::with(Denied, Denied);
        permissions.leave_unanswered(Permission::Location);
        let location = FakeLocation::new(Ok(fix(37.0, -122.0)));
        let screen = LocationScreen::new(permissions.clone(), location.clone());
        let (actions, inbox) = async_channel::unbounded();
        let mut frames = Vec::new();

        let driver = async move {
            actions
                .send(Action::RequestLocationPermission)
                .await
                .unwrap();
        };
        let (state, ()) = futures::join!(
            screen.run(inbox, |view| frames.push(view.to_string())),
            driver,
        );

        assert_eq!(permissions.prompts(), vec![Permission::Location]);
        assert_eq!(location.queries(), 1);
        assert_eq!(state.location_permission, PermissionStatus::Denied);
        assert_eq!(state.last_known, Coordinate::new(37.0, -122.0));
        assert_eq!(frames.len(), 2);
        assert!(frames[1].contains("Long:-122.0"));
        assert!(frames[1].contains("[Request location permission]"));
    }
}
