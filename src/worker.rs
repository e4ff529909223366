//! Background worker that turns desired flags into synthetic input.
//!
//! Holds are edge-triggered: the worker keeps a private shadow of what it has
//! physically pressed and only calls the injector when a desired flag and its
//! shadow bit disagree. Spam clicking is rate limited against a monotonic
//! clock, so a late tick produces one click rather than a backlog.
//!
//! Whatever happens, the worker releases every hold target before [`WorkerLoop::run`]
//! returns. Nothing may stay physically pressed after the process exits.

use crate::action::{Action, HoldAction, MouseButton};
use crate::error::Result;
use crate::injector::InputInjector;
use crate::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace};

/// Minimum spacing between two spam clicks.
pub const CLICK_INTERVAL: Duration = Duration::from_millis(30);

/// Tick while something is desired or held.
pub const ACTIVE_TICK: Duration = Duration::from_millis(1);

/// Tick while suspended; nothing needs injecting.
pub const SUSPENDED_TICK: Duration = Duration::from_millis(20);

/// Tick while nothing is desired. State changes wake the worker early.
pub const IDLE_TICK: Duration = Duration::from_millis(20);

/// What the worker currently has physically pressed.
#[derive(Debug, Default, Clone, Copy)]
struct ShadowState {
    asserted: [bool; 4],
}

impl ShadowState {
    fn is_asserted(&self, hold: HoldAction) -> bool {
        self.asserted[hold.slot()]
    }

    fn set(&mut self, hold: HoldAction, asserted: bool) {
        self.asserted[hold.slot()] = asserted;
    }

    fn any(&self) -> bool {
        self.asserted.iter().any(|a| *a)
    }
}

pub struct WorkerLoop<I: ?Sized> {
    state: Arc<SharedState>,
    injector: Arc<I>,
    shadow: ShadowState,
    last_click: Option<Instant>,
}

impl<I: InputInjector + ?Sized> WorkerLoop<I> {
    pub fn new(state: Arc<SharedState>, injector: Arc<I>) -> Self {
        Self {
            state,
            injector,
            shadow: ShadowState::default(),
            last_click: None,
        }
    }

    /// Whether the worker currently holds `hold` down.
    pub fn is_asserted(&self, hold: HoldAction) -> bool {
        self.shadow.is_asserted(hold)
    }

    /// Run one reconciliation pass and return how long to wait before the next.
    pub fn tick(&mut self, now: Instant) -> Duration {
        if self.state.flags.is_suspended() {
            self.release_asserted();
            return SUSPENDED_TICK;
        }

        for hold in HoldAction::ALL {
            self.reconcile(hold);
        }
        self.generate_click(now);

        if self.shadow.any() || self.state.actions.any_desired() {
            ACTIVE_TICK
        } else {
            IDLE_TICK
        }
    }

    fn reconcile(&mut self, hold: HoldAction) {
        let desired = self.state.actions.is_desired(hold.action());
        if desired == self.shadow.is_asserted(hold) {
            return;
        }
        debug!(?hold, pressed = desired, "hold edge");
        fire(self.injector.set_hold(hold.target(), desired));
        self.shadow.set(hold, desired);
    }

    fn generate_click(&mut self, now: Instant) {
        if !self.state.actions.is_desired(Action::SpamClick) {
            return;
        }
        if let Some(last) = self.last_click {
            if now.saturating_duration_since(last) < CLICK_INTERVAL {
                return;
            }
        }
        let Some(point) = self.state.actions.saved_point() else {
            return;
        };

        trace!(%point, "click");
        fire(self.injector.move_pointer(point));
        fire(self.injector.set_button(MouseButton::Left, true));
        fire(self.injector.set_button(MouseButton::Left, false));
        // The pulse let go of a held left button; put it back down.
        if self.shadow.is_asserted(HoldAction::Primary) {
            fire(self.injector.set_button(MouseButton::Left, true));
        }
        self.last_click = Some(now);
    }

    fn release_asserted(&mut self) {
        for hold in HoldAction::ALL {
            if self.shadow.is_asserted(hold) {
                debug!(?hold, "releasing for suspend");
                fire(self.injector.set_hold(hold.target(), false));
                self.shadow.set(hold, false);
            }
        }
    }

    /// Release every hold target, whether or not the shadow says it is down.
    pub fn release_all(&mut self) {
        for hold in HoldAction::ALL {
            fire(self.injector.set_hold(hold.target(), false));
            self.shadow.set(hold, false);
        }
    }

    /// Tick until `running` goes false, then release everything.
    pub async fn run(mut self) {
        let state = Arc::clone(&self.state);
        info!("worker started");

        while state.flags.is_running() {
            let pause = self.tick(Instant::now());
            tokio::select! {
                _ = sleep(pause) => {}
                _ = state.changed() => {}
            }
        }

        self.release_all();
        state.actions.clear_all();
        info!("worker stopped; all keys and buttons released");
    }
}

// Injection is fire-and-forget; a failed call is not retried.
fn fire(result: Result<()>) {
    if let Err(e) = result {
        debug!(error = %e, "injector call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{HoldTarget, ScreenPoint};
    use crate::injector::{InjectedInput, RecordingInjector};

    fn setup() -> (Arc<SharedState>, Arc<RecordingInjector>, WorkerLoop<RecordingInjector>) {
        let state = Arc::new(SharedState::new());
        let injector = Arc::new(RecordingInjector::new());
        let worker = WorkerLoop::new(Arc::clone(&state), Arc::clone(&injector));
        (state, injector, worker)
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_hold_is_pressed_once_per_edge() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();

        state.actions.toggle(Action::HoldForward);
        for i in 0..50 {
            worker.tick(ms(t0, i));
        }
        assert!(worker.is_asserted(HoldAction::Forward));
        assert_eq!(injector.calls(), vec![InjectedInput::Key { key: 'w', down: true }]);

        state.actions.toggle(Action::HoldForward);
        for i in 50..100 {
            worker.tick(ms(t0, i));
        }
        assert!(!worker.is_asserted(HoldAction::Forward));
        assert_eq!(injector.count(HoldTarget::Key('w'), true), 1);
        assert_eq!(injector.count(HoldTarget::Key('w'), false), 1);
    }

    #[test]
    fn test_double_toggle_between_ticks_is_net_zero() {
        let (state, injector, mut worker) = setup();
        state.actions.toggle(Action::HoldPrimary);
        state.actions.toggle(Action::HoldPrimary);
        worker.tick(Instant::now());
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_suspend_releases_and_blocks_new_asserts() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();

        state.actions.toggle(Action::HoldForward);
        state.actions.toggle(Action::HoldSecondary);
        worker.tick(t0);
        injector.clear();

        state.flags.toggle_suspended();
        assert_eq!(worker.tick(ms(t0, 1)), SUSPENDED_TICK);
        assert_eq!(injector.count(HoldTarget::Key('w'), false), 1);
        assert_eq!(
            injector.count(HoldTarget::Button(MouseButton::Right), false),
            1
        );
        assert_eq!(injector.calls().len(), 2);

        // Desired flags stay on, and even a new one is not asserted.
        state.actions.toggle(Action::HoldBackward);
        for i in 2..40 {
            worker.tick(ms(t0, i));
        }
        assert_eq!(injector.calls().len(), 2);
        assert!(state.actions.is_desired(Action::HoldForward));

        state.flags.toggle_suspended();
        worker.tick(ms(t0, 40));
        assert_eq!(injector.count(HoldTarget::Key('w'), true), 1);
        assert_eq!(injector.count(HoldTarget::Key('s'), true), 1);
        assert_eq!(
            injector.count(HoldTarget::Button(MouseButton::Right), true),
            1
        );
    }

    #[test]
    fn test_clicks_are_rate_limited() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();
        state.actions.save_point(ScreenPoint::new(500, 300));
        state.actions.toggle(Action::SpamClick);

        for i in 0..100 {
            worker.tick(ms(t0, i));
        }

        let calls = injector.calls();
        let clicks = calls
            .iter()
            .filter(|c| matches!(c, InjectedInput::Button { down: true, .. }))
            .count();
        assert_eq!(clicks, 4); // t = 0, 30, 60, 90
        assert_eq!(
            &calls[..3],
            &[
                InjectedInput::Move(ScreenPoint::new(500, 300)),
                InjectedInput::Button {
                    button: MouseButton::Left,
                    down: true
                },
                InjectedInput::Button {
                    button: MouseButton::Left,
                    down: false
                },
            ]
        );
    }

    #[test]
    fn test_missed_clicks_are_coalesced() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();
        state.actions.save_point(ScreenPoint::new(10, 10));
        state.actions.toggle(Action::SpamClick);
        worker.tick(t0);

        state.flags.toggle_suspended();
        for i in 1..500 {
            worker.tick(ms(t0, i));
        }
        state.flags.toggle_suspended();
        injector.clear();

        worker.tick(ms(t0, 500));
        worker.tick(ms(t0, 510));
        worker.tick(ms(t0, 529));
        assert_eq!(injector.click_times().len(), 1);
        worker.tick(ms(t0, 530));
        assert_eq!(injector.click_times().len(), 2);
    }

    #[test]
    fn test_spam_stops_when_toggled_off() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();
        state.actions.save_point(ScreenPoint::new(500, 300));
        state.actions.toggle(Action::SpamClick);
        for i in 0..100 {
            worker.tick(ms(t0, i));
        }
        assert_eq!(injector.click_times().len(), 4);

        state.actions.toggle(Action::SpamClick);
        injector.clear();
        for i in 100..200 {
            worker.tick(ms(t0, i));
        }
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_spam_keeps_primary_hold_down() {
        let (state, injector, mut worker) = setup();
        let t0 = Instant::now();
        state.actions.save_point(ScreenPoint::new(5, 5));
        state.actions.toggle(Action::HoldPrimary);
        state.actions.toggle(Action::SpamClick);
        for i in 0..100 {
            worker.tick(ms(t0, i));
        }
        state.actions.toggle(Action::SpamClick);
        for i in 100..200 {
            worker.tick(ms(t0, i));
        }

        let left: Vec<bool> = injector
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                InjectedInput::Button {
                    button: MouseButton::Left,
                    down,
                } => Some(down),
                _ => None,
            })
            .collect();
        // Hold press, then four press/release/re-press pulses.
        assert_eq!(left.len(), 1 + 4 * 3);
        assert_eq!(left.last(), Some(&true));
        assert!(worker.is_asserted(HoldAction::Primary));
    }

    #[test]
    fn test_no_click_without_saved_point() {
        let (state, injector, mut worker) = setup();
        state.actions.toggle(Action::SpamClick);
        worker.tick(Instant::now());
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_idle_cadence() {
        let (state, _injector, mut worker) = setup();
        let t0 = Instant::now();
        assert_eq!(worker.tick(t0), IDLE_TICK);
        state.actions.toggle(Action::HoldBackward);
        assert_eq!(worker.tick(ms(t0, 1)), ACTIVE_TICK);
    }

    #[test]
    fn test_release_all_is_unconditional() {
        let (_state, injector, mut worker) = setup();
        worker.release_all();
        for hold in HoldAction::ALL {
            assert_eq!(injector.count(hold.target(), false), 1);
        }
        assert_eq!(injector.count(HoldTarget::Key('w'), true), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_releases_everything_on_exit() {
        let (state, injector, worker) = setup();
        state.actions.toggle(Action::HoldForward);
        state.actions.toggle(Action::HoldPrimary);

        let handle = tokio::spawn(worker.run());
        sleep(Duration::from_millis(50)).await;
        assert_eq!(injector.count(HoldTarget::Key('w'), true), 1);

        state.request_exit();
        handle.await.unwrap();

        for hold in HoldAction::ALL {
            assert!(injector.count(hold.target(), false) >= 1);
        }
        assert!(!state.actions.any_desired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_never_clicks_faster_than_interval() {
        let (state, injector, worker) = setup();
        state.actions.save_point(ScreenPoint::new(500, 300));
        state.actions.toggle(Action::SpamClick);

        let handle = tokio::spawn(worker.run());
        sleep(Duration::from_millis(300)).await;
        state.actions.toggle(Action::SpamClick);
        state.notify_changed();
        sleep(Duration::from_millis(5)).await;
        let clicks = injector.click_times();
        sleep(Duration::from_millis(200)).await;
        state.request_exit();
        handle.await.unwrap();

        assert!(clicks.len() >= 9, "only {} clicks", clicks.len());
        for pair in clicks.windows(2) {
            assert!(pair[1] - pair[0] >= CLICK_INTERVAL);
        }
        assert_eq!(injector.click_times(), clicks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_while_suspended() {
        let (state, injector, worker) = setup();
        state.actions.toggle(Action::HoldSecondary);
        let handle = tokio::spawn(worker.run());
        sleep(Duration::from_millis(5)).await;

        state.flags.toggle_suspended();
        sleep(Duration::from_millis(50)).await;
        state.request_exit();
        handle.await.unwrap();

        let right = HoldTarget::Button(MouseButton::Right);
        assert_eq!(injector.count(right, true), 1);
        // One release for the suspend, one from the unconditional exit pass.
        assert_eq!(injector.count(right, false), 2);
    }
}
