//! Recording host surface for unit testing.
//!
//! Every notification the session sends to the UI is pushed into a
//! `Mutex<Vec<...>>` so tests can assert on exactly what the user would have
//! seen, in order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use m8_core::{Rgb, SessionReport, SessionState};

use crate::application::command_bridge::HostSurface;
use crate::application::input::ButtonLayout;

/// A surface that records all notifications without rendering anything.
#[derive(Default)]
pub struct RecordingSurface {
    colors: Mutex<Vec<Rgb>>,
    alternate_visibility: Mutex<Vec<bool>>,
    layouts: Mutex<Vec<ButtonLayout>>,
    touch_resets: AtomicUsize,
    states: Mutex<Vec<SessionState>>,
    reports: Mutex<Vec<SessionReport>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colors(&self) -> Vec<Rgb> {
        self.colors.lock().unwrap().clone()
    }

    pub fn alternate_visibility(&self) -> Vec<bool> {
        self.alternate_visibility.lock().unwrap().clone()
    }

    pub fn layouts(&self) -> Vec<ButtonLayout> {
        self.layouts.lock().unwrap().clone()
    }

    pub fn touch_resets(&self) -> usize {
        self.touch_resets.load(Ordering::SeqCst)
    }

    /// Every state the session passed through, in order.
    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().unwrap().clone()
    }

    /// Names of [`states`](Self::states), for compact assertions.
    pub fn state_names(&self) -> Vec<String> {
        self.states().iter().map(|s| s.name().to_string()).collect()
    }

    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl HostSurface for RecordingSurface {
    fn set_background_color(&self, color: Rgb) {
        self.colors.lock().unwrap().push(color);
    }

    fn set_alternate_controls_visible(&self, visible: bool) {
        self.alternate_visibility.lock().unwrap().push(visible);
    }

    fn set_button_layout(&self, layout: ButtonLayout) {
        self.layouts.lock().unwrap().push(layout);
    }

    fn reset_touch_tracking(&self) {
        self.touch_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn session_changed(&self, state: &SessionState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn report(&self, report: &SessionReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
