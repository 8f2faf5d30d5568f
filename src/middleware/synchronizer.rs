use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::host::{SearchHelper, SearchInstance};
use crate::types::{SearchParameters, SessionParametersSnapshot, UserToken};

/// Writes `userToken` / `clickAnalytics` onto the search session.
///
/// Writes bypass the session's change notification, since they are not user
/// intent, and each one is followed by a single scheduled search. Debouncing
/// of those searches belongs to the search instance. The parameters as they
/// were before the first write are captured once and written back by
/// [`StateSynchronizer::restore`].
pub struct StateSynchronizer {
    helper: Arc<dyn SearchHelper>,
    instance: Arc<dyn SearchInstance>,
    snapshot: Mutex<Option<SessionParametersSnapshot>>,
}

impl StateSynchronizer {
    pub fn new(helper: Arc<dyn SearchHelper>, instance: Arc<dyn SearchInstance>) -> Self {
        Self {
            helper,
            instance,
            snapshot: Mutex::new(None),
        }
    }

    /// Capture the owned parameters unless a snapshot is already held.
    pub fn capture_snapshot(&self) {
        let mut snapshot = self.lock_snapshot();
        if snapshot.is_none() {
            *snapshot = Some(SessionParametersSnapshot::capture(&self.helper.state()));
        }
    }

    pub fn snapshot(&self) -> Option<SessionParametersSnapshot> {
        self.lock_snapshot().clone()
    }

    pub fn set_click_analytics(&self, enabled: bool) {
        self.apply(|state| state.click_analytics = Some(enabled));
    }

    pub fn set_user_token(&self, token: Option<UserToken>) {
        self.apply(|state| state.user_token = token);
    }

    fn apply(&self, mutate: impl FnOnce(&mut SearchParameters)) {
        self.capture_snapshot();
        let mut state = self.helper.state();
        mutate(&mut state);
        self.helper
            .override_state_without_triggering_change_event(state);
        self.instance.schedule_search();
    }

    /// Put the captured parameters back and request a search. Returns
    /// `false` when there was nothing to restore.
    pub fn restore(&self) -> bool {
        let Some(snapshot) = self.lock_snapshot().take() else {
            tracing::debug!("[insights] No parameters snapshot to restore");
            return false;
        };
        let mut state = self.helper.state();
        snapshot.restore_onto(&mut state);
        self.helper.set_state(state);
        self.instance.schedule_search();
        true
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Option<SessionParametersSnapshot>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
