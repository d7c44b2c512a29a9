use std::time::{Duration, Instant};

use crate::config::AutoSaveSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    /// `delay` is the period the timer was armed with; a skipped fire re-arms
    /// with the same period.
    Armed { due_at: Instant, delay: Duration },
    /// An autosave was dispatched and has not resolved yet.
    Firing,
}

/// Debounced autosave timer.
///
/// The timer is a deadline owned by the scheduler: re-arming or cancelling
/// simply replaces it, and the host loop asks [`AutoSaveScheduler::due_at`]
/// how long it may sleep.
#[derive(Debug)]
pub struct AutoSaveScheduler {
    state: ScheduleState,
}

impl Default for AutoSaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoSaveScheduler {
    pub fn new() -> Self {
        Self {
            state: ScheduleState::Idle,
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn due_at(&self) -> Option<Instant> {
        match self.state {
            ScheduleState::Armed { due_at, .. } => Some(due_at),
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, ScheduleState::Armed { .. })
    }

    /// Called after every draft mutation with the settings in force right now.
    pub fn on_mutation(&mut self, now: Instant, dirty: bool, settings: AutoSaveSettings) {
        if !dirty || !settings.enabled {
            if self.is_armed() {
                tracing::debug!(dirty, enabled = settings.enabled, "autosave timer cancelled");
                self.state = ScheduleState::Idle;
            }
            return;
        }
        let due_at = now + settings.delay;
        if self.is_armed() {
            tracing::trace!("autosave timer re-armed");
        } else {
            tracing::debug!(delay_ms = settings.delay.as_millis() as u64, "autosave timer armed");
        }
        self.state = ScheduleState::Armed {
            due_at,
            delay: settings.delay,
        };
    }

    /// Returns `true` when an autosave should be dispatched now. The caller
    /// must then report the outcome through [`Self::on_fire_rejected`] or
    /// [`Self::on_save_resolved`].
    pub fn poll(&mut self, now: Instant, dirty: bool, save_in_flight: bool) -> bool {
        let ScheduleState::Armed { due_at, delay } = self.state else {
            return false;
        };
        if now < due_at {
            return false;
        }
        if !dirty {
            self.state = ScheduleState::Idle;
            return false;
        }
        if save_in_flight {
            tracing::debug!("save already in flight, autosave postponed");
            self.state = ScheduleState::Armed {
                due_at: now + delay,
                delay,
            };
            return false;
        }
        tracing::debug!("autosave firing");
        self.state = ScheduleState::Firing;
        true
    }

    /// The dispatched autosave was refused before reaching the store.
    pub fn on_fire_rejected(&mut self) {
        if self.state == ScheduleState::Firing {
            self.state = ScheduleState::Idle;
        }
    }

    /// Any save resolved. Only a firing autosave is settled here; a timer
    /// re-armed by edits made during the save stays armed.
    pub fn on_save_resolved(&mut self) {
        if self.state == ScheduleState::Firing {
            self.state = ScheduleState::Idle;
        }
    }

    pub fn on_draft_clean(&mut self) {
        if self.is_armed() {
            tracing::debug!("draft clean, autosave timer cancelled");
            self.state = ScheduleState::Idle;
        }
    }

    pub fn cancel(&mut self) {
        self.state = ScheduleState::Idle;
    }
}
