//! Question countdown for the local player
//!
//! The server pushes the current question and its time budget inside every
//! snapshot. The countdown restarts only when the question text itself
//! changes, so repeated snapshots carrying the same question leave the
//! running bar alone.

use log::{debug, info};
use shared::PlayerRecord;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCountdown {
    pub tracked_value: String,
    pub duration_at_start: Duration,
    pub started_at: Instant,
    expiry_reported: bool,
}

impl ActiveCountdown {
    /// Remaining share of the budget, shrinking linearly from 1.0 to 0.0.
    pub fn fraction(&self, now: Instant) -> f32 {
        if self.duration_at_start.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let spent = elapsed.as_secs_f32() / self.duration_at_start.as_secs_f32();
        (1.0 - spent).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration_at_start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountdownTransition {
    Started { question: String, duration: Duration },
    Stopped,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct CountdownController {
    active: Option<ActiveCountdown>,
    rendered: Option<String>,
}

impl CountdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the local player's latest record into the state machine.
    pub fn observe(&mut self, record: &PlayerRecord, now: Instant) -> CountdownTransition {
        if !record.has_question() {
            if self.rendered.is_none() && self.active.is_none() {
                return CountdownTransition::Unchanged;
            }
            self.cancel();
            self.rendered = None;
            debug!("Question cleared, countdown hidden");
            return CountdownTransition::Stopped;
        }

        if self.rendered.as_deref() == Some(record.current_question.as_str()) {
            return CountdownTransition::Unchanged;
        }

        self.cancel();
        let duration = record.question_time_budget();
        self.active = Some(ActiveCountdown {
            tracked_value: record.current_question.clone(),
            duration_at_start: duration,
            started_at: now,
            expiry_reported: false,
        });
        self.rendered = Some(record.current_question.clone());
        debug!(
            "Countdown started for '{}' ({:?})",
            record.current_question, duration
        );

        CountdownTransition::Started {
            question: record.current_question.clone(),
            duration,
        }
    }

    /// Drops the running countdown, if any.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Cancels and forgets the last question, hiding the panel.
    pub fn reset(&mut self) {
        self.cancel();
        self.rendered = None;
    }

    pub fn active(&self) -> Option<&ActiveCountdown> {
        self.active.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn question(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// `None` while idle; the panel should be hidden.
    pub fn fraction(&self, now: Instant) -> Option<f32> {
        self.active.as_ref().map(|countdown| countdown.fraction(now))
    }

    /// True exactly once per countdown, on the first call after it ran out.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.active.as_mut() {
            Some(countdown) if !countdown.expiry_reported && countdown.is_expired(now) => {
                countdown.expiry_reported = true;
                info!("Time's up for '{}'", countdown.tracked_value);
                true
            }
            _ => false,
        }
    }
}
