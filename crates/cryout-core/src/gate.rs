use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::domain::UserId;

/// Outcome of checking a submission against the per-user gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    RateLimited,
    Duplicate,
}

#[derive(Clone, Debug)]
struct SubmissionRecord {
    last_time: Instant,
    last_text: String,
}

/// Per-user rate-limit / duplicate gate.
///
/// State lives for the process lifetime and records only *published*
/// submissions: `commit` must not be called for rejected or failed ones, so
/// a user whose message failed downstream can resubmit the same text.
pub struct SubmissionGate {
    window: Duration,
    records: Mutex<HashMap<UserId, SubmissionRecord>>,
}

impl SubmissionGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn evaluate(&self, user_id: UserId, text: &str) -> Decision {
        self.evaluate_at(user_id, text, Instant::now())
    }

    pub fn evaluate_at(&self, user_id: UserId, text: &str, now: Instant) -> Decision {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(record) = records.get(&user_id) else {
            return Decision::Allowed;
        };

        // The cooldown check comes first: inside the window the text is not
        // even compared.
        if now.saturating_duration_since(record.last_time) < self.window {
            return Decision::RateLimited;
        }
        if record.last_text == text {
            return Decision::Duplicate;
        }

        Decision::Allowed
    }

    pub fn commit(&self, user_id: UserId, text: &str) {
        self.commit_at(user_id, text, Instant::now());
    }

    pub fn commit_at(&self, user_id: UserId, text: &str, now: Instant) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(
            user_id,
            SubmissionRecord {
                last_time: now,
                last_text: text.to_string(),
            },
        );
    }
}
