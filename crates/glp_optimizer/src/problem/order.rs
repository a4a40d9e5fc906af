use glp_routing::point::Point;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(OrderIdx, Order);

pub const PRIORITY_OVERDUE: u32 = 1000;
pub const PRIORITY_WITHIN_1H: u32 = 900;
pub const PRIORITY_WITHIN_4H: u32 = 700;
pub const PRIORITY_WITHIN_12H: u32 = 500;
pub const PRIORITY_WITHIN_24H: u32 = 300;
pub const PRIORITY_LOW: u32 = 100;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    id: String,
    location: Point,
    volume_m3: f64,
    registered_at: Timestamp,
    deadline: Timestamp,
}

impl Order {
    /// The deadline is `registered_at + allowed`. A duration that overflows
    /// the timestamp range saturates to the maximum timestamp.
    pub fn new(
        id: impl Into<String>,
        location: Point,
        volume_m3: f64,
        registered_at: Timestamp,
        allowed: SignedDuration,
    ) -> Self {
        Order {
            id: id.into(),
            location,
            volume_m3,
            registered_at,
            deadline: registered_at
                .checked_add(allowed)
                .unwrap_or(Timestamp::MAX),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Point {
        self.location
    }

    pub fn volume_m3(&self) -> f64 {
        self.volume_m3
    }

    pub fn registered_at(&self) -> Timestamp {
        self.registered_at
    }

    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    pub fn time_remaining(&self, now: Timestamp) -> SignedDuration {
        self.deadline.duration_since(now)
    }

    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.deadline < now
    }

    /// Urgency bucket of the order at `now`.
    pub fn priority(&self, now: Timestamp) -> u32 {
        let remaining = self.time_remaining(now);
        if remaining.is_negative() {
            PRIORITY_OVERDUE
        } else if remaining <= SignedDuration::from_hours(1) {
            PRIORITY_WITHIN_1H
        } else if remaining <= SignedDuration::from_hours(4) {
            PRIORITY_WITHIN_4H
        } else if remaining <= SignedDuration::from_hours(12) {
            PRIORITY_WITHIN_12H
        } else if remaining <= SignedDuration::from_hours(24) {
            PRIORITY_WITHIN_24H
        } else {
            PRIORITY_LOW
        }
    }
}
