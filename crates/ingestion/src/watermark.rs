//! Event-time watermark
//!
//! The watermark trails the largest event time seen by a fixed delay. A record
//! is late when its event time is strictly older than the watermark in force
//! at the moment it arrives.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkTracker {
    delay: TimeDelta,
    max_event_time: Option<DateTime<Utc>>,
}

impl WatermarkTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX),
            max_event_time: None,
        }
    }

    /// Tracker resuming from a previously observed maximum
    pub fn restore(&mut self, max_event_time: Option<DateTime<Utc>>) {
        self.max_event_time = max_event_time;
    }

    pub fn max_event_time(&self) -> Option<DateTime<Utc>> {
        self.max_event_time
    }

    /// `max event time - delay`, `None` before the first record
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.max_event_time.map(|max| {
            max.checked_sub_signed(self.delay)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    /// Account for one valid record, returning whether it is late
    pub fn observe(&mut self, event_time: DateTime<Utc>) -> bool {
        let late = self.watermark().is_some_and(|w| event_time < w);
        if self.max_event_time.is_none_or(|max| event_time > max) {
            self.max_event_time = Some(event_time);
        }
        late
    }
}
