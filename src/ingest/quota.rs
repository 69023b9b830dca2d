// src/ingest/quota.rs
//! In-process daily request budget for quota-capped APIs.
//!
//! The counter rolls over at UTC midnight. Once `exhaust()` is called (e.g. after
//! an upstream HTTP 429) no more permits are handed out until the next day.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

#[derive(Debug, Clone)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
    exhausted: bool,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            date: Utc::now().date_naive(),
            count: 0,
            exhausted: false,
        }
    }

    fn roll_if_expired(&mut self) {
        if self.date != Utc::now().date_naive() {
            *self = Self::today();
        }
    }
}

#[derive(Debug)]
pub struct DailyQuota {
    limit: u32,
    counter: Mutex<DailyCounter>,
}

impl DailyQuota {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    /// Take one permit; `false` means the caller must not issue the request.
    pub fn try_acquire(&self) -> bool {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.roll_if_expired();
        if g.exhausted || g.count >= self.limit {
            return false;
        }
        g.count = g.count.saturating_add(1);
        true
    }

    /// Mark the rest of the day as spent.
    pub fn exhaust(&self) {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.roll_if_expired();
        g.exhausted = true;
    }

    pub fn remaining(&self) -> u32 {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.roll_if_expired();
        if g.exhausted {
            0
        } else {
            self.limit.saturating_sub(g.count)
        }
    }
}
