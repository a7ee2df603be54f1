// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic monitoring versions.
//!
//! A [`MonitoringVersion`] is the snapshot token the rest of the system
//! compares against: every controller mutation mints a new one, and every
//! in-flight decision captures one at scope start and holds it for the
//! lifetime of that call.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A totally ordered `(timestamp_ms, counter, uuid)` triple.
///
/// Ordering is by timestamp, then counter, then uuid — the uuid only breaks
/// ties that can't occur under correct use of [`VersionManager`], but is
/// kept in the `Ord` impl so two versions are never judged equal unless
/// they are structurally identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoringVersion {
    pub timestamp_ms: u64,
    pub counter: u32,
    pub uuid: u128,
}

impl MonitoringVersion {
    /// The version before any real version has ever been minted. Strictly
    /// less than anything [`VersionManager::next`] can produce.
    pub const ZERO: MonitoringVersion = MonitoringVersion {
        timestamp_ms: 0,
        counter: 0,
        uuid: 0,
    };
}

impl PartialOrd for MonitoringVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonitoringVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then(self.counter.cmp(&other.counter))
            .then(self.uuid.cmp(&other.uuid))
    }
}

/// Source of the current wall-clock millisecond reading.
///
/// Exists so tests can drive the version manager's timestamp advances
/// deterministically instead of depending on real elapsed time.
pub trait MonotonicClock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMonotonicClock;

impl MonotonicClock for SystemMonotonicClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Produces strictly increasing [`MonitoringVersion`]s under a mutex.
///
/// Algorithm (spec §4.1): read the clock; if it has advanced past
/// `last_timestamp`, adopt it and reset `counter` to 0; otherwise bump
/// `counter`. On `counter` overflow, force-advance `last_timestamp` by one
/// millisecond and reset `counter`, so the same-millisecond case never
/// produces a non-monotonic pair.
pub struct VersionManager<C: MonotonicClock = SystemMonotonicClock> {
    clock: C,
    state: Mutex<(u64, u32)>,
}

impl Default for VersionManager<SystemMonotonicClock> {
    fn default() -> Self {
        Self::new(SystemMonotonicClock)
    }
}

impl<C: MonotonicClock> VersionManager<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: Mutex::new((0, 0)),
        }
    }

    /// Mints the next version. Guaranteed strictly greater than every
    /// version previously returned by this manager, across all threads.
    pub fn next(&self) -> MonitoringVersion {
        let mut state = self.state.lock();
        let (last_timestamp, counter) = &mut *state;

        let now = self.clock.now_ms();
        if now > *last_timestamp {
            *last_timestamp = now;
            *counter = 0;
        } else if *counter == u32::MAX {
            *last_timestamp += 1;
            *counter = 0;
        } else {
            *counter += 1;
        }

        MonitoringVersion {
            timestamp_ms: *last_timestamp,
            counter: *counter,
            uuid: Uuid::new_v4().as_u128(),
        }
    }
}

#[cfg(test)]
impl<C: MonotonicClock> VersionManager<C> {
    /// Seeds internal `(last_timestamp, counter)` state directly so tests
    /// can exercise the overflow path without looping billions of times.
    pub(crate) fn seed_state_for_test(&self, last_timestamp: u64, counter: u32) {
        let mut state = self.state.lock();
        *state = (last_timestamp, counter);
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
