//! Shared helpers for in-memory integration tests.

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use stratum::service_context::{InMemoryBackend, ServiceContext};

/// Clock advanced by hand so expiry and freshness rules are deterministic.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Starts the clock at a fixed instant.
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 5, 4, 8, 30, 0)
            .single()
            .expect("valid start instant");
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by whole minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += TimeDelta::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Service container over a fresh in-memory backend.
pub type TestContext = ServiceContext<InMemoryBackend<ManualClock>>;

/// Provides the shared clock.
#[fixture]
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new())
}

/// Provides a container whose backend runs on `clock`.
#[fixture]
pub fn services(clock: Arc<ManualClock>) -> (TestContext, Arc<ManualClock>) {
    let backend = InMemoryBackend::with_clock(Arc::clone(&clock));
    (ServiceContext::new(backend), clock)
}

/// Unwraps a JSON object literal.
pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
