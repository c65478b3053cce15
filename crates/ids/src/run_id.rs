//! Timestamp-qualified run identifiers and their generator.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

/// A time-prefixed unique identifier for one render invocation.
///
/// This identifier is:
/// - Globally unique (UUID v4 suffix)
/// - Human-readable and sortable by creation time
/// - Monotonic within a process when produced by a shared [`RunIdGenerator`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId {
    timestamp: DateTime<Utc>,
    uuid: Uuid,
}

impl RunId {
    /// Generate a new run identifier.
    ///
    /// If `last` is provided, the timestamp is guaranteed to be strictly greater than the
    /// previous one (by at least 1 ms).
    pub fn generate(last: Option<&RunId>) -> Self {
        let now = truncate_to_millis(Utc::now());

        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: Uuid::new_v4(),
        }
    }

    /// Returns the timestamp component.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    let millis = ts.timestamp_millis();
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(ts)
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z-{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.uuid.simple()
        )
    }
}

/// Hands out strictly increasing [`RunId`]s to concurrent callers.
///
/// The generator only serialises the (cheap) timestamp bump; callers never hold the lock while
/// rendering.
#[derive(Debug, Default)]
pub struct RunIdGenerator {
    last: Mutex<Option<RunId>>,
}

impl RunIdGenerator {
    /// Creates a generator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the next identifier.
    ///
    /// A poisoned lock is recovered: the previous value is still a valid lower bound.
    pub fn next_id(&self) -> RunId {
        let mut guard = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = RunId::generate(guard.as_ref());
        *guard = Some(id.clone());
        id
    }
}
