//! Shared test utilities for database unit tests.

use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

use crate::database::{Database, DatabaseConfig};
use crate::reservation::{RequestId, Reservation, ReservationId, ReservationKind};
use crate::{Interval, ResourceId};

/// Creates a temporary test database that will be cleaned up automatically.
///
/// # Panics
///
/// Panics if the temporary directory or database cannot be created.
#[must_use]
pub fn create_test_database() -> Database {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let config = DatabaseConfig::new(path);
    let db = Database::open(config).unwrap();

    // Prevent the TempDir from being dropped immediately
    std::mem::forget(dir);

    db
}

/// Slot of `hours` hours starting at `hour` o'clock on 2013-01-01.
///
/// # Panics
///
/// Panics on an invalid hour.
#[must_use]
pub fn slot(hour: u32, hours: i64) -> Interval {
    let start = Utc.with_ymd_and_hms(2013, 1, 1, hour, 0, 0).unwrap();
    Interval::from_duration(start, Duration::hours(hours)).unwrap()
}

/// A two hour room reservation `id` on resource 1 for request 9, with a
/// value child `id + 1` from provider 2.
///
/// # Panics
///
/// Panics if the tree cannot be built.
#[must_use]
pub fn room_tree(id: u64, hour: u32) -> Reservation {
    Reservation::builder(
        ReservationId::from(id),
        slot(hour, 2),
        ReservationKind::Room {
            resource: ResourceId::from(1),
            license_count: 5,
            executable: None,
        },
    )
    .request(RequestId::from(9))
    .child(Reservation::new(
        ReservationId::from(id + 1),
        slot(hour, 2),
        ReservationKind::Value {
            provider: ResourceId::from(2),
            value: "950001".into(),
        },
    ))
    .build()
    .unwrap()
}
