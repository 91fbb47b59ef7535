#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # confbook
//!
//! Scheduling core for booking shared videoconferencing resources.
//!
//! Given a set of resources (MCUs, gateways, terminals, alias namespaces)
//! and the reservations that already exist, the scheduler decides which
//! resources, licenses and aliases satisfy a reservation request for a time
//! slot. Decided rooms are started, stopped and migrated through an
//! execution plan, and access to every object is tracked by ACL entries.
//!
//! ## Core Types
//!
//! - [`Interval`]: half-open time slots
//! - [`resource::Resource`] and [`reservation::Reservation`]: what can be
//!   booked and what has been booked
//! - [`scheduler`]: allocation with nested savepoints and reports
//! - [`value`]: value patterns and providers for aliases
//! - [`executor`]: dependency-ordered execution of rooms
//! - [`authorization`]: ACL entries and their propagation
//! - [`Database`]: `SQLite` persistence
//! - [`Error`] and [`Result`]: error handling types
//!
//! ## Examples
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use confbook::Interval;
//!
//! let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
//! let slot = Interval::from_duration(start, Duration::hours(2)).unwrap();
//! let later = Interval::from_duration(start + Duration::hours(2), Duration::hours(1)).unwrap();
//! assert!(!slot.overlaps(&later));
//! ```

pub mod authorization;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod interval;
pub mod logging;
pub mod reservation;
pub mod resource;
pub mod scheduler;
pub mod store;
pub mod value;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigBuilder};
pub use database::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use interval::Interval;
pub use logging::{init_logger, LogLevel, Logger};
pub use reservation::{RequestId, ReservationId};
pub use resource::ResourceId;
