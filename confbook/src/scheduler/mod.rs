//! Allocation of reservation requests.
//!
//! The scheduler turns a [`Specification`] and a time slot into a tree of
//! [`Reservation`](crate::reservation::Reservation)s. Every decision made
//! during a run is kept in a [`SchedulerContextState`], which supports
//! nested savepoints so that a rejected candidate leaves no trace. The
//! result of each step is recorded as a [`SchedulerReport`]; failures carry
//! the report tree in a [`SchedulerError`] and map to a [`UserError`] for
//! display.
//!
//! # Examples
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use confbook::config::SchedulerSettings;
//! use confbook::resource::{Capability, Resource, Technology};
//! use confbook::scheduler::{allocate_request, ReservationRequest, RoomSpecification, SchedulerContext, Specification};
//! use confbook::store::InMemoryStore;
//! use confbook::{Interval, RequestId, ResourceId};
//!
//! let store = InMemoryStore::new().with_resource(
//!     Resource::new(ResourceId::from(1), "mcu")
//!         .with_technology(Technology::H323)
//!         .with_capability(Capability::RoomProvider { license_count: 10, required_alias_types: vec![] }),
//! );
//! let now = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();
//! let mut context = SchedulerContext::new(&store, now, SchedulerSettings::default());
//!
//! let request = ReservationRequest {
//!     id: RequestId::from(7),
//!     slot: Interval::from_duration(now + Duration::hours(12), Duration::hours(2)).unwrap(),
//!     specification: Specification::Room(RoomSpecification {
//!         participant_count: 5,
//!         technology_variants: vec![],
//!         resource: None,
//!         aliases: vec![],
//!     }),
//!     reused_reservation: None,
//! };
//! let allocation = allocate_request(&mut context, &request).unwrap();
//! assert_eq!(allocation.reservation.request(), Some(RequestId::from(7)));
//! ```

mod context;
mod report;
mod request;
mod specification;
mod state;
mod task;
mod transaction;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

pub use context::{license_count_peak, SchedulerContext};
pub use report::{ReportKind, SchedulerError, SchedulerReport, Severity, UserError, Visibility};
pub use request::{allocate_request, Allocation, ReservationRequest};
pub use specification::{AliasSpecification, EndpointSpecification, RoomSpecification, Specification};
pub use state::{Savepoint, SchedulerContextState};
pub use task::ReservationTask;
pub use transaction::ReservationTransaction;
