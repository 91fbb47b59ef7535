//! SQLite persistence for resources, reservations and ACL entries.
//!
//! [`Database`] implements [`crate::store::ResourceStore`],
//! [`crate::store::ReservationRepository`] and
//! [`crate::authorization::AclStore`], so the scheduler and the
//! authorization manager can run directly against it.
//!
//! # Examples
//!
//! ```no_run
//! use confbook::database::{Database, DatabaseConfig};
//! use confbook::store::ResourceStore;
//!
//! let config = DatabaseConfig::new("/tmp/confbook.db");
//! let db = Database::open(config).unwrap();
//!
//! for resource in db.resources().unwrap() {
//!     println!("{}: {}", resource.id, resource.name);
//! }
//! ```

mod acl;
mod config;
mod connection;
pub mod migrations;
mod operations;
mod schema;
#[cfg(test)]
pub(crate) mod test_util;
mod transaction;

pub use config::{default_data_dir, resolve_database_path, DatabaseConfig};
pub use connection::Database;

pub use migrations::{check_schema_compatibility, get_schema_version, initialize_schema};
pub use schema::CURRENT_SCHEMA_VERSION;
