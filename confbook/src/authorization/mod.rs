//! Role grants on reservation requests, reservations, executables and
//! resources.
//!
//! An [`AclEntry`] grants one [`ObjectRole`] to one [`AclIdentity`] on one
//! [`AclObjectIdentity`]. The [`AuthorizationManager`] keeps derived grants
//! consistent: owning a request implies owning its reservations, and a
//! reservation reusing another one implies reading the reused one.

mod entry;
mod manager;
mod store;

pub use entry::{
    AclEntry, AclEntryDependency, AclEntryDependencyType, AclEntryFilter, AclEntryId, AclIdentity,
    AclIdentityType, AclObjectClass, AclObjectIdentity, ObjectRole,
};
pub use manager::AuthorizationManager;
pub use store::{AclStore, AclTables};
