//! Database schema definitions and SQL constants.
//!
//! This module contains all SQL table definitions, indices, and constants
//! related to the database schema for the confbook scheduler.

/// Current schema version for the database.
///
/// This version is stored in the metadata table and is used to ensure
/// compatibility between the database and the application.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL statement to create the metadata table.
pub const CREATE_METADATA_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )";

/// SQL statement to create the resources table.
///
/// Capabilities and technologies are kept in the JSON payload; only the
/// columns needed for filtering are broken out.
pub const CREATE_RESOURCES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS resources (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        allocatable INTEGER NOT NULL,
        payload TEXT NOT NULL
    )";

/// SQL statement to create the reservations table.
///
/// Every node of a reservation tree gets a row so that collisions can be
/// found by target and slot. The serialized tree is stored on the root row
/// only.
pub const CREATE_RESERVATIONS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS reservations (
        id INTEGER PRIMARY KEY NOT NULL,
        root_id INTEGER NOT NULL,
        parent_id INTEGER,
        request_id INTEGER,
        kind TEXT NOT NULL,
        target_type TEXT,
        target_id INTEGER,
        slot_start INTEGER NOT NULL,
        slot_end INTEGER NOT NULL,
        payload TEXT
    )";

/// SQL statement to create the ACL entries table.
///
/// The unique constraint keeps one entry per (identity, object, role).
pub const CREATE_ACL_ENTRIES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS acl_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        identity_type TEXT NOT NULL,
        principal_id TEXT NOT NULL,
        class_name TEXT NOT NULL,
        object_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        UNIQUE (identity_type, principal_id, class_name, object_id, role)
    )";

/// SQL statement to create the ACL entry dependencies table.
pub const CREATE_ACL_DEPENDENCIES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS acl_entry_dependencies (
        parent_id INTEGER NOT NULL,
        child_id INTEGER NOT NULL,
        type TEXT NOT NULL,
        PRIMARY KEY (parent_id, child_id)
    )";

/// Index for collision lookups.
pub const CREATE_TARGET_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_reservations_target \
     ON reservations(target_type, target_id, slot_start)";

/// Index for loading the reservations of a request.
pub const CREATE_REQUEST_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_reservations_request ON reservations(request_id)";

/// Index for loading whole trees.
pub const CREATE_ROOT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_reservations_root ON reservations(root_id)";

/// SQL statement to select the schema version from the metadata table.
pub const SELECT_SCHEMA_VERSION: &str = "SELECT value FROM metadata WHERE key = 'schema_version'";

/// SQL statement to insert or update the schema version in the metadata table.
pub const INSERT_SCHEMA_VERSION: &str =
    "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)";

/// SQL statement to insert or replace a resource.
pub const INSERT_RESOURCE: &str = r"
    INSERT OR REPLACE INTO resources (id, name, allocatable, payload)
    VALUES (?, ?, ?, ?)
";

/// SQL statement to insert one node of a reservation tree.
pub const INSERT_RESERVATION: &str = r"
    INSERT INTO reservations
    (id, root_id, parent_id, request_id, kind, target_type, target_id, slot_start, slot_end, payload)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

/// SQL statement to delete every node of a reservation tree.
pub const DELETE_RESERVATION_TREE: &str = "DELETE FROM reservations WHERE root_id = ?";
