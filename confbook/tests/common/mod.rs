//! Common test utilities for integration tests.
//!
//! Fixture builders for time slots, resources, stores and executable
//! forests shared by the integration suites.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use confbook::database::{Database, DatabaseConfig};
use confbook::executor::{Executable, ExecutableConnector, ExecutableId};
use confbook::resource::{AliasProviderCapability, AliasType, Capability, Resource, Technology};
use confbook::store::InMemoryStore;
use confbook::{Interval, ResourceId};

/// Reference "now" of every scheduling test.
#[allow(dead_code)]
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap()
}

/// A slot on the reference day starting at `start_hour` lasting `hours`.
#[allow(dead_code)]
pub fn slot(start_hour: u32, hours: i64) -> Interval {
    let start = Utc.with_ymd_and_hms(2013, 1, 1, start_hour, 0, 0).unwrap();
    Interval::from_duration(start, Duration::hours(hours)).unwrap()
}

/// An H.323/SIP device hosting rooms of up to `license_count` participants.
#[allow(dead_code)]
pub fn mcu(id: u64, license_count: u32) -> Resource {
    Resource::new(ResourceId::from(id), format!("mcu-{id}"))
        .with_technology(Technology::H323)
        .with_technology(Technology::Sip)
        .with_capability(Capability::RoomProvider {
            license_count,
            required_alias_types: vec![],
        })
}

/// An alias provider producing E.164 numbers from `pattern`.
#[allow(dead_code)]
pub fn number_provider(id: u64, pattern: &str) -> Resource {
    Resource::new(ResourceId::from(id), format!("numbers-{id}")).with_capability(
        Capability::AliasProvider(AliasProviderCapability {
            patterns: vec![pattern.to_string()],
            alias_types: vec![AliasType::H323E164],
            allow_any_requested_value: false,
            maximum_future_days: None,
            restricted_to_resource: false,
        }),
    )
}

/// A terminal speaking `technology`.
#[allow(dead_code)]
pub fn terminal(id: u64, technology: Technology) -> Resource {
    Resource::new(ResourceId::from(id), format!("terminal-{id}"))
        .with_technology(technology)
        .with_capability(Capability::Terminal)
}

/// Builder for in-memory stores.
#[allow(dead_code)]
#[derive(Default)]
pub struct StoreFixture {
    resources: Vec<Resource>,
}

#[allow(dead_code)]
impl StoreFixture {
    /// Starts with no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    pub fn with(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Builds the in-memory store.
    pub fn build(self) -> InMemoryStore {
        self.resources
            .into_iter()
            .fold(InMemoryStore::new(), InMemoryStore::with_resource)
    }

    /// Builds a temporary database holding the resources.
    ///
    /// The temporary directory is kept alive for the rest of the test run.
    pub fn build_database(self) -> Database {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("confbook.db"));
        let mut db = Database::open(config).unwrap();
        std::mem::forget(dir);
        db.save_resources(&self.resources).unwrap();
        db
    }
}

/// Builder for executable forests keyed by identifier.
#[allow(dead_code)]
#[derive(Default)]
pub struct ForestFixture {
    executables: BTreeMap<ExecutableId, Executable>,
}

#[allow(dead_code)]
impl ForestFixture {
    /// Starts with no executables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an executable in the default state with the given children.
    pub fn with(self, id: u64, children: &[u64]) -> Self {
        self.with_executable(id, children, |e| e)
    }

    /// Adds an executable, letting `configure` adjust it.
    pub fn with_executable(
        mut self,
        id: u64,
        children: &[u64],
        configure: impl FnOnce(Executable) -> Executable,
    ) -> Self {
        let executable = children.iter().fold(
            Executable::new(ExecutableId::from(id), slot(12, 1)),
            |executable, child| executable.with_child(ExecutableId::from(*child)),
        );
        self.executables
            .insert(ExecutableId::from(id), configure(executable));
        self
    }

    /// Returns the executable with `id`.
    pub fn get(&self, id: u64) -> &Executable {
        &self.executables[&ExecutableId::from(id)]
    }

    /// Returns the forest.
    pub fn build(self) -> BTreeMap<ExecutableId, Executable> {
        self.executables
    }
}

/// Connector recording every call, refusing the listed executables.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingConnector {
    /// Calls in order, e.g. `"start exe:1"`.
    pub calls: Vec<String>,
    /// Executables whose start or stop is refused.
    pub refuse: Vec<ExecutableId>,
}

impl ExecutableConnector for RecordingConnector {
    fn start(&mut self, executable: &Executable) -> bool {
        self.calls.push(format!("start {}", executable.id()));
        !self.refuse.contains(&executable.id())
    }

    fn stop(&mut self, executable: &Executable) -> bool {
        self.calls.push(format!("stop {}", executable.id()));
        !self.refuse.contains(&executable.id())
    }

    fn update(&mut self, executable: &Executable) -> bool {
        self.calls.push(format!("update {}", executable.id()));
        true
    }

    fn migrate(&mut self, source: &Executable, target: &Executable) -> bool {
        self.calls
            .push(format!("migrate {} {}", source.id(), target.id()));
        true
    }
}
