use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use timetable_allocation::error::AppError;
use timetable_allocation::workflows::allocation::{
    AllocationEngine, DirectorySnapshot, InMemoryAllocationStore, InMemoryPriorityLedger,
    PriorityIntake, YearId,
};
use timetable_allocation::workflows::import::{ImportedCatalog, PriorityCsvImporter};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceEngine =
    AllocationEngine<InMemoryPriorityLedger, InMemoryAllocationStore, DirectorySnapshot>;

pub(crate) type ServiceIntake = PriorityIntake<InMemoryPriorityLedger, DirectorySnapshot>;

/// Engine and intake sharing one ledger, store and directory.
pub(crate) struct AllocationServices {
    pub(crate) engine: Arc<ServiceEngine>,
    pub(crate) intake: Arc<ServiceIntake>,
    pub(crate) store: Arc<InMemoryAllocationStore>,
}

impl AllocationServices {
    pub(crate) fn from_catalog(catalog: ImportedCatalog, run_timeout: Option<Duration>) -> Self {
        let ImportedCatalog { roster, directory } = catalog;
        let ledger = Arc::new(InMemoryPriorityLedger::from_roster(roster));
        let directory = Arc::new(directory);
        let store = Arc::new(InMemoryAllocationStore::new());

        let engine = AllocationEngine::new(ledger.clone(), store.clone(), directory.clone())
            .with_run_timeout(run_timeout);
        let intake = PriorityIntake::new(ledger, directory);

        Self {
            engine: Arc::new(engine),
            intake: Arc::new(intake),
            store,
        }
    }
}

/// Imports the seed export when one is given, otherwise starts from an empty catalog.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<ImportedCatalog, AppError> {
    match path {
        Some(path) => Ok(PriorityCsvImporter::from_path(path)?),
        None => Ok(ImportedCatalog::default()),
    }
}

pub(crate) fn parse_year(raw: &str) -> Result<YearId, String> {
    raw.trim()
        .parse::<u32>()
        .map(YearId)
        .map_err(|err| format!("failed to parse '{raw}' as a year id ({err})"))
}
