// tuyalink-core: Poll/verify state layer between tuyalink-api and consumers.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::DeviceBackend;
pub use config::{CommandOptions, CoordinatorConfig};
pub use coordinator::{CommandOutcome, Coordinator, FollowUp};
pub use error::CoreError;
pub use model::{DpValue, Expectation, FunctionCatalog, S6_DATA_POINTS, Snapshot};
pub use store::SnapshotStore;

// Wire types consumers need to build commands and credentials.
pub use tuyalink_api::{
    Credentials, DeviceCommand, FunctionSpec, Region, RegionSelector, StatusItem,
};
