// tuyalink-api: Async Rust client for the Tuya IoT cloud OpenAPI

pub mod auth;
pub mod client;
pub mod device;
pub mod error;
pub mod models;
pub mod signing;
pub mod transport;

pub use auth::{Credentials, Region, RegionEndpoints, RegionSelector};
pub use client::{CloudClient, EndpointBinding};
pub use error::Error;
pub use models::{DeviceCommand, FunctionSpec, StatusItem};
pub use transport::{TlsMode, TransportConfig};
