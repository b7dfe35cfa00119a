// ── Device backend seam ──
//
// The coordinator talks to the cloud through this trait so the poll and
// verify logic can run against an in-process fake.

use std::future::Future;

use tuyalink_api::{CloudClient, DeviceCommand, FunctionSpec, StatusItem};

use crate::error::CoreError;

/// Device reads and writes the coordinator depends on.
pub trait DeviceBackend: Send + Sync + 'static {
    /// Declared capabilities of the device.
    fn functions(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Vec<FunctionSpec>, CoreError>> + Send;

    /// Current value of every data point the cloud reports.
    fn status(&self, device_id: &str)
    -> impl Future<Output = Result<Vec<StatusItem>, CoreError>> + Send;

    /// Send a command batch; returns the cloud's raw result.
    fn send_commands(
        &self,
        device_id: &str,
        commands: &[DeviceCommand],
    ) -> impl Future<Output = Result<serde_json::Value, CoreError>> + Send;
}

impl DeviceBackend for CloudClient {
    async fn functions(&self, device_id: &str) -> Result<Vec<FunctionSpec>, CoreError> {
        Ok(self.get_functions(device_id).await?)
    }

    async fn status(&self, device_id: &str) -> Result<Vec<StatusItem>, CoreError> {
        Ok(self.get_status(device_id).await?)
    }

    async fn send_commands(
        &self,
        device_id: &str,
        commands: &[DeviceCommand],
    ) -> Result<serde_json::Value, CoreError> {
        Ok(CloudClient::send_commands(self, device_id, commands).await?)
    }
}
