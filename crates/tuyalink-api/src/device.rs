// Device endpoints
//
// Capability catalog, full status read, and batched data-point writes.
// Path construction only; signing and retry live in `client.rs`.

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::{CommandBatch, DeviceCommand, FunctionList, FunctionSpec, StatusItem};

fn device_path(device_id: &str, suffix: &str) -> String {
    format!("/v1.0/iot-03/devices/{device_id}/{suffix}")
}

impl CloudClient {
    /// List the data points a device declares as writable.
    ///
    /// `GET /v1.0/iot-03/devices/{id}/functions`
    pub async fn get_functions(&self, device_id: &str) -> Result<Vec<FunctionSpec>, Error> {
        debug!(device_id, "fetching function catalog");
        let result = self
            .request(Method::GET, &device_path(device_id, "functions"), None::<&()>)
            .await?;

        if result.is_null() {
            return Ok(Vec::new());
        }
        let list = FunctionList::deserialize(&result).map_err(|e| Error::Deserialization {
            message: format!("malformed function list: {e}"),
            body: result.to_string(),
        })?;
        Ok(list.functions)
    }

    /// Read every data point's current value.
    ///
    /// `GET /v1.0/iot-03/devices/{id}/status`
    ///
    /// Entries without a `code` are dropped.
    pub async fn get_status(&self, device_id: &str) -> Result<Vec<StatusItem>, Error> {
        let result = self
            .request(Method::GET, &device_path(device_id, "status"), None::<&()>)
            .await?;

        let items = match result {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => Vec::new(),
            other => {
                return Err(Error::Deserialization {
                    message: "status result is not a list".into(),
                    body: other.to_string(),
                });
            }
        };

        let status: Vec<StatusItem> = items
            .into_iter()
            .filter_map(|item| StatusItem::deserialize(item).ok())
            .collect();
        trace!(device_id, count = status.len(), "status received");
        Ok(status)
    }

    /// Send a batch of data-point writes. Returns the cloud's `result`
    /// verbatim (usually `true`).
    ///
    /// `POST /v1.0/iot-03/devices/{id}/commands` with `{"commands": [...]}`
    pub async fn send_commands(
        &self,
        device_id: &str,
        commands: &[DeviceCommand],
    ) -> Result<serde_json::Value, Error> {
        debug!(device_id, count = commands.len(), "sending commands");
        let body = CommandBatch { commands };
        self.request(Method::POST, &device_path(device_id, "commands"), Some(&body))
            .await
    }
}
