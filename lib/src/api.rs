// Copyright (c) 2026 The Chainseal Developers

//! Backend API client
//!
//! Typed operations over a [Transport]: identity registration, device
//! records, sealed packet submission and validator confirmation. Backend
//! services are addressed per environment (`dev` / `demo` / `prod`), the
//! on-premise validator is addressed directly.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::Error;

/// Backend domain, per-environment services are subdomains
const BACKEND_DOMAIN: &str = "chainseal.io";

/// Device record for the device service
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: Uuid,
    pub device_type_key: String,
    pub device_name: String,
    pub hw_device_id: Uuid,
    pub tags: Vec<String>,
    pub device_properties: DeviceProperties,
    #[serde(serialize_with = "serialize_created")]
    pub created: DateTime<Utc>,
}

/// Device property flags understood by the device service
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProperties {
    pub stores_data: bool,
    pub block_chain: bool,
}

/// The device service expects ISO-8601 with millisecond precision and a
/// literal `Z` suffix
fn serialize_created<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// Backend API handle, generic over the HTTP [Transport]
pub struct ApiHandle<T: Transport> {
    t: T,
    auth: String,
    env: String,
}

impl<T: Transport> ApiHandle<T> {
    /// Create a handle for the given environment with an auth token
    pub fn new(t: T, auth: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            t,
            auth: auth.into(),
            env: env.into(),
        }
    }

    /// Service url for the current environment
    fn service_url(&self, service: &str, path: &str) -> String {
        format!(
            "https://{service}.{}.{BACKEND_DOMAIN}/api/{service}Service/v1/{path}",
            self.env
        )
    }

    /// Attach the auth header
    fn authorized(&self, req: HttpRequest) -> HttpRequest {
        req.header("Authorization", format!("Bearer {}", self.auth))
    }

    /// Map error responses to [Error::Api]
    fn checked(resp: HttpResponse) -> Result<HttpResponse, Error> {
        if !resp.ok() {
            return Err(Error::Api {
                status: resp.status,
                body: resp.text(),
            });
        }

        Ok(resp)
    }

    /// Fetch the display name of the authorized user
    pub async fn user_info(&self) -> Result<String, Error> {
        debug!("Requesting user info");

        let req = self.authorized(HttpRequest::get(self.service_url("auth", "userInfo")));
        let resp = Self::checked(self.t.exchange(req).await?)?;

        let doc = resp.json()?;
        let name = doc
            .get("displayName")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Api {
                status: resp.status,
                body: "missing displayName".to_string(),
            })?;

        Ok(name.to_string())
    }

    /// Register an identity's public key with the key service
    pub async fn register_identity(&self, packet: &[u8]) -> Result<(), Error> {
        debug!("Registering identity key ({} byte packet)", packet.len());

        let req = self
            .authorized(HttpRequest::post(
                self.service_url("key", "pubkey/mpack"),
                packet.to_vec(),
            ))
            .header("Content-Type", "application/octet-stream");
        Self::checked(self.t.exchange(req).await?)?;

        Ok(())
    }

    /// Whether a device record already exists
    pub async fn device_exists(&self, device: &Uuid) -> Result<bool, Error> {
        debug!("Checking device record for {device}");

        let req = self.authorized(HttpRequest::get(
            self.service_url("device", &format!("devices/{device}")),
        ));
        let resp = self.t.exchange(req).await?;

        match resp.status {
            404 => Ok(false),
            _ => Self::checked(resp).map(|_| true),
        }
    }

    /// Create a device record
    pub async fn device_create(&self, record: &DeviceRecord) -> Result<(), Error> {
        debug!("Creating device record for {}", record.device_id);

        let body = serde_json::to_vec(record)?;
        let req = self
            .authorized(HttpRequest::post(
                self.service_url("device", "devices"),
                body,
            ))
            .header("Content-Type", "application/json");
        Self::checked(self.t.exchange(req).await?)?;

        Ok(())
    }

    /// Submit a sealed packet to the data service, returning the raw
    /// MessagePack acknowledgement
    pub async fn send(&self, packet: &[u8]) -> Result<Vec<u8>, Error> {
        debug!("Sending {} byte packet", packet.len());

        let req = self
            .authorized(HttpRequest::post(
                self.service_url("data", "msgPack"),
                packet.to_vec(),
            ))
            .header("Content-Type", "application/octet-stream");
        let resp = Self::checked(self.t.exchange(req).await?)?;

        Ok(resp.body)
    }

    /// Confirm a sealed payload hash with an on-premise validator
    ///
    /// Takes the base64 payload hash as the final path segment and returns
    /// the validator's proof document. The validator is unauthenticated.
    pub async fn verify_sealed(
        &self,
        validator: &str,
        payload_hash_b64: &str,
    ) -> Result<serde_json::Value, Error> {
        debug!("Validating sealed hash {payload_hash_b64}");

        let url = format!(
            "{}/{}",
            validator.trim_end_matches('/'),
            escape_hash(payload_hash_b64)
        );
        let resp = Self::checked(self.t.exchange(HttpRequest::get(url)).await?)?;

        Ok(resp.json()?)
    }
}

/// Escape a base64 hash for use as a path segment
///
/// The validator accepts `+` and `=` as-is, a `/` must be percent-encoded.
fn escape_hash(hash: &str) -> String {
    hash.replace('/', "%2F")
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;

    use crate::transport::TransportError;

    use super::*;

    /// Transport that refuses everything, for url-shape tests
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn exchange(&self, _req: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Request("null transport".to_string()))
        }
    }

    #[test]
    fn service_urls() {
        let api = ApiHandle::new(NullTransport, "token", "demo");

        assert_eq!(
            api.service_url("key", "pubkey/mpack"),
            "https://key.demo.chainseal.io/api/keyService/v1/pubkey/mpack"
        );
        assert_eq!(
            api.service_url("auth", "userInfo"),
            "https://auth.demo.chainseal.io/api/authService/v1/userInfo"
        );
    }

    #[test]
    fn escape_hash_path_segment() {
        assert_eq!(escape_hash("ab+cd=="), "ab+cd==");
        assert_eq!(escape_hash("ab/cd/=="), "ab%2Fcd%2F==");
    }

    #[test]
    fn device_record_json_shape() {
        let record = DeviceRecord {
            device_id: Uuid::nil(),
            device_type_key: "demo-device".to_string(),
            device_name: "Demo Device".to_string(),
            hw_device_id: Uuid::nil(),
            tags: vec!["milestone-demo".to_string()],
            device_properties: DeviceProperties {
                stores_data: true,
                block_chain: false,
            },
            created: DateTime::from_timestamp(1_700_000_000, 123_000_000).unwrap(),
        };

        let doc: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();

        assert_eq!(doc["deviceTypeKey"], "demo-device");
        assert_eq!(doc["hwDeviceId"], Uuid::nil().to_string());
        assert_eq!(doc["deviceProperties"]["storesData"], true);
        assert_eq!(doc["deviceProperties"]["blockChain"], false);
        assert_eq!(doc["created"], "2023-11-14T22:13:20.123Z");
    }
}
