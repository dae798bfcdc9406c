use crate::core::{InventoryProvider, Port, PortQuery};
use crate::utils::error::{Result, UnusedPortsError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Neutron wraps lists in `{"ports": [...]}`; hand-written fixtures are often bare arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum PortDocument {
    Envelope { ports: Vec<Port> },
    List(Vec<Port>),
}

pub fn parse_ports(data: &[u8]) -> Result<Vec<Port>> {
    let document: PortDocument = serde_json::from_slice(data)?;
    Ok(match document {
        PortDocument::Envelope { ports } => ports,
        PortDocument::List(ports) => ports,
    })
}

/// Ports exported to a JSON file (e.g. `openstack port list -f json --long`
/// or a saved Neutron response). Query filters are applied locally.
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventoryProvider for FileInventory {
    async fn list_ports(&self, query: &PortQuery) -> Result<Vec<Port>> {
        tracing::debug!("Reading ports from {}", self.path.display());
        let data = tokio::fs::read(&self.path).await?;
        let ports = parse_ports(&data)?;
        let total = ports.len();

        let matching: Vec<Port> = ports.into_iter().filter(|p| query.matches(p)).collect();
        tracing::debug!("{} of {} ports match the query", matching.len(), total);
        Ok(matching)
    }
}

/// Neutron `GET /v2.0/ports` with server-side filtering.
///
/// The token is passed through as-is; obtaining one is the caller's job.
#[derive(Clone)]
pub struct HttpInventory {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInventory")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpInventory {
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            auth_token,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ports_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/ports") {
            base.to_string()
        } else {
            format!("{}/v2.0/ports", base)
        }
    }
}

#[async_trait]
impl InventoryProvider for HttpInventory {
    async fn list_ports(&self, query: &PortQuery) -> Result<Vec<Port>> {
        let url = self.ports_url();
        tracing::debug!("Making inventory request to: {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(&query.to_params())
            .timeout(self.timeout);
        if let Some(token) = &self.auth_token {
            request = request.header("X-Auth-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Inventory response status: {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UnusedPortsError::InventoryError {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let body = response.bytes().await?;
        parse_ports(&body)
    }
}

/// Picks the adapter from the shape of `source`: URLs go over HTTP, anything else is a file.
#[derive(Debug, Clone)]
pub enum Inventory {
    File(FileInventory),
    Http(HttpInventory),
}

impl Inventory {
    pub fn from_source(source: &str, auth_token: Option<String>) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            Inventory::Http(HttpInventory::new(source, auth_token))
        } else {
            Inventory::File(FileInventory::new(source))
        }
    }
}

#[async_trait]
impl InventoryProvider for Inventory {
    async fn list_ports(&self, query: &PortQuery) -> Result<Vec<Port>> {
        match self {
            Inventory::File(inventory) => inventory.list_ports(query).await,
            Inventory::Http(inventory) => inventory.list_ports(query).await,
        }
    }
}
