use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Transport layer for ZeroMQ connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Unix domain socket at the given filesystem path.
    Ipc(String),

    /// TCP transport for distributed deployment.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Create an IPC transport with the given socket name.
    ///
    /// The name is used as a path component under `/tmp/ruleflow/`.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(format!("/tmp/ruleflow/{name}.sock"))
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse a ZeroMQ endpoint string such as `tcp://127.0.0.1:5555`
    /// or `ipc:///tmp/ruleflow/bus.sock`.
    pub fn parse(endpoint: &str) -> Result<Self, BusError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(BusError::InvalidEndpoint(endpoint.to_string()));
            }
            return Ok(Self::Ipc(path.to_string()));
        }
        let addr = endpoint
            .strip_prefix("tcp://")
            .ok_or_else(|| BusError::InvalidEndpoint(endpoint.to_string()))?;
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| BusError::InvalidEndpoint(endpoint.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| BusError::InvalidEndpoint(endpoint.to_string()))?;
        if host.is_empty() {
            return Err(BusError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self::tcp(host, port))
    }

    /// Generate the ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(path) => format!("ipc://{path}"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// For IPC transports, ensure the parent directory exists.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(path) = self {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}
