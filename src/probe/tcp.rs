//! Plain TCP connect probe.

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::failover::types::Target;
use crate::probe::{Probe, ProbeError};

pub struct TcpProbe {
    primary_addr: String,
    backup_addr: String,
}

impl TcpProbe {
    pub fn new(primary_addr: String, backup_addr: String) -> Self {
        Self {
            primary_addr,
            backup_addr,
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self, target: Target) -> Result<(), ProbeError> {
        let addr = match target {
            Target::Primary => &self.primary_addr,
            Target::Backup => &self.backup_addr,
        };
        TcpStream::connect(addr.as_str())
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Connect(format!("{}: {}", addr, e)))
    }
}
