//! Modbus TCP link to the Compute Box.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use log::{info, trace};
use serde::{Deserialize, Serialize};
use tokio_modbus::client::sync::{self, Reader as _, Writer as _};
use tokio_modbus::Slave;

use crate::RgError;

/// Endpoint and timeouts of the Compute Box connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// IP address or hostname of the Compute Box.
    pub host: String,
    pub port: u16,
    /// Modbus unit id the gripper answers on.
    pub unit_id: u8,
    /// Bound on the TCP handshake and on every request/response exchange.
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Factory IP address of the Compute Box.
    pub const DEFAULT_HOST: &'static str = "192.168.1.1";
    pub const DEFAULT_PORT: u16 = 502;
    /// The Modbus unit id of the RG gripper on the Compute Box.
    pub const DEFAULT_UNIT_ID: u8 = 65;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            unit_id: Self::DEFAULT_UNIT_ID,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Holding register exchanges with the gripper.
pub trait Transport {
    /// Read `count` holding registers starting at `address`.
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, RgError>;
    /// Write `values` to the holding registers starting at `address`.
    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), RgError>;
    /// Release the connection. Calling it again does nothing.
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

/// Blocking Modbus TCP connection.
pub struct ModbusTcp {
    endpoint: String,
    ctx: Option<sync::Context>,
    transactions: u64,
}

impl ModbusTcp {
    /// Connect to `host:port` with the default unit id and timeout.
    pub fn connect(host: &str, port: u16) -> Result<Self, RgError> {
        Self::connect_with(&ConnectionConfig::new(host, port))
    }

    /// Connect with an explicit configuration.
    ///
    /// Fails with [`RgError::Connection`] if the endpoint does not resolve or
    /// the handshake does not complete within `config.timeout`.
    pub fn connect_with(config: &ConnectionConfig) -> Result<Self, RgError> {
        let endpoint = config.endpoint();
        let connection_error = |source: io::Error| RgError::Connection {
            endpoint: endpoint.clone(),
            source,
        };

        let socket_addr = resolve(&config.host, config.port).map_err(connection_error)?;
        let ctx = sync::tcp::connect_slave_with_timeout(
            socket_addr,
            Slave(config.unit_id),
            Some(config.timeout),
        )
        .map_err(connection_error)?;

        info!("connected to {} (unit {})", endpoint, config.unit_id);
        Ok(Self {
            endpoint,
            ctx: Some(ctx),
            transactions: 0,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of request/response exchanges issued so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    fn next_transaction(&mut self) -> Result<(u64, &mut sync::Context), RgError> {
        let ctx = self.ctx.as_mut().ok_or(RgError::Closed)?;
        self.transactions += 1;
        Ok((self.transactions, ctx))
    }
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host} did not resolve to any address"),
        )
    })
}

impl Transport for ModbusTcp {
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, RgError> {
        let (tx, ctx) = self.next_transaction()?;
        trace!("tx {tx}: read {count} holding registers at {address}");

        let words = ctx
            .read_holding_registers(address, count)
            .map_err(|source| RgError::Modbus { address, source })?
            .map_err(|exception| RgError::Exception { address, exception })?;

        if words.len() != count as usize {
            return Err(RgError::ShortResponse {
                address,
                expected: count as usize,
                actual: words.len(),
            });
        }
        trace!("tx {tx}: {words:?}");
        Ok(words)
    }

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), RgError> {
        let (tx, ctx) = self.next_transaction()?;
        trace!("tx {tx}: write {values:?} at {address}");

        let result = match values {
            [value] => ctx.write_single_register(address, *value),
            _ => ctx.write_multiple_registers(address, values),
        };
        result
            .map_err(|source| RgError::Modbus { address, source })?
            .map_err(|exception| RgError::Exception { address, exception })
    }

    fn close(&mut self) {
        if self.ctx.take().is_some() {
            info!(
                "disconnected from {} after {} transactions",
                self.endpoint, self.transactions
            );
        }
    }

    fn is_open(&self) -> bool {
        self.ctx.is_some()
    }
}

impl Drop for ModbusTcp {
    fn drop(&mut self) {
        self.close();
    }
}
