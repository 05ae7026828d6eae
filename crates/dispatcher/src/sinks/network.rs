//! NetworkSink - one UDP datagram per obstacle report
//!
//! Datagrams are connected to a single target. A report whose encoding does
//! not fit `max_packet_size` is refused rather than truncated, and a failed
//! send is reported to the worker so it lands in the sink's failure count.

use contracts::{ContractError, ObstacleReport, ReportSink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// Default datagram ceiling, just under the IPv4 UDP payload limit
pub const DEFAULT_MAX_PACKET_SIZE: usize = 65000;

/// Datagram encoding of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// Full report as a JSON object
    #[default]
    Json,
    /// Full report, bincode 1.x
    Bincode,
    /// The rendered `[source #seq] <result line>`, newline terminated
    Text,
}

impl NetworkFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "bincode" => Some(Self::Bincode),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn encode(self, report: &ObstacleReport) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(report).map_err(|e| format!("json error: {}", e)),
            Self::Bincode => {
                bincode::serialize(report).map_err(|e| format!("bincode error: {}", e))
            }
            Self::Text => Ok(format!("{}\n", report).into_bytes()),
        }
    }
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Encoded reports above this size are not sent
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn new(addr: SocketAddr, format: NetworkFormat) -> Self {
        Self {
            addr,
            format,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Read `addr`, `format` and `max_packet_size` from sink params
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format") {
            None => NetworkFormat::default(),
            Some(name) => NetworkFormat::parse(name)
                .ok_or_else(|| format!("unknown format '{}'", name))?,
        };

        let max_packet_size = match params.get("max_packet_size") {
            None => DEFAULT_MAX_PACKET_SIZE,
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("invalid max_packet_size '{}': {}", raw, e))?,
        };

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that streams reports to a UDP listener
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            format = ?config.format,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_connection(&name, e))?;

        let sink_name = name.clone();
        Self::new(name, config)
            .await
            .map_err(|e| ContractError::sink_connection(sink_name, e.to_string()))
    }

    /// Encode a report, refusing datagrams above `max_packet_size`
    fn datagram(&self, report: &ObstacleReport) -> Result<Vec<u8>, ContractError> {
        let data = self
            .config
            .format
            .encode(report)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                source_id = %report.source_id,
                seq = report.seq,
                size = data.len(),
                max = self.config.max_packet_size,
                "Report too large for one datagram"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!("payload of {} bytes exceeds max_packet_size", data.len()),
            ));
        }

        Ok(data)
    }
}

impl ReportSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, report),
        fields(sink = %self.name, seq = report.seq)
    )]
    async fn write(&mut self, report: &ObstacleReport) -> Result<(), ContractError> {
        let data = self.datagram(report)?;
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))?;

        let sent = socket
            .send(&data)
            .await
            .map_err(|e| ContractError::sink_write(&self.name, format!("send failed: {}", e)))?;
        if sent < data.len() {
            return Err(ContractError::sink_write(
                &self.name,
                format!("datagram truncated to {} of {} bytes", sent, data.len()),
            ));
        }

        debug!(sink = %self.name, seq = report.seq, bytes = sent, "Sent");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
