//! ConsoleSink - one line per report on stdout

use std::collections::HashMap;

use contracts::{ContractError, ObstacleReport, ReportSink};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tracing::{debug, instrument};

/// Prints the rendered result line of every report.
///
/// With `with_prefix` the line carries the source and sequence number:
/// `[front #12] Closest obstacle: ...`.
pub struct ConsoleSink<W = Stdout> {
    name: String,
    out: W,
    with_prefix: bool,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_writer(name, tokio::io::stdout())
    }

    /// Create from params map; `prefix = "true"` enables line prefixes
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let with_prefix = params.get("prefix").is_some_and(|v| v == "true");
        Self::new(name).with_prefix(with_prefix)
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    pub fn with_writer(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
            with_prefix: false,
        }
    }

    /// Prefix lines with `[source #seq]`
    pub fn with_prefix(mut self, enabled: bool) -> Self {
        self.with_prefix = enabled;
        self
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn render(&self, report: &ObstacleReport) -> String {
        if self.with_prefix {
            format!("{report}\n")
        } else {
            format!("{}\n", report.result)
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> ReportSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "console_sink_write",
        skip(self, report),
        fields(sink = %self.name, seq = report.seq)
    )]
    async fn write(&mut self, report: &ObstacleReport) -> Result<(), ContractError> {
        let line = self.render(report);
        self.out
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "console_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.out
            .flush()
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "console_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        ReportSink::flush(self).await?;
        debug!(sink = %self.name, "ConsoleSink closed");
        Ok(())
    }
}
