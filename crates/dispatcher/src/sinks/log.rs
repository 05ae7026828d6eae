//! LogSink - reports through tracing

use contracts::{ContractError, ObstacleReport, ObstacleResult, ReportSink};
use tracing::{info, instrument};

/// Sink that emits one structured log event per report
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_report(&self, report: &ObstacleReport) {
        match report.result {
            ObstacleResult::Found {
                distance,
                index,
                angle_degrees,
            } => info!(
                sink = %self.name,
                source_id = %report.source_id,
                seq = report.seq,
                timestamp = report.timestamp,
                distance,
                index,
                angle_degrees,
                "{}",
                report.result
            ),
            ObstacleResult::NotFound => info!(
                sink = %self.name,
                source_id = %report.source_id,
                seq = report.seq,
                timestamp = report.timestamp,
                "{}",
                report.result
            ),
        }
    }
}

impl ReportSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, report),
        fields(sink = %self.name, seq = report.seq)
    )]
    async fn write(&mut self, report: &ObstacleReport) -> Result<(), ContractError> {
        self.log_report(report);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
