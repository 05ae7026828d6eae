//! FileSink - appends reports to a file

use chrono::Local;
use contracts::{ContractError, ObstacleReport, ReportSink};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// On-disk layout of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// `[source #seq] <result line>`
    #[default]
    Text,
    /// One JSON object per line
    Jsonl,
}

impl FileFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Text => "log",
            Self::Jsonl => "jsonl",
        }
    }
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    pub format: FileFormat,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map.
    ///
    /// Without `path`, the file is created under `dir` (default `.`) with a
    /// name stamped by the local start time.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let format = match params.get("format").map(String::as_str) {
            Some("text") | None => FileFormat::Text,
            Some("jsonl") => FileFormat::Jsonl,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let append = match params.get("append").map(String::as_str) {
            Some("true") | None => true,
            Some("false") => false,
            Some(other) => return Err(format!("invalid append flag '{}'", other)),
        };

        let path = match params.get("path") {
            Some(path) => PathBuf::from(path),
            None => {
                let dir = params.get("dir").map(String::as_str).unwrap_or(".");
                Path::new(dir).join(default_file_name(format))
            }
        };

        Ok(Self {
            path,
            format,
            append,
        })
    }
}

fn default_file_name(format: FileFormat) -> String {
    format!(
        "obstacles_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Sink that writes reports to a file
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) the output file
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        let name = name.into();
        debug!(sink = %name, path = %config.path.display(), "FileSink opened");

        Ok(Self {
            name,
            config,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn render(&self, report: &ObstacleReport) -> std::io::Result<String> {
        match self.config.format {
            FileFormat::Text => Ok(format!("{report}\n")),
            FileFormat::Jsonl => {
                let mut line = serde_json::to_string(report)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                line.push('\n');
                Ok(line)
            }
        }
    }

    fn persist_report(&mut self, report: &ObstacleReport) -> Result<(), ContractError> {
        let result = self.render(report).and_then(|line| match self.writer.as_mut() {
            Some(writer) => writer.write_all(line.as_bytes()),
            None => Err(std::io::Error::other("file already closed")),
        });

        result.map_err(|e| {
            error!(sink = %self.name, seq = report.seq, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl ReportSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, report),
        fields(sink = %self.name, seq = report.seq)
    )]
    async fn write(&mut self, report: &ObstacleReport) -> Result<(), ContractError> {
        self.persist_report(report)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
