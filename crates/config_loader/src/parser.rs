//! Configuration parsing
//!
//! TOML is the primary format; JSON is accepted as well.

use contracts::{ContractError, MonitorBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<MonitorBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<MonitorBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<MonitorBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DropPolicy, SinkType, SourceType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[sources]]
id = "front_lidar"
source_type = "mock"
frequency_hz = 20.0

[sources.params]
num_samples = "720"

[ingestion]
channel_capacity = 8
drop_policy = "drop_newest"

[[sinks]]
name = "stdout"
sink_type = "console"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.sources.len(), 1);
        assert_eq!(bp.sources[0].source_type, SourceType::Mock);
        assert_eq!(bp.sources[0].params["num_samples"], "720");
        assert_eq!(bp.ingestion.channel_capacity, 8);
        assert_eq!(bp.ingestion.drop_policy, DropPolicy::DropNewest);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Console);
        assert_eq!(bp.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "sources": [{
                "id": "rec",
                "source_type": "replay",
                "params": { "path": "scans.jsonl" }
            }],
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.sources[0].source_type, SourceType::Replay);
        assert_eq!(bp.sources[0].frequency_hz, 10.0);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_source_type() {
        let content = r#"
[[sources]]
id = "x"
source_type = "radar"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
