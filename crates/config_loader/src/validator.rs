//! Configuration validation
//!
//! Rules:
//! - at least one source
//! - per-field bounds declared on the blueprint types (`validator` derive)
//! - source ids and sink names unique
//! - type-specific params present and well-formed

use std::collections::HashSet;

use contracts::{
    ContractError, MonitorBlueprint, SinkConfig, SinkType, SourceConfig, SourceType,
};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a MonitorBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    validate_has_sources(blueprint)?;
    validate_field_rules(blueprint)?;
    validate_source_ids(blueprint)?;
    validate_sink_names(blueprint)?;
    for source in &blueprint.sources {
        validate_source_params(source)?;
    }
    for sink in &blueprint.sinks {
        validate_sink_params(sink)?;
    }
    Ok(())
}

fn validate_has_sources(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    if blueprint.sources.is_empty() {
        return Err(ContractError::config_validation(
            "sources",
            "at least one source is required",
        ));
    }
    Ok(())
}

/// Run the derive rules and report the first violation by path
fn validate_field_rules(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let Err(errors) = blueprint.validate() else {
        return Ok(());
    };

    let mut violations = Vec::new();
    flatten_errors("", &errors, &mut violations);
    violations.sort();

    let (field, message) = violations
        .into_iter()
        .next()
        .unwrap_or_else(|| (String::new(), errors.to_string()));
    Err(ContractError::config_validation(field, message))
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten_errors(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

fn validate_source_ids(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for source in &blueprint.sources {
        if !seen.insert(source.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sources[id={}]", source.id),
                "duplicate source id",
            ));
        }
    }
    Ok(())
}

fn validate_sink_names(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_source_params(source: &SourceConfig) -> Result<(), ContractError> {
    if !source.frequency_hz.is_finite() {
        return Err(ContractError::config_validation(
            format!("sources[{}].frequency_hz", source.id),
            "frequency_hz must be finite",
        ));
    }
    if source.source_type == SourceType::Mock
        && std::time::Duration::try_from_secs_f64(1.0 / source.frequency_hz).is_err()
    {
        return Err(ContractError::config_validation(
            format!("sources[{}].frequency_hz", source.id),
            "frequency_hz is too small to schedule scans",
        ));
    }
    if source.source_type == SourceType::Replay && !source.params.contains_key("path") {
        return Err(ContractError::config_validation(
            format!("sources[{}].params.path", source.id),
            "replay source requires a recording path",
        ));
    }
    Ok(())
}

fn validate_sink_params(sink: &SinkConfig) -> Result<(), ContractError> {
    let field = |key: &str| format!("sinks[{}].params.{key}", sink.name);
    let format = sink.params.get("format").map(String::as_str);

    match sink.sink_type {
        SinkType::Network => {
            let addr = sink.params.get("addr").ok_or_else(|| {
                ContractError::config_validation(field("addr"), "network sink requires 'addr'")
            })?;
            if addr.parse::<std::net::SocketAddr>().is_err() {
                return Err(ContractError::config_validation(
                    field("addr"),
                    format!("invalid socket address '{addr}'"),
                ));
            }
            if let Some(other) = format.filter(|f| !matches!(*f, "json" | "bincode" | "text")) {
                return Err(ContractError::config_validation(
                    field("format"),
                    format!("unknown network format '{other}'"),
                ));
            }
            if let Some(raw) = sink.params.get("max_packet_size") {
                if !matches!(raw.parse::<usize>(), Ok(size) if size > 0) {
                    return Err(ContractError::config_validation(
                        field("max_packet_size"),
                        format!("max_packet_size must be a positive integer, got '{raw}'"),
                    ));
                }
            }
        }
        SinkType::File => {
            if let Some(other) = format.filter(|f| !matches!(*f, "text" | "jsonl")) {
                return Err(ContractError::config_validation(
                    field("format"),
                    format!("unknown file format '{other}'"),
                ));
            }
        }
        SinkType::Log | SinkType::Console => {}
    }

    if let Some(raw) = sink.params.get("flush_interval_ms") {
        if raw.parse::<u64>().is_err() {
            return Err(ContractError::config_validation(
                field("flush_interval_ms"),
                format!("flush_interval_ms must be a whole number of milliseconds, got '{raw}'"),
            ));
        }
    }
    Ok(())
}
