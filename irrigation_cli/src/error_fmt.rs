//! CLI error type, human-readable error descriptions and structured JSON errors.

use std::path::PathBuf;

use irrigation_core::BuildError;
use serde_json::json;
use thiserror::Error;

/// Failures the CLI raises itself, before or around the control loop.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config is not valid TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("{0}")]
    Contract(String),
    #[error("serial support not compiled in (port {0})")]
    NoSerialSupport(String),
    #[error("cannot open link {endpoint}: {reason}")]
    LinkOpen { endpoint: String, reason: String },
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::ConfigRead { path, source } => format!(
                "What happened: Could not read the config file {}: {source}.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file (see etc/irrigation.toml).",
                path.display()
            ),
            CliError::ConfigParse(e) => format!(
                "What happened: The config file is not valid TOML or has wrong types.\nLikely causes: A typo, a missing [control] section, or an unknown aggregation/estimator name.\nHow to fix: Correct the file and rerun. Parser said: {e}"
            ),
            CliError::ConfigInvalid(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            CliError::Contract(msg) => format!(
                "What happened: The feature contract could not be loaded ({msg}).\nLikely causes: dose.contract points at a missing file, or the JSON lacks a non-empty \"features\" list.\nHow to fix: Ship the contract JSON next to the dose model and point dose.contract at it."
            ),
            CliError::NoSerialSupport(port) => format!(
                "What happened: This build cannot open serial port {port}.\nLikely causes: The binary was built without the `hardware` feature.\nHow to fix: Rebuild with `--features hardware`, or use --sim / --replay FILE."
            ),
            CliError::LinkOpen { endpoint, reason } => format!(
                "What happened: Could not open the link {endpoint} ({reason}).\nLikely causes: Device not paired or unplugged, wrong port, or no permission on the device node.\nHow to fix: Check the port (--port or IRRIGATION_PORT), pairing and dialout group membership."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingThresholds | BuildError::InvalidThresholds { .. } => format!(
                "What happened: {be}.\nLikely causes: control.wet_threshold is not below control.dry_threshold.\nHow to fix: Set [control] dry_threshold above wet_threshold (raw probe units rise as soil dries)."
            ),
            BuildError::UnknownFeature(name) => format!(
                "What happened: The feature contract asks for '{name}', which this controller does not compute.\nLikely causes: The model was trained with a different feature set.\nHow to fix: Retrain against the supported feature names or fix the contract file."
            ),
            BuildError::UnknownWeight(name) => format!(
                "What happened: [dose.linear.weights] names '{name}', which is not in the feature contract.\nLikely causes: A stale weight after the contract changed.\nHow to fix: Remove the weight or add the feature to the contract."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 for config/build problems, 3 when the link cannot be opened.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<CliError>() {
        Some(CliError::LinkOpen { .. } | CliError::NoSerialSupport(_)) => 3,
        Some(_) => 2,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::ConfigRead { .. } | CliError::ConfigParse(_) | CliError::ConfigInvalid(_) => {
                "Config"
            }
            CliError::Contract(_) => "Contract",
            CliError::NoSerialSupport(_) | CliError::LinkOpen { .. } => "Link",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    })
    .to_string()
}
