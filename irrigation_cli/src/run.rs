//! `run` and `self-check` subcommands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eyre::WrapErr;
use irrigation_config::{Config, FeatureContract};
use irrigation_core::{
    Controller, LinkCfg, LinkManager, RunSummary, Service, controller_from_config, stop_pair,
};
use irrigation_hardware::{FieldParams, ReplayConnector, SimulatedField};
use irrigation_traits::Connector;
use serde_json::json;

use crate::cli::LinkArgs;
use crate::error_fmt::CliError;

/// Read, parse and validate the config file, then apply CLI overrides.
pub fn load_config(path: &Path, link: &LinkArgs) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg = irrigation_config::load_toml(&text).map_err(CliError::ConfigParse)?;
    if let Some(port) = &link.port {
        cfg.serial.port.clone_from(port);
    }
    if let Some(baud) = link.baud {
        cfg.serial.baud = baud;
    }
    cfg.validate()
        .map_err(|e| CliError::ConfigInvalid(e.to_string()))?;
    Ok(cfg)
}

/// Load `dose.contract`, resolving a relative path against the config file's directory.
fn load_contract(cfg: &Config, config_path: &Path) -> eyre::Result<Option<FeatureContract>> {
    let Some(raw) = cfg.dose.contract.as_deref() else {
        return Ok(None);
    };
    let mut path = PathBuf::from(raw);
    if path.is_relative()
        && let Some(dir) = config_path.parent()
    {
        path = dir.join(path);
    }
    let contract = irrigation_config::load_feature_contract(&path)
        .map_err(|e| CliError::Contract(e.to_string()))?;
    tracing::info!(path = %path.display(), features = contract.features.len(), "feature contract loaded");
    Ok(Some(contract))
}

fn build_controller(cfg: &Config, config_path: &Path) -> eyre::Result<Controller> {
    let contract = load_contract(cfg, config_path)?;
    controller_from_config(cfg, contract.as_ref()).wrap_err("build controller")
}

fn connector(cfg: &Config, link: &LinkArgs) -> eyre::Result<Box<dyn Connector>> {
    if link.sim {
        return Ok(Box::new(SimulatedField::new(FieldParams {
            sample_interval: Duration::from_millis(link.sim_interval_ms),
            ..FieldParams::default()
        })));
    }
    if let Some(path) = &link.replay {
        // a replay file that is not there now will not appear on retry
        if !path.is_file() {
            return Err(CliError::LinkOpen {
                endpoint: format!("replay:{}", path.display()),
                reason: "no such file".into(),
            }
            .into());
        }
        let chunk = usize::try_from(link.replay_chunk).unwrap_or(64);
        let sink: irrigation_hardware::SharedSink = Arc::new(Mutex::new(std::io::stdout()));
        return Ok(Box::new(ReplayConnector::new(path, chunk, sink)));
    }
    serial_connector(cfg)
}

#[cfg(feature = "hardware")]
fn serial_connector(cfg: &Config) -> eyre::Result<Box<dyn Connector>> {
    Ok(Box::new(irrigation_hardware::SerialConnector::new(
        cfg.serial.port.clone(),
        cfg.serial.baud,
    )))
}

#[cfg(not(feature = "hardware"))]
fn serial_connector(cfg: &Config) -> eyre::Result<Box<dyn Connector>> {
    Err(CliError::NoSerialSupport(cfg.serial.port.clone()).into())
}

pub fn run(
    config_path: &Path,
    cfg: &Config,
    link: &LinkArgs,
    max_records: Option<u64>,
    json: bool,
) -> eyre::Result<()> {
    let controller = build_controller(cfg, config_path)?;
    let connector = connector(cfg, link)?;
    let link_cfg = LinkCfg::from(cfg);

    let (handle, signal) = stop_pair();
    ctrlc::set_handler(move || handle.stop()).wrap_err("install Ctrl-C handler")?;

    let mut service = Service::new(
        LinkManager::new(connector, &link_cfg),
        &link_cfg,
        controller,
        signal,
    )
    .with_max_records(max_records);
    if link.sim {
        service = service.on_command(|line| {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(line.as_bytes());
            let _ = out.flush();
        });
    }

    let summary = service.run();
    if json {
        println!("{}", summary_json(&summary));
    } else {
        eprintln!(
            "{}: {} records ({} dropped), {} commands sent, {} reconnects",
            summary.exit,
            summary.records,
            summary.dropped,
            summary.commands_written,
            summary.reconnects
        );
    }
    Ok(())
}

pub fn summary_json(s: &RunSummary) -> serde_json::Value {
    json!({
        "summary": {
            "exit": s.exit.as_str(),
            "lines": s.lines,
            "records": s.records,
            "dropped": s.dropped,
            "commands_written": s.commands_written,
            "write_failures": s.write_failures,
            "link_failures": s.link_failures,
            "reconnects": s.reconnects,
            "framing_overflows": s.framing_overflows,
        }
    })
}

pub fn self_check(config_path: &Path, cfg: &Config, link: &LinkArgs, json: bool) -> eyre::Result<()> {
    let controller = build_controller(cfg, config_path)?;
    let mut connector = connector(cfg, link)?;
    let endpoint = connector.describe();

    let mut conn = connector.open().map_err(|e| CliError::LinkOpen {
        endpoint: endpoint.clone(),
        reason: e.to_string(),
    })?;
    if let Err(e) = conn.close() {
        tracing::warn!(error = %e, "error closing link after self-check");
    }

    let t = controller.engine().thresholds();
    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "endpoint": endpoint,
                "dry_threshold": t.dry(),
                "wet_threshold": t.wet(),
                "aggregation": controller.engine().aggregation().name(),
                "window": controller.window().capacity(),
                "estimator": controller.planner().has_estimator(),
                "allowed_seconds": controller.planner().allowed(),
            })
        );
    } else {
        println!(
            "self-check ok: link {endpoint}, dry {} / wet {} ({}), window {}, estimator {}",
            t.dry(),
            t.wet(),
            controller.engine().aggregation().name(),
            controller.window().capacity(),
            if controller.planner().has_estimator() {
                "configured"
            } else {
                "none"
            }
        );
    }
    Ok(())
}
