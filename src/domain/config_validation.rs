//! Configuration loading and validation.
//!
//! Builds the typed settings structs from a [`ConfigPort`]. Absent keys
//! take their defaults; keys that are present but unparsable or out of
//! range are rejected with the section and key that caused it.

use crate::domain::distribution::DistributionSettings;
use crate::domain::equitable::DiversityMode;
use crate::domain::error::EquiscoreError;
use crate::domain::execution::ExecutionGate;
use crate::domain::orchestrator::PassConfig;
use crate::domain::scoring::ScoreWeights;
use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = "data";

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub universe: Universe,
    pub data_dir: String,
    pub pass: PassConfig,
    pub execution: ExecutionGate,
}

pub fn load_app_config(config: &dyn ConfigPort) -> Result<AppConfig, EquiscoreError> {
    Ok(AppConfig {
        universe: load_universe(config)?,
        data_dir: load_data_dir(config),
        pass: load_pass_config(config)?,
        execution: load_execution_gate(config)?,
    })
}

pub fn load_universe(config: &dyn ConfigPort) -> Result<Universe, EquiscoreError> {
    match config.get_string("universe", "symbols") {
        Some(s) if !s.trim().is_empty() => {
            Universe::parse(&s).map_err(|e| EquiscoreError::ConfigInvalid {
                section: "universe".to_string(),
                key: "symbols".to_string(),
                reason: e.to_string(),
            })
        }
        _ => Err(EquiscoreError::ConfigMissing {
            section: "universe".to_string(),
            key: "symbols".to_string(),
        }),
    }
}

pub fn load_data_dir(config: &dyn ConfigPort) -> String {
    config
        .get_string("universe", "data_dir")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

pub fn load_pass_config(config: &dyn ConfigPort) -> Result<PassConfig, EquiscoreError> {
    let defaults = PassConfig::default();
    let diversity_mode = match config.get_string("pass", "diversity_mode") {
        None => defaults.diversity_mode,
        Some(raw) => raw
            .parse::<DiversityMode>()
            .map_err(|reason| EquiscoreError::ConfigInvalid {
                section: "pass".to_string(),
                key: "diversity_mode".to_string(),
                reason,
            })?,
    };

    PassConfig {
        batch_size: parse_or(config, "pass", "batch_size", defaults.batch_size)?,
        concurrency: parse_or(config, "pass", "concurrency", defaults.concurrency)?,
        lookback_bars: parse_or(config, "pass", "lookback_bars", defaults.lookback_bars)?,
        top_k: parse_or(config, "pass", "top_k", defaults.top_k)?,
        weights: load_weights(config)?,
        distribution: load_distribution(config)?,
        diversity_mode,
    }
    .validated()
}

pub fn load_weights(config: &dyn ConfigPort) -> Result<ScoreWeights, EquiscoreError> {
    let d = ScoreWeights::default();
    ScoreWeights {
        rsi: parse_or(config, "weights", "rsi", d.rsi)?,
        macd: parse_or(config, "weights", "macd", d.macd)?,
        bollinger: parse_or(config, "weights", "bollinger", d.bollinger)?,
        ma: parse_or(config, "weights", "ma", d.ma)?,
        volume: parse_or(config, "weights", "volume", d.volume)?,
        momentum: parse_or(config, "weights", "momentum", d.momentum)?,
        pattern: parse_or(config, "weights", "pattern", d.pattern)?,
        risk: parse_or(config, "weights", "risk", d.risk)?,
    }
    .validated()
}

pub fn load_distribution(config: &dyn ConfigPort) -> Result<DistributionSettings, EquiscoreError> {
    let d = DistributionSettings::default();
    let s = "distribution";
    DistributionSettings {
        max_sector_concentration_pct: parse_or(
            config,
            s,
            "max_sector_concentration_pct",
            d.max_sector_concentration_pct,
        )?,
        max_quintile_concentration_pct: parse_or(
            config,
            s,
            "max_quintile_concentration_pct",
            d.max_quintile_concentration_pct,
        )?,
        min_sectors_represented: parse_or(
            config,
            s,
            "min_sectors_represented",
            d.min_sectors_represented,
        )?,
        min_quintiles_represented: parse_or(
            config,
            s,
            "min_quintiles_represented",
            d.min_quintiles_represented,
        )?,
        small_cap_target_pct: parse_or(config, s, "small_cap_target_pct", d.small_cap_target_pct)?,
        mid_cap_target_pct: parse_or(config, s, "mid_cap_target_pct", d.mid_cap_target_pct)?,
        large_cap_max_pct: parse_or(config, s, "large_cap_max_pct", d.large_cap_max_pct)?,
    }
    .validated()
}

pub fn load_execution_gate(config: &dyn ConfigPort) -> Result<ExecutionGate, EquiscoreError> {
    let d = ExecutionGate::default();
    ExecutionGate {
        score_threshold: parse_or(config, "execution", "score_threshold", d.score_threshold)?,
        allocation_fraction: parse_or(
            config,
            "execution",
            "allocation_fraction",
            d.allocation_fraction,
        )?,
    }
    .validated()
}

fn parse_or<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, EquiscoreError>
where
    T: FromStr,
    T::Err: Display,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| EquiscoreError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("cannot parse '{}': {e}", raw.trim()),
        }),
    }
}
