use std::path::Path;

use anyhow::Context;
use log::{debug, info};

use raidplan_api::{
    config::RaidConfiguration,
    error::{InvalidInputError, RaidplanError, ReportError},
};

use crate::hints::DeviceHintMatcher;

/// Reads and parses a RAID configuration file. YAML and JSON are both accepted.
pub fn load_raid_config(path: impl AsRef<Path>) -> Result<RaidConfiguration, RaidplanError> {
    let path = path.as_ref();
    info!("Loading RAID configuration from '{}'", path.display());

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .structured(InvalidInputError::LoadRaidConfiguration {
            path: path.display().to_string(),
        })?;

    serde_yaml::from_str::<RaidConfiguration>(&contents)
        .with_context(|| {
            format!(
                "Failed to parse RAID configuration YAML file: {}",
                path.display()
            )
        })
        .structured(InvalidInputError::ParseRaidConfiguration {
            path: path.display().to_string(),
        })
}

/// Checks the RAID configuration without looking at any block device.
pub fn validate_raid_config(config: &RaidConfiguration) -> Result<(), RaidplanError> {
    config
        .validate()
        .map_err(|e| RaidplanError::new(InvalidInputError::from(e)))?;

    let matcher = DeviceHintMatcher;
    for hint in config
        .logical_disks
        .iter()
        .flat_map(|logical_disk| logical_disk.hints())
    {
        matcher
            .check(hint)
            .map_err(|e| RaidplanError::new(InvalidInputError::from(e)))?;
    }

    Ok(())
}

pub fn validate_raid_config_file(path: impl AsRef<Path>) -> Result<(), RaidplanError> {
    let config = load_raid_config(path)?;
    validate_raid_config(&config)?;

    info!("RAID configuration is valid");
    if let Ok(rendered) = serde_yaml::to_string(&config) {
        debug!("Parsed contents:\n{rendered}");
    }
    Ok(())
}
