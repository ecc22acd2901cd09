use std::{io::Write, path::Path};

use anyhow::Context;
use log::info;
use serde::Serialize;

use osutils::files;
use raidplan_api::{
    error::{InternalError, RaidplanError, RaidplanResultExt, ReportError},
    inventory::BlockDevice,
};

use crate::{hints::DeviceHintMatcher, inventory, raid, validation};

/// Resolves the RAID configuration at `config` against the given inventory
/// file, or against the block devices of the host when there is none.
pub fn resolve(
    config: &Path,
    inventory_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), RaidplanError> {
    let raid_config = validation::load_raid_config(config)?;
    validation::validate_raid_config(&raid_config)
        .message("RAID configuration is invalid")?;

    let devices = load_devices(inventory_path)?;
    let resolution =
        raid::resolve_block_devices(&devices, &raid_config.logical_disks, &DeviceHintMatcher)?;

    info!(
        "Resolved {} logical disks over {} block devices",
        resolution.logical_disks.len(),
        resolution.block_devices.len()
    );
    write_output(&resolution, output).message("Failed to write RAID resolution")
}

/// Reports the block devices of the host.
pub fn list_inventory(output: Option<&Path>) -> Result<(), RaidplanError> {
    let devices = inventory::collect()?;
    write_output(&devices, output).message("Failed to write block device inventory")
}

fn load_devices(inventory_path: Option<&Path>) -> Result<Vec<BlockDevice>, RaidplanError> {
    match inventory_path {
        Some(path) => inventory::load(path),
        None => inventory::collect().message("Failed to collect block devices of the host"),
    }
}

/// Writes `value` as YAML to `output`, or to stdout when no path is given.
fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), RaidplanError> {
    let rendered = serde_yaml::to_string(value).structured(InternalError::SerializeOutput)?;

    match output {
        Some(path) => files::write_file(path, 0o644, rendered.as_bytes()).structured(
            InternalError::WriteOutput {
                path: path.display().to_string(),
            },
        ),
        None => std::io::stdout()
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")
            .structured(InternalError::WriteOutput {
                path: "-".into(),
            }),
    }
}
