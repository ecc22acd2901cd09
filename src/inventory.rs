use std::{collections::HashSet, path::Path};

use anyhow::Context;
use log::{debug, info};

use osutils::{block_devices, lsblk};
use raidplan_api::{
    error::{InvalidInputError, InventoryError, RaidplanError, ReportError},
    inventory::BlockDevice,
};

/// Collects the whole disks of the host, in the order reported by lsblk.
#[tracing::instrument(skip_all)]
pub fn collect() -> Result<Vec<BlockDevice>, RaidplanError> {
    let disks = lsblk::list_disks()
        .context("Failed to list disks")
        .structured(InventoryError::ListBlockDevices)?;

    let devices: Vec<BlockDevice> = disks
        .iter()
        .map(|disk| {
            let mut device = disk.to_block_device();
            device.by_path = match block_devices::block_device_by_path(&device.name) {
                Ok(path) => path.map(|p| p.to_string_lossy().into_owned()),
                Err(e) => {
                    debug!("No by-path symlink for '{}': {e:?}", device.name);
                    None
                }
            };
            device
        })
        .collect();

    info!("Found {} block devices", devices.len());
    Ok(devices)
}

/// Loads a block device inventory from a YAML or JSON file.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<BlockDevice>, RaidplanError> {
    let path = path.as_ref();
    info!("Loading block device inventory from '{}'", path.display());

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .structured(InvalidInputError::LoadInventory {
            path: path.display().to_string(),
        })?;

    let devices: Vec<BlockDevice> = serde_yaml::from_str(&contents).structured(
        InvalidInputError::ParseInventory {
            path: path.display().to_string(),
        },
    )?;

    check_unique_names(&devices)?;
    debug!("Loaded {} block devices", devices.len());
    Ok(devices)
}

fn check_unique_names(devices: &[BlockDevice]) -> Result<(), RaidplanError> {
    let mut names = HashSet::new();
    for device in devices {
        if !names.insert(device.name.as_str()) {
            return Err(RaidplanError::new(
                InvalidInputError::DuplicateBlockDevice {
                    name: device.name.clone(),
                },
            ));
        }
    }
    Ok(())
}
