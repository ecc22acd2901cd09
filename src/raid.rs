use log::{debug, info};
use serde::Serialize;

use raidplan_api::{
    config::{LogicalDisk, PhysicalDiskHint},
    error::{
        InventoryError, RaidResolutionError, RaidplanError, RaidplanResultExt, ReportError,
    },
    inventory::{BlockDevice, DeviceRecord},
};

use crate::hints::HintMatcher;

/// A logical disk together with the block devices it was assigned.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResolvedLogicalDisk {
    #[serde(flatten)]
    pub logical_disk: LogicalDisk,

    /// One device per physical disk hint, or every device of the inventory
    /// when the logical disk spans all disks.
    pub block_devices: Vec<String>,
}

/// Outcome of assigning block devices to the logical disks of a RAID configuration.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RaidResolution {
    /// Every device used by at least one logical disk, in first-seen order.
    pub block_devices: Vec<String>,

    /// Logical disks in the order they were requested.
    pub logical_disks: Vec<ResolvedLogicalDisk>,
}

/// Assigns block devices to each of the logical disks.
///
/// Logical disks without physical disk hints span every device of the
/// inventory. Otherwise each hint selects the first candidate returned by the
/// matcher that the same logical disk does not already use. Two logical disks
/// may share devices. Neither input is modified.
#[tracing::instrument(skip_all)]
pub fn resolve_block_devices<M: HintMatcher + ?Sized>(
    devices: &[BlockDevice],
    logical_disks: &[LogicalDisk],
    matcher: &M,
) -> Result<RaidResolution, RaidplanError> {
    let records = devices
        .iter()
        .map(|device| {
            device
                .to_record()
                .structured(InventoryError::SerializeBlockDevice {
                    name: device.name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut resolved = Vec::with_capacity(logical_disks.len());
    for (index, logical_disk) in logical_disks.iter().enumerate() {
        let block_devices = if logical_disk.spans_all_disks() {
            devices.iter().map(|device| device.name.clone()).collect()
        } else {
            match_physical_disks(&records, logical_disk.hints(), matcher)
                .message(format!("Failed to find block devices for logical disk #{index}"))?
        };

        debug!("Logical disk #{index} uses block devices {block_devices:?}");
        // A block_devices key passed through from the input is replaced, not duplicated
        let mut logical_disk = logical_disk.clone();
        logical_disk.extra.remove("block_devices");
        resolved.push(ResolvedLogicalDisk {
            logical_disk,
            block_devices,
        });
    }

    let mut block_devices: Vec<String> = Vec::new();
    for name in resolved.iter().flat_map(|disk| disk.block_devices.iter()) {
        if !block_devices.contains(name) {
            block_devices.push(name.clone());
        }
    }

    info!("RAID configuration uses block devices {block_devices:?}");
    Ok(RaidResolution {
        block_devices,
        logical_disks: resolved,
    })
}

/// Picks one device per hint, never the same device twice.
fn match_physical_disks<M: HintMatcher + ?Sized>(
    records: &[DeviceRecord],
    hints: &[PhysicalDiskHint],
    matcher: &M,
) -> Result<Vec<String>, RaidplanError> {
    let mut matched: Vec<String> = Vec::with_capacity(hints.len());
    for hint in hints {
        let candidates = matcher.find_devices(records, hint)?;
        if candidates.is_empty() {
            return Err(RaidplanError::new(RaidResolutionError::NoCandidates {
                hint: hint.clone(),
                devices: records.to_vec(),
            }));
        }

        match candidates.iter().find(|name| !matched.contains(name)) {
            Some(name) => matched.push(name.clone()),
            None => {
                return Err(RaidplanError::new(RaidResolutionError::NoCandidatesLeft {
                    hint: hint.clone(),
                    candidates,
                    matched,
                }))
            }
        }
    }

    Ok(matched)
}
