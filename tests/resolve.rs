//! Integration tests resolving RAID configurations through the public API.

use std::io::Write;

use tempfile::NamedTempFile;

use raidplan::{inventory, resolve_block_devices, validation, DeviceHintMatcher, HintMatcher};
use raidplan_api::{
    config::{PhysicalDiskHint, RaidConfiguration},
    error::{ErrorKind, RaidResolutionError, RaidplanError},
    inventory::{BlockDevice, DeviceRecord},
};

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn three_disks() -> Vec<BlockDevice> {
    ["sda", "sdb", "sdc"]
        .iter()
        .map(|name| BlockDevice::new(*name, 1 << 40))
        .collect()
}

fn config(yaml: &str) -> RaidConfiguration {
    serde_yaml::from_str(yaml).expect("Failed to parse RAID configuration")
}

/// Matcher that always answers with the same candidates.
struct FixedMatcher(Vec<&'static str>);

impl HintMatcher for FixedMatcher {
    fn find_devices(
        &self,
        _devices: &[DeviceRecord],
        _hint: &PhysicalDiskHint,
    ) -> Result<Vec<String>, RaidplanError> {
        Ok(self.0.iter().map(|name| name.to_string()).collect())
    }
}

/// A pinned logical disk followed by one spanning every disk.
#[test]
fn test_pinned_then_span_all() {
    let raid = config(indoc::indoc! {r#"
        logical_disks:
          - size_gb: 100
            raid_level: 1
            physical_disks:
              - serial: S2
          - size_gb: MAX
            raid_level: 0
    "#});

    let resolution =
        resolve_block_devices(&three_disks(), &raid.logical_disks, &FixedMatcher(vec!["sdb"]))
            .unwrap();

    assert_eq!(resolution.logical_disks[0].block_devices, vec!["sdb"]);
    assert_eq!(
        resolution.logical_disks[1].block_devices,
        vec!["sda", "sdb", "sdc"]
    );
    assert_eq!(resolution.block_devices, vec!["sdb", "sda", "sdc"]);
    assert_eq!(resolution.logical_disks[0].logical_disk, raid.logical_disks[0]);
}

/// Two slots whose hints only ever match the same device.
#[test]
fn test_exhausted_candidates() {
    let raid = config(indoc::indoc! {r#"
        logical_disks:
          - size_gb: 100
            raid_level: 1
            physical_disks:
              - serial: S1
              - serial: S1
    "#});

    let error =
        resolve_block_devices(&three_disks(), &raid.logical_disks, &FixedMatcher(vec!["sda"]))
            .unwrap_err();

    match error.kind() {
        ErrorKind::RaidResolution(RaidResolutionError::NoCandidatesLeft {
            candidates,
            matched,
            ..
        }) => {
            assert_eq!(candidates, &vec!["sda".to_string()]);
            assert_eq!(matched, &vec!["sda".to_string()]);
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

/// Configuration and inventory files resolved with the default matcher.
#[test]
fn test_resolve_files() {
    let inventory_file = write_temp(indoc::indoc! {r#"
        - name: /dev/nvme0n1
          size: 512110190592
          serial: S27FNYAH407000
          tran: nvme
        - name: /dev/sda
          size: 1000204886016
          serial: WD-1
          rotational: true
        - name: /dev/sdb
          size: 1000204886016
          serial: WD-2
          rotational: true
    "#});
    let config_file = write_temp(indoc::indoc! {r#"
        logical_disks:
          - size_gb: 100
            raid_level: 1
            volume_name: root
            is_root_volume: true
            physical_disks:
              - rotational: true
              - rotational: true
          - size_gb: MAX
            raid_level: 0
            physical_disks:
              - tran: nvme
    "#});

    let devices = inventory::load(inventory_file.path()).unwrap();
    let raid = validation::load_raid_config(config_file.path()).unwrap();
    validation::validate_raid_config(&raid).unwrap();

    let resolution =
        resolve_block_devices(&devices, &raid.logical_disks, &DeviceHintMatcher).unwrap();
    assert_eq!(
        resolution.logical_disks[0].block_devices,
        vec!["/dev/sda", "/dev/sdb"]
    );
    assert_eq!(
        resolution.logical_disks[1].block_devices,
        vec!["/dev/nvme0n1"]
    );
    assert_eq!(
        resolution.block_devices,
        vec!["/dev/sda", "/dev/sdb", "/dev/nvme0n1"]
    );
}
