use const_format::formatcp;

// Configuration constants

/// Size of a logical disk that takes all the space left on its physical disks.
pub const LOGICAL_DISK_SIZE_MAX: &str = "MAX";

/// Controller name of logical disks backed by software RAID.
pub const SOFTWARE_RAID_CONTROLLER: &str = "software";

/// Default location of the RAID configuration document.
pub const RAID_CONFIG_PATH_DEFAULT: &str = "/etc/raidplan/raid-config.yaml";

/// Number of bytes in a GiB. Size hints and logical disk sizes are expressed in GiB.
pub const GIB: u64 = 1 << 30;

// Device path constants

/// Directory holding device nodes.
pub const DEV_PATH: &str = "/dev";

/// Directory holding the bus path symlinks of block devices.
pub const DEV_DISK_BY_PATH: &str = formatcp!("{DEV_PATH}/disk/by-path");
