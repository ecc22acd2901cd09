use std::{
    collections::{BTreeMap, HashSet},
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::constants::{LOGICAL_DISK_SIZE_MAX, SOFTWARE_RAID_CONTROLLER};

/// Target RAID configuration of a host.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RaidConfiguration {
    /// Logical disks to build, in order.
    pub logical_disks: Vec<LogicalDisk>,
}

/// A requested RAID logical disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogicalDisk {
    /// Size of the logical disk in GiB, or `MAX` to use all the available space.
    pub size_gb: LogicalDiskSize,

    pub raid_level: RaidLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_root_volume: Option<bool>,

    /// Controller that will host the logical disk, `software` for mdadm arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// One hint per physical disk of the logical disk. When missing or empty,
    /// the logical disk spans all the physical disks of the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_disks: Option<Vec<PhysicalDiskHint>>,

    /// Any other property of the logical disk, kept as is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl LogicalDisk {
    pub fn new(size_gb: LogicalDiskSize, raid_level: RaidLevel) -> Self {
        Self {
            size_gb,
            raid_level,
            volume_name: None,
            is_root_volume: None,
            controller: None,
            physical_disks: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_physical_disks(self, physical_disks: Vec<PhysicalDiskHint>) -> Self {
        Self {
            physical_disks: Some(physical_disks),
            ..self
        }
    }

    /// Hints of the physical disks, empty when the logical disk spans all disks.
    pub fn hints(&self) -> &[PhysicalDiskHint] {
        self.physical_disks.as_deref().unwrap_or_default()
    }

    /// Returns true when the logical disk is built out of every physical disk of the host.
    pub fn spans_all_disks(&self) -> bool {
        self.hints().is_empty()
    }

    pub fn is_software(&self) -> bool {
        self.controller.as_deref() == Some(SOFTWARE_RAID_CONTROLLER)
    }
}

/// Logical disk size.
/// Serialize and Deserialize traits are implemented manually below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalDiskSize {
    /// # Max
    ///
    /// Use all the space available on the physical disks.
    ///
    /// String equivalent is defined in constants::LOGICAL_DISK_SIZE_MAX
    Max,

    /// # Fixed
    ///
    /// Fixed size in GiB.
    Gib(u64),
}

impl FromStr for LogicalDiskSize {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.eq_ignore_ascii_case(LOGICAL_DISK_SIZE_MAX) {
            LogicalDiskSize::Max
        } else {
            LogicalDiskSize::Gib(s.parse()?)
        })
    }
}

impl Display for LogicalDiskSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogicalDiskSize::Max => write!(f, "{}", LOGICAL_DISK_SIZE_MAX),
            LogicalDiskSize::Gib(n) => write!(f, "{}", n),
        }
    }
}

impl<'de> Deserialize<'de> for LogicalDiskSize {
    fn deserialize<D>(deserializer: D) -> Result<LogicalDiskSize, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Size may be provided as a string ("MAX", "100") or as a number (100).
        let value = serde_yaml::Value::deserialize(deserializer)?;

        match value {
            serde_yaml::Value::String(s) => LogicalDiskSize::from_str(s.as_str())
                .map_err(|e| serde::de::Error::custom(format!("invalid logical disk size: {e}"))),
            serde_yaml::Value::Number(n) => {
                let n = n.as_u64().ok_or_else(|| {
                    serde::de::Error::custom("invalid logical disk size, expected unsigned integer")
                })?;
                Ok(LogicalDiskSize::Gib(n))
            }
            _ => Err(serde::de::Error::custom("invalid logical disk size")),
        }
    }
}

impl Serialize for LogicalDiskSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            LogicalDiskSize::Max => serializer.serialize_str(LOGICAL_DISK_SIZE_MAX),
            LogicalDiskSize::Gib(n) => serializer.serialize_u64(*n),
        }
    }
}

/// RAID level of a logical disk.
/// Serialize and Deserialize traits are implemented manually below.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, StrumDisplay, EnumString)]
pub enum RaidLevel {
    /// # Striping
    #[strum(serialize = "0")]
    Raid0,

    /// # Mirroring
    #[strum(serialize = "1")]
    Raid1,

    /// # Striping with parity
    #[strum(serialize = "5")]
    Raid5,

    /// # Striping with double parity
    #[strum(serialize = "6")]
    Raid6,

    /// # Stripe of mirrors
    #[strum(serialize = "1+0")]
    Raid10,

    /// # Stripe of RAID 5 arrays
    #[strum(serialize = "5+0")]
    Raid50,

    /// # Stripe of RAID 6 arrays
    #[strum(serialize = "6+0")]
    Raid60,
}

impl<'de> Deserialize<'de> for RaidLevel {
    fn deserialize<D>(deserializer: D) -> Result<RaidLevel, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Single digit levels are frequently written as numbers.
        let value = serde_yaml::Value::deserialize(deserializer)?;

        let level = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            _ => return Err(serde::de::Error::custom("invalid RAID level")),
        };

        RaidLevel::from_str(level.trim())
            .map_err(|_| serde::de::Error::custom(format!("unsupported RAID level '{level}'")))
    }
}

impl Serialize for RaidLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Value of a single physical disk hint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum HintValue {
    Boolean(bool),
    Integer(u64),
    String(String),
}

impl Display for HintValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            HintValue::Boolean(b) => write!(f, "{b}"),
            HintValue::Integer(n) => write!(f, "{n}"),
            HintValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for HintValue {
    fn from(s: &str) -> Self {
        HintValue::String(s.into())
    }
}

impl From<u64> for HintValue {
    fn from(n: u64) -> Self {
        HintValue::Integer(n)
    }
}

impl From<bool> for HintValue {
    fn from(b: bool) -> Self {
        HintValue::Boolean(b)
    }
}

/// Selects the physical disk backing one slot of a logical disk, e.g.
/// `{serial: S1}` or `{size: ">= 100", rotational: false}`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct PhysicalDiskHint(pub BTreeMap<String, HintValue>);

impl PhysicalDiskHint {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HintValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PhysicalDiskHint
where
    K: Into<String>,
    V: Into<HintValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl Display for PhysicalDiskHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Identifies errors detected during static validation of the RAID configuration.
#[derive(thiserror::Error, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidRaidConfigurationError {
    #[error("RAID configuration must define at least one logical disk")]
    NoLogicalDisks,

    #[error("Volume name '{volume_name}' is used by more than one logical disk")]
    DuplicateVolumeName { volume_name: String },

    #[error("Physical disk #{slot} of logical disk #{logical_disk} has no hints")]
    EmptyPhysicalDiskHint { logical_disk: usize, slot: usize },

    #[error("More than one logical disk is marked as the root volume")]
    MultipleRootVolumes,
}

impl RaidConfiguration {
    pub fn validate(&self) -> Result<(), InvalidRaidConfigurationError> {
        if self.logical_disks.is_empty() {
            return Err(InvalidRaidConfigurationError::NoLogicalDisks);
        }

        let mut volume_names = HashSet::new();
        for (index, logical_disk) in self.logical_disks.iter().enumerate() {
            if let Some(volume_name) = &logical_disk.volume_name {
                if !volume_names.insert(volume_name.as_str()) {
                    return Err(InvalidRaidConfigurationError::DuplicateVolumeName {
                        volume_name: volume_name.clone(),
                    });
                }
            }

            if let Some(slot) = logical_disk.hints().iter().position(|h| h.is_empty()) {
                return Err(InvalidRaidConfigurationError::EmptyPhysicalDiskHint {
                    logical_disk: index,
                    slot,
                });
            }
        }

        if self
            .logical_disks
            .iter()
            .filter(|ld| ld.is_root_volume == Some(true))
            .count()
            > 1
        {
            return Err(InvalidRaidConfigurationError::MultipleRootVolumes);
        }

        Ok(())
    }
}
