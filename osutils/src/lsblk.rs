use std::process::Command;

use anyhow::{Context, Error};
use log::warn;
use serde::{Deserialize, Deserializer};

use raidplan_api::inventory::BlockDevice;

use crate::exe::RunAndCheck;

/// Columns requested from lsblk, matching the fields of [`LsBlkDevice`].
const LSBLK_COLUMNS: &str = "NAME,MODEL,SIZE,ROTA,SERIAL,WWN,VENDOR,HCTL,TRAN,TYPE";

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct LsBlkOutput {
    pub blockdevices: Vec<LsBlkDevice>,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockDeviceType {
    Disk,
    Part,
    Loop,
    Rom,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct LsBlkDevice {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(deserialize_with = "deserialize_size")]
    pub size: u64,
    #[serde(default, rename = "rota", deserialize_with = "deserialize_flag")]
    pub rotational: bool,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub wwn: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub hctl: Option<String>,
    #[serde(default)]
    pub tran: Option<String>,
    #[serde(rename = "type", default)]
    pub blkdev_type: BlockDeviceType,
}

impl LsBlkDevice {
    /// Converts the lsblk entry into an inventory block device. lsblk pads some
    /// columns with spaces, those are trimmed and blank values are dropped.
    pub fn to_block_device(&self) -> BlockDevice {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        BlockDevice {
            name: self.name.clone(),
            model: clean(&self.model),
            size: self.size,
            rotational: self.rotational,
            wwn: clean(&self.wwn),
            serial: clean(&self.serial),
            vendor: clean(&self.vendor),
            hctl: clean(&self.hctl),
            tran: clean(&self.tran),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    String(String),
}

// Older util-linux releases report numeric columns as strings.
fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid size '{s}': {e}"))),
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(false),
        Some(BoolOrString::Bool(b)) => Ok(b),
        Some(BoolOrString::String(s)) => match s.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag '{other}'"))),
        },
    }
}

/// Lists the whole disks of the host, in the order reported by lsblk.
pub fn list_disks() -> Result<Vec<LsBlkDevice>, Error> {
    let result = Command::new("lsblk")
        .arg("--json")
        .arg("--bytes")
        .arg("--paths")
        .arg("--nodeps")
        .arg("--output")
        .arg(LSBLK_COLUMNS)
        .output_and_check()
        .context("Failed to execute lsblk")?;

    let parsed = parse_lsblk_output(result.as_str());
    if parsed.is_err() {
        warn!("lsblk output: {}", result);
    }

    Ok(parsed?
        .into_iter()
        .filter(|device| device.blkdev_type == BlockDeviceType::Disk)
        .collect())
}

fn parse_lsblk_output(output: &str) -> Result<Vec<LsBlkDevice>, Error> {
    let parsed: LsBlkOutput =
        serde_json::from_str(output).context("Failed to parse lsblk output")?;

    Ok(parsed.blockdevices)
}
