use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A physical block device visible on the host.
///
/// Only `name` is interpreted when resolving RAID devices. The remaining fields
/// describe the device so that physical disk hints can select it.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BlockDevice {
    /// Path to the device, for instance "/dev/sda". Unique within an inventory.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Size in bytes.
    pub size: u64,

    #[serde(default)]
    pub rotational: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wwn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wwn_with_extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wwn_vendor_extension: Option<String>,

    /// SCSI address in the host:channel:target:lun form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hctl: Option<String>,

    /// Symlink to the device in /dev/disk/by-path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_path: Option<String>,

    /// Transport, e.g. "sata", "nvme" or "usb".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tran: Option<String>,
}

impl BlockDevice {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    /// Produces the record handed over to hint matchers. Fields that are not
    /// known for this device are left out of the record.
    pub fn to_record(&self) -> Result<DeviceRecord, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(DeviceRecord(map)),
            other => Err(serde::ser::Error::custom(format!(
                "block device '{}' serialized to a non-object value: {other}",
                self.name
            ))),
        }
    }
}

/// Serialized form of a [`BlockDevice`], keyed by field name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct DeviceRecord(Map<String, Value>);

impl DeviceRecord {
    /// Returns the device name, if the record has one.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }
}

impl From<Map<String, Value>> for DeviceRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Display for DeviceRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let rendered = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// Renders a list of device records as a JSON-like list, for error messages.
pub fn render_records(records: &[DeviceRecord]) -> String {
    let rendered: Vec<String> = records.iter().map(DeviceRecord::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
