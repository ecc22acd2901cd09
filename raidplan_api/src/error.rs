use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use serde::{ser::SerializeStruct, Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::{
    config::{InvalidRaidConfigurationError, PhysicalDiskHint},
    inventory::{render_records, DeviceRecord},
};

/// User provided input was invalid.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidInputError {
    #[error("Failed to load RAID configuration file from '{path}'")]
    LoadRaidConfiguration { path: String },
    #[error("Failed to parse RAID configuration file '{path}'")]
    ParseRaidConfiguration { path: String },
    #[error("Invalid RAID configuration: {0}")]
    InvalidRaidConfiguration(#[from] InvalidRaidConfigurationError),
    #[error("Failed to load block device inventory from '{path}'")]
    LoadInventory { path: String },
    #[error("Failed to parse block device inventory '{path}'")]
    ParseInventory { path: String },
    #[error("Block device '{name}' is listed more than once in the inventory")]
    DuplicateBlockDevice { name: String },
    #[error("Invalid physical disk hint: {0}")]
    InvalidHint(#[from] InvalidHintError),
}

/// A physical disk hint could not be interpreted.
#[derive(Debug, Clone, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidHintError {
    #[error("Unknown hint '{name}'")]
    UnknownHint { name: String },
    #[error("Hint '{name}' has invalid value '{value}'")]
    InvalidValue { name: String, value: String },
    #[error("Operator '{operator}' is not supported by hint '{name}'")]
    UnsupportedOperator { name: String, operator: String },
}

/// The block devices of the host could not be listed.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InventoryError {
    #[error("Failed to list block devices")]
    ListBlockDevices,
    #[error("Failed to serialize block device '{name}'")]
    SerializeBlockDevice { name: String },
}

/// The requested logical disks cannot be built out of the available block devices.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum RaidResolutionError {
    #[error(
        "No candidates for physical disk {hint} from the list {}",
        render_records(.devices)
    )]
    NoCandidates {
        hint: PhysicalDiskHint,
        devices: Vec<DeviceRecord>,
    },
    #[error(
        "No candidates left for physical disk {hint} from the list {candidates:?} after picking {matched:?} for previous volumes"
    )]
    NoCandidatesLeft {
        hint: PhysicalDiskHint,
        candidates: Vec<String>,
        matched: Vec<String>,
    },
}

#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Panicked: {0}")]
    Panic(String),
    #[error("Failed to serialize output")]
    SerializeOutput,
    #[error("Failed to write output to '{path}'")]
    WriteOutput { path: String },
}

/// Each variant of `ErrorKind` corresponds to a different category of error. The categories are
/// intended to be user-meaningful and to tell apart configuration mistakes from host problems.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The provided RAID configuration or inventory was invalid.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// The block devices of the host could not be collected.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// The RAID configuration does not fit the block devices of the host. Operator intervention
    /// is required: retrying with the same inputs fails the same way.
    #[error(transparent)]
    RaidResolution(#[from] RaidResolutionError),

    /// An uncategorized error occurred or a bug was encountered.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct RaidplanErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct RaidplanError(Box<RaidplanErrorInner>);
impl RaidplanError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        RaidplanError(Box::new(RaidplanErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn with_source(kind: impl Into<ErrorKind>, source: anyhow::Error) -> Self {
        RaidplanError(Box::new(RaidplanErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: Some(source),
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn internal(message: &'static str) -> Self {
        Self::new(InternalError::Internal(message))
    }

    pub fn unstructured(self, context: impl Into<Cow<'static, str>>) -> anyhow::Error {
        match self.0.source {
            Some(source) => source.context(self.0.kind).context(context.into()),
            None => anyhow::Error::from(self.0.kind).context(context.into()),
        }
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured RaidplanError.
    fn structured(self, kind: K) -> Result<T, RaidplanError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, RaidplanError> {
        match self {
            Some(t) => Ok(t),
            None => Err(RaidplanError::new(kind)),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, RaidplanError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(RaidplanError::with_source(kind, e.into())),
        }
    }
}

pub trait RaidplanResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, RaidplanError>;

    /// Convert the error into an unstructured error.
    fn unstructured(self, context: impl Into<Cow<'static, str>>) -> Result<T, anyhow::Error>;
}

impl<T> RaidplanResultExt<T> for Result<T, RaidplanError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, RaidplanError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }

    fn unstructured(self, context: impl Into<Cow<'static, str>>) -> Result<T, anyhow::Error> {
        self.map_err(|e| e.unstructured(context))
    }
}

impl Serialize for RaidplanError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("raidplan-error", 5)?;
        state.serialize_field("message", &self.0.kind.to_string())?;
        match self.0.kind {
            ErrorKind::InvalidInput(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Inventory(ref e) => state.serialize_field("error", e)?,
            ErrorKind::RaidResolution(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Internal(ref e) => state.serialize_field("error", e)?,
        }
        state.serialize_field("category", <&str>::from(&self.0.kind))?;
        state.serialize_field(
            "location",
            &format!("{}:{}", self.0.location.file(), self.0.location.line()),
        )?;
        match self.0.source {
            Some(ref e) => state.serialize_field("cause", &Some(format!("{:?}", e)))?,
            None => state.serialize_field("cause", &None::<String>)?,
        }
        state.end()
    }
}

impl Debug for RaidplanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                for (j, line) in context.split('\n').enumerate() {
                    if j == 0 {
                        write!(f, "{: >5}: ", i)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut index = 0;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}
