use crate::response::Status;
use serde::{de, Deserialize, Serialize};
use serde_json;
use std::error;
use std::fmt;

/// Classifies every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedMode,
    InvalidMetric,
    InvalidThreshold,
    InvalidShingleLength,
    InvalidCriterion,
    /// Unreadable configuration source.
    InvalidConfig,
    InvalidRecordIndex,
    /// A single record could not be processed; it is skipped, not fatal.
    InvalidRecord,
    MissingResource,
    /// Broken internal invariant.
    Logic,
}

impl ErrorKind {
    fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedMode => "unsupported_mode",
            ErrorKind::InvalidMetric => "invalid_metric",
            ErrorKind::InvalidThreshold => "invalid_threshold",
            ErrorKind::InvalidShingleLength => "invalid_shingle_length",
            ErrorKind::InvalidCriterion => "invalid_criterion",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::InvalidRecordIndex => "invalid_record_index",
            ErrorKind::InvalidRecord => "invalid_record",
            ErrorKind::MissingResource => "missing_resource",
            ErrorKind::Logic => "logic",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ErrorKind::InvalidRecordIndex | ErrorKind::Logic => Status::InternalError,
            _ => Status::InvalidInput,
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

struct ErrorKindVisitor;

impl<'de> de::Visitor<'de> for ErrorKindVisitor {
    type Value = ErrorKind;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("ErrorKind")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match v {
            "unsupported_mode" => Ok(ErrorKind::UnsupportedMode),
            "invalid_metric" => Ok(ErrorKind::InvalidMetric),
            "invalid_threshold" => Ok(ErrorKind::InvalidThreshold),
            "invalid_shingle_length" => Ok(ErrorKind::InvalidShingleLength),
            "invalid_criterion" => Ok(ErrorKind::InvalidCriterion),
            "invalid_config" => Ok(ErrorKind::InvalidConfig),
            "invalid_record_index" => Ok(ErrorKind::InvalidRecordIndex),
            "invalid_record" => Ok(ErrorKind::InvalidRecord),
            "missing_resource" => Ok(ErrorKind::MissingResource),
            "logic" => Ok(ErrorKind::Logic),
            value => Err(de::Error::custom(value.to_string())),
        }
    }
}

impl<'de> de::Deserialize<'de> for ErrorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(ErrorKindVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DedupError {
    pub msg: String,
    pub kind: ErrorKind,
}

impl fmt::Display for DedupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let json = serde_json::to_string_pretty(&self).map_err(|_| fmt::Error)?;
        write!(f, "{}", json)
    }
}

impl error::Error for DedupError {}

impl DedupError {
    pub fn new<T: fmt::Display>(kind: ErrorKind, msg: T) -> DedupError {
        DedupError {
            msg: msg.to_string(),
            kind,
        }
    }

    pub fn unsupported_mode<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::UnsupportedMode, msg)
    }

    pub fn invalid_metric<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidMetric, msg)
    }

    pub fn invalid_threshold<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidThreshold, msg)
    }

    pub fn invalid_shingle_length<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidShingleLength, msg)
    }

    pub fn invalid_criterion<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidCriterion, msg)
    }

    pub fn invalid_config<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidConfig, msg)
    }

    pub fn invalid_record_index<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidRecordIndex, msg)
    }

    pub fn invalid_record<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::InvalidRecord, msg)
    }

    pub fn missing_resource<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::MissingResource, msg)
    }

    pub fn logic<T: fmt::Display>(msg: T) -> DedupError {
        Self::new(ErrorKind::Logic, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_pretty_json() {
        let err = DedupError::invalid_metric("Expected jaccard or cosine, got dice");
        let rendered = err.to_string();
        let parsed: DedupError = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.kind, ErrorKind::InvalidMetric);
        assert_eq!(parsed.msg, "Expected jaccard or cosine, got dice");
        assert!(rendered.contains("\"invalid_metric\""));
    }

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(ErrorKind::Logic.status(), Status::InternalError);
        assert_eq!(ErrorKind::InvalidRecordIndex.status(), Status::InternalError);
        assert_eq!(ErrorKind::MissingResource.status(), Status::InvalidInput);
        assert_eq!(ErrorKind::UnsupportedMode.status(), Status::InvalidInput);
        assert_eq!(ErrorKind::InvalidConfig.status(), Status::InvalidInput);
    }
}
