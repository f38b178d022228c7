use serde::{de, Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::error::DedupError;

/// Outcome of a deduplication run as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// The run completed but some records were skipped.
    Partial,
    InvalidInput,
    InternalError,
}

impl Status {
    fn code(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Partial => "partial",
            Status::InvalidInput => "invalid_input",
            Status::InternalError => "internal_error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Ok | Status::Partial => 0,
            Status::InvalidInput => 2,
            Status::InternalError => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

struct StatusCodeVisitor;

impl<'de> de::Visitor<'de> for StatusCodeVisitor {
    type Value = Status;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("Status")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match v {
            "ok" => Ok(Status::Ok),
            "partial" => Ok(Status::Partial),
            "invalid_input" => Ok(Status::InvalidInput),
            "internal_error" => Ok(Status::InternalError),
            value => Err(de::Error::custom(value.to_string())),
        }
    }
}

impl<'de> de::Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(StatusCodeVisitor)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResponsePayload {
    pub status: Status,
    pub body: Value,
}

///
/// Wraps the outcome of a run into the payload printed by the batch runner.
///
/// A successful body carrying a non-empty `skipped` array is reported as `partial`.
///
pub fn make_response_payload(result: Result<Value, DedupError>) -> Result<Value, serde_json::Error> {
    let response_payload = match result {
        Err(err) => ResponsePayload {
            status: err.kind.status(),
            body: json!({ "kind": err.kind, "message": err.msg }),
        },
        Ok(body) => {
            let partial = body
                .get("skipped")
                .and_then(Value::as_array)
                .map_or(false, |skipped| !skipped.is_empty());
            ResponsePayload {
                status: if partial { Status::Partial } else { Status::Ok },
                body,
            }
        }
    };
    serde_json::to_value(response_payload)
}
