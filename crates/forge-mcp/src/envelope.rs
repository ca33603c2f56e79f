//! The uniform tool-response envelope (spec.md §4.4, §7).
//!
//! Every tool handler returns `{success, message?, data?, error?, metadata}`
//! regardless of which operation ran, so a client can dispatch on `success`
//! without knowing the tool's specific payload shape.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// The closed `code` taxonomy spec.md §7 assigns to envelope errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    ValidationError,
    ResourceNotFound,
    ConflictError,
    DatabaseError,
    OperationFailed,
    InternalError,
}

impl ErrorCode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ConflictError => "CONFLICT_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub timestamp: chrono::DateTime<Utc>,
    pub version: &'static str,
}

/// The response envelope every tool handler serializes as its structured
/// content result (spec.md §4.4 GLOSSARY: "Envelope").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    pub metadata: EnvelopeMeta,
}

impl Envelope {
    fn meta() -> EnvelopeMeta {
        EnvelopeMeta {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            metadata: Self::meta(),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
            metadata: Self::meta(),
        }
    }

    pub fn err(code: ErrorCode, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(EnvelopeError {
                code: code.as_str(),
                message: message.into(),
                details,
            }),
            metadata: Self::meta(),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"envelope serialization failed"}}"#
                .to_string()
        })
    }
}
