//! Schema error types
//!
//! Error codes:
//! - DG_SCHEMA_DEFINITION (FATAL)
//! - DG_VALIDATION_FAILED (REJECT)
//! - DG_GLOBAL_QUERY (REJECT)
//! - DG_CONFIG_INVALID (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// The schema or configuration is unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Index, shard key or uniqueness declarations are inconsistent
    DgSchemaDefinition,
    /// A document or update does not fit its schema
    DgValidationFailed,
    /// A targeted operation is missing shard key fields
    DgGlobalQuery,
    /// Validator configuration is unreadable or inconsistent
    DgConfigInvalid,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::DgSchemaDefinition => "DG_SCHEMA_DEFINITION",
            SchemaErrorCode::DgValidationFailed => "DG_VALIDATION_FAILED",
            SchemaErrorCode::DgGlobalQuery => "DG_GLOBAL_QUERY",
            SchemaErrorCode::DgConfigInvalid => "DG_CONFIG_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::DgSchemaDefinition | SchemaErrorCode::DgConfigInvalid => {
                Severity::Fatal
            }
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
///
/// `Display` prints the message verbatim; tooling matches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Schema name if applicable
    schema_name: Option<String>,
    /// Dotted field path if applicable
    path: Option<String>,
}

impl SchemaError {
    /// Create a schema definition error
    pub fn definition(schema_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DgSchemaDefinition,
            message: message.into(),
            schema_name: Some(schema_name.into()),
            path: None,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DgValidationFailed,
            message: message.into(),
            schema_name: None,
            path: None,
        }
    }

    /// Create a validation error located at a dotted path
    pub fn validation_at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DgValidationFailed,
            message: message.into(),
            schema_name: None,
            path: Some(path.into()),
        }
    }

    /// Create a global query error naming the missing shard key fields
    pub fn global_query(missing: &[&str]) -> Self {
        Self {
            code: SchemaErrorCode::DgGlobalQuery,
            message: format!(
                "Some or all of the shard key was not specified. Missing fields were {}.",
                missing.join(", ")
            ),
            schema_name: None,
            path: None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DgConfigInvalid,
            message: message.into(),
            schema_name: None,
            path: None,
        }
    }

    /// Attach the schema name the error was raised for
    pub fn for_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema name if applicable
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Returns the dotted field path if applicable
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_validation(&self) -> bool {
        self.code == SchemaErrorCode::DgValidationFailed
    }

    pub fn is_global_query(&self) -> bool {
        self.code == SchemaErrorCode::DgGlobalQuery
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
