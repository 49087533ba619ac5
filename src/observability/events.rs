//! Observable events
//!
//! Every log line docguard writes names one of these events. Events are
//! explicit and typed; the string form is the `event` field of the line.

use std::fmt;

use super::logger::Severity;

/// Observable events in docguard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema lifecycle
    /// Schema built from its declaration and bases
    SchemaComposed,
    /// Schema declaration refused (inconsistent indexes)
    SchemaDefinitionRejected,
    /// Concrete schema added to a registry
    SchemaRegistered,
    /// A registry already held a schema under the same name
    SchemaNameDuplicate,
    /// Abstract schema offered to a registry and skipped
    SchemaAbstractSkipped,

    // Configuration
    /// Validator configuration loaded
    ConfigLoaded,

    // Validation
    /// Document failed validation before a write
    DocumentRejected,
    /// Update spec failed validation before a write
    UpdateRejected,

    // Sharding
    /// Targeted operation missed shard key fields
    GlobalQueryRejected,
    /// Operation allowed to run without the full shard key
    GlobalQueryAllowed,

    // Store
    /// Declared index sent to the store
    IndexEnsured,
    /// find_and_modify matched no document
    ModifyFailed,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaComposed => "SCHEMA_COMPOSED",
            Event::SchemaDefinitionRejected => "SCHEMA_DEFINITION_REJECTED",
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::SchemaNameDuplicate => "SCHEMA_NAME_DUPLICATE",
            Event::SchemaAbstractSkipped => "SCHEMA_ABSTRACT_SKIPPED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DocumentRejected => "DOCUMENT_REJECTED",
            Event::UpdateRejected => "UPDATE_REJECTED",
            Event::GlobalQueryRejected => "GLOBAL_QUERY_REJECTED",
            Event::GlobalQueryAllowed => "GLOBAL_QUERY_ALLOWED",
            Event::IndexEnsured => "INDEX_ENSURED",
            Event::ModifyFailed => "MODIFY_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaDefinitionRejected => Severity::Error,
            Event::SchemaNameDuplicate
            | Event::DocumentRejected
            | Event::UpdateRejected
            | Event::GlobalQueryRejected
            | Event::ModifyFailed => Severity::Warn,
            Event::SchemaComposed | Event::SchemaAbstractSkipped | Event::IndexEnsured => {
                Severity::Trace
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
