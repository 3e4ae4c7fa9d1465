//! Error types for activity parsing.
//!
//! Only structural problems with the document are errors. Numeric and
//! derivation anomalies (bad timestamps, missing speed, zero pace) are
//! absorbed where they happen and surface as [`crate::ParseWarning`]s or
//! sentinel values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A mandatory container (TrainingCenterDatabase, Activities, Activity,
    /// Lap or Track) is absent from the document tree.
    #[error("malformed activity document: {0}")]
    MalformedActivity(String),
    /// The document text is not a JSON tree.
    #[error("invalid document tree: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    /// The TCX text is not well-formed XML.
    #[error("invalid TCX XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
