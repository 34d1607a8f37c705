// used to print out locations
use std::fmt;

use thiserror::Error;

// pest errors come typed by the grammar's rules
use crate::directive::Rule;

#[derive(Error, Debug)]
pub enum GsmParamError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    #[error("Unknown parameter type: {0}")]
    UnknownParameterType(String),
    #[error("Cannot convert {text:?} to {expected}")]
    TypeCoercion { text: String, expected: &'static str },
    #[error("Ambiguous directive: {0}")]
    AmbiguousDirective(String),
    #[error("Missing referenced parameter: {0}")]
    MissingReferencedParameter(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directive at {location}: {source}")]
    Directive {
        location: Location,
        source: Box<GsmParamError>,
    },
}

pub type Result<T> = std::result::Result<T, GsmParamError>;

impl GsmParamError {
    /// Tags the error with the spreadsheet cell (or directive name) it came from.
    pub fn at(self, location: Location) -> Self {
        match self {
            // keep the innermost location
            tagged @ Self::Directive { .. } => tagged,
            other => Self::Directive {
                location,
                source: Box::new(other),
            },
        }
    }
    /// The error with any location tag peeled off.
    pub fn root(&self) -> &GsmParamError {
        match self {
            Self::Directive { source, .. } => source.root(),
            other => other,
        }
    }
}

// Helper conversions
impl From<roxmltree::Error> for GsmParamError {
    fn from(e: roxmltree::Error) -> Self { Self::Xml(e.to_string()) }
}
impl From<config::ConfigError> for GsmParamError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for GsmParamError {
    fn from(e: serde_json::Error) -> Self { Self::MalformedDocument(format!("dictionary payload: {e}")) }
}
impl From<pest::error::Error<Rule>> for GsmParamError {
    fn from(e: pest::error::Error<Rule>) -> Self { Self::AmbiguousDirective(e.to_string()) }
}

/// Where a directive came from: the spreadsheet cell when known, and always the
/// parameter name it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub row: Option<usize>,
    pub column: Option<usize>,
    pub name: String,
}
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.row, self.column) {
            (Some(row), Some(column)) => write!(f, "row {}, column {} ({})", row, column, self.name),
            (Some(row), None) => write!(f, "row {} ({})", row, self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Non-fatal conditions. They are logged where they arise and also handed back
/// to the caller, processing always continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    ScalarToArray { name: String },
    ArrayToScalar { name: String },
    InferredFallback { name: String },
    IgnoredToken { token: String },
    ChildTargetNotTitle { target: String },
}
impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::ScalarToArray { name } => write!(f, "value -> array change: {}", name),
            Warning::ArrayToScalar { name } => write!(f, "array -> value change: {}", name),
            Warning::InferredFallback { name } => {
                write!(f, "no type rule matched {}, created as String", name)
            }
            Warning::IgnoredToken { token } => write!(f, "ignored directive token {:?}", token),
            Warning::ChildTargetNotTitle { target } => {
                write!(f, "{} is not a Title, nothing was inserted under it", target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn io_failures_keep_their_cause() {
        let error: GsmParamError = Error::new(ErrorKind::NotFound, "part.xml").into();
        assert!(matches!(error, GsmParamError::Io(_)));
        assert_eq!(error.to_string(), "I/O error: part.xml");
    }
}
