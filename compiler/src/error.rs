// error.rs — Compile failure taxonomy
//
// `CompileError` covers bad authored data and aborts a compile; it is cached
// per graph identity and replayed on later requests, hence `Clone`.
// `InvariantViolation` is raised only by the topological compiler and signals
// a defect in an upstream pass rather than bad input.

use thiserror::Error;

use crate::diag::{codes, DiagCode, Diagnostic};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("no output node in node material")]
    MissingOutput,

    #[error("{message}")]
    Configuration {
        node: Option<String>,
        message: String,
    },

    #[error("{what} binding missing in node '{node}'")]
    MissingBinding { node: String, what: &'static str },

    #[error("link references unknown node '{node}'")]
    Structural { node: String },
}

impl CompileError {
    pub fn configuration(node: &str, message: impl Into<String>) -> Self {
        CompileError::Configuration {
            node: Some(node.to_string()),
            message: message.into(),
        }
    }

    pub fn code(&self) -> DiagCode {
        match self {
            CompileError::MissingOutput => codes::E0001,
            CompileError::Configuration { node: None, .. } => codes::E0101,
            CompileError::Configuration { .. } => codes::E0100,
            CompileError::MissingBinding { .. } => codes::E0200,
            CompileError::Structural { .. } => codes::E0300,
        }
    }

    /// The error-level diagnostic reported for this failure.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string()).with_code(self.code());
        match self {
            CompileError::MissingOutput => {
                diag.with_hint("add an OUTPUT node and link it to the material result")
            }
            CompileError::Configuration {
                node: Some(node), ..
            } => diag.with_node(node.clone()),
            CompileError::Configuration { node: None, .. } => diag,
            CompileError::MissingBinding { node, .. } => diag.with_node(node.clone()),
            CompileError::Structural { node } => diag.with_node(node.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("cycle in compiled graph: {remaining} node(s) could not be ordered")]
    Cycle { remaining: usize },

    #[error("edge {edge} addresses a socket that does not exist")]
    DanglingEdge { edge: String },
}

impl InvariantViolation {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(format!("internal error: {self}")).with_code(codes::E0900)
    }
}
