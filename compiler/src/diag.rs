// diag.rs — Unified diagnostics model
//
// Shared diagnostic types used across all compiler passes, plus the sink
// trait through which a compile reports them to its caller.
//
// Preconditions: none (types only).
// Postconditions: none.
// Failure modes: none.
// Side effects: `TracingSink` forwards diagnostics to `tracing`.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0100`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// No output node in the authored tree.
    pub const E0001: DiagCode = DiagCode("E0001");
    /// Unsupported operator, blend mode, group, or socket layout.
    pub const E0100: DiagCode = DiagCode("E0100");
    /// Normal-map sampler without a material node.
    pub const E0101: DiagCode = DiagCode("E0101");
    /// Node requires a material or texture binding and has none.
    pub const E0200: DiagCode = DiagCode("E0200");
    /// Link references a node absent from the built graph.
    pub const E0300: DiagCode = DiagCode("E0300");
    /// Internal invariant violated (cycle or dangling edge at compose time).
    pub const E0900: DiagCode = DiagCode("E0900");

    /// Selector node without an edge on its second socket.
    pub const W0100: DiagCode = DiagCode("W0100");

    /// Graph compiled and cached.
    pub const I0001: DiagCode = DiagCode("I0001");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Info,
    Warning,
    Error,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A compiler diagnostic emitted by any pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Authored node name the diagnostic refers to, if any.
    pub node: Option<String>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, node, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            node: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Info, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the authored node name.
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Info => "info",
            DiagLevel::Warning => "warning",
            DiagLevel::Error => "error",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(node) = &self.node {
            write!(f, " (node '{}')", node)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Sinks ────────────────────────────────────────────────────────────────

/// Receiver for diagnostics produced by a compile.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic);
}

/// Collecting sink.
impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

/// Forwards diagnostics to `tracing` at the matching severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.level {
            DiagLevel::Info => tracing::info!("{diagnostic}"),
            DiagLevel::Warning => tracing::warn!("{diagnostic}"),
            DiagLevel::Error => tracing::error!("{diagnostic}"),
        }
    }
}

pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.level == DiagLevel::Error)
}
