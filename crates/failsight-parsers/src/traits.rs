use crate::Result;
use failsight_types::ParsedReport;
use std::path::Path;

/// Report format identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// JUnit-style XML (`testsuites`/`testsuite`/`testcase`)
    Junit,
    /// Vendor certification XML dialect (`test`/`run`/`summary`)
    Certification,
    /// HTML report, no fixed schema
    Html,
    /// Per-component validation-report JSON
    Component,
}

impl ReportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Junit => "junit",
            ReportFormat::Certification => "certification",
            ReportFormat::Html => "html",
            ReportFormat::Component => "component",
        }
    }
}

/// Probe result with confidence score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeResult {
    /// Parser can handle this file with given confidence (0.0 - 1.0)
    Confidence(f32),
    /// Parser cannot handle this file
    NoMatch,
}

impl ProbeResult {
    pub fn match_high() -> Self {
        ProbeResult::Confidence(1.0)
    }

    pub fn match_medium() -> Self {
        ProbeResult::Confidence(0.5)
    }

    pub fn match_low() -> Self {
        ProbeResult::Confidence(0.3)
    }

    pub fn is_match(&self) -> bool {
        matches!(self, ProbeResult::Confidence(c) if *c > 0.0)
    }

    pub fn confidence(&self) -> f32 {
        match self {
            ProbeResult::Confidence(c) => *c,
            ProbeResult::NoMatch => 0.0,
        }
    }
}

/// Report artifact normalization
///
/// Responsibilities:
/// - Identify whether an artifact belongs to this format
/// - Parse one artifact into the canonical [`ParsedReport`] model
///
/// Parsers are stateless: each `parse` call is pure given its input path.
/// Missing optional fields default to zero/empty; only an unusable document
/// structure is an error.
pub trait ReportParser: Send + Sync {
    /// Format this parser handles
    fn format(&self) -> ReportFormat;

    /// Check if a file looks like this parser's format
    fn probe(&self, path: &Path) -> ProbeResult;

    /// Parse the artifact into the canonical failure model
    fn parse(&self, path: &Path) -> Result<ParsedReport>;
}
