use crate::certification::CertificationXmlParser;
use crate::component::ComponentReportParser;
use crate::html::HtmlReportParser;
use crate::junit::JunitXmlParser;
use crate::traits::{ReportFormat, ReportParser};
use crate::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FormatMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub artifact_hint: &'static str,
}

const FORMATS: &[FormatMetadata] = &[
    FormatMetadata {
        name: "junit",
        description: "JUnit-style XML test results",
        artifact_hint: "tempest_results.xml",
    },
    FormatMetadata {
        name: "certification",
        description: "Vendor certification XML results",
        artifact_hint: "results-*.xml",
    },
    FormatMetadata {
        name: "html",
        description: "HTML test report",
        artifact_hint: "tempest_results.html",
    },
    FormatMetadata {
        name: "component",
        description: "Per-component validation report JSON",
        artifact_hint: "*-validation_report.json",
    },
];

pub fn get_all_formats() -> &'static [FormatMetadata] {
    FORMATS
}

pub fn get_format_names() -> Vec<&'static str> {
    FORMATS.iter().map(|f| f.name).collect()
}

pub fn get_format_metadata(name: &str) -> Option<&'static FormatMetadata> {
    FORMATS.iter().find(|f| f.name == name)
}

/// Create a parser by format name
pub fn create_parser(name: &str) -> Result<Box<dyn ReportParser>> {
    match name {
        "junit" => Ok(Box::new(JunitXmlParser)),
        "certification" | "cert" => Ok(Box::new(CertificationXmlParser)),
        "html" => Ok(Box::new(HtmlReportParser)),
        "component" => Ok(Box::new(ComponentReportParser)),
        _ => Err(Error::MalformedInput(format!("unknown format: {}", name))),
    }
}

/// Create all format parsers
pub fn create_all_parsers() -> Vec<Box<dyn ReportParser>> {
    vec![
        Box::new(JunitXmlParser),
        Box::new(CertificationXmlParser),
        Box::new(HtmlReportParser),
        Box::new(ComponentReportParser),
    ]
}

/// Detect the right parser for an artifact by probing every format.
///
/// The highest-confidence match wins; ties go to registration order.
pub fn detect_parser_for_path(path: &Path) -> Result<Box<dyn ReportParser>> {
    if !path.exists() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }

    let mut best: Option<(f32, Box<dyn ReportParser>)> = None;
    for parser in create_all_parsers() {
        let confidence = parser.probe(path).confidence();
        if confidence > 0.0 && best.as_ref().is_none_or(|(c, _)| confidence > *c) {
            best = Some((confidence, parser));
        }
    }

    best.map(|(_, parser)| parser).ok_or_else(|| {
        Error::MalformedInput(format!(
            "cannot detect report format for: {}",
            path.display()
        ))
    })
}
