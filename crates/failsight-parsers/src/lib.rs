// Error types
pub mod error;

// Parser trait and probe types (public API)
pub mod traits;

// Format parser implementations
pub mod certification;
pub mod component;
pub mod html;
pub mod junit;

// Artifact discovery
pub mod discovery;

// Format registry
pub mod registry;

// XML helpers shared by the parsers
pub(crate) mod xml;

// Traits
pub use traits::{ProbeResult, ReportFormat, ReportParser};

// Parsers
pub use certification::CertificationXmlParser;
pub use component::{ComponentReportParser, parse_component_dir};
pub use html::HtmlReportParser;
pub use junit::JunitXmlParser;

// Discovery
pub use discovery::{
    CertificationFile, TestFolder, discover_certification_files, discover_test_folders,
};

// Registry
pub use registry::{
    create_all_parsers, create_parser, detect_parser_for_path, get_all_formats,
    get_format_metadata, get_format_names,
};

// Error types
pub use error::{Error, Result};
