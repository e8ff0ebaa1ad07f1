// Fixture tests - each parser against a realistic on-disk artifact
use failsight_parsers::{
    CertificationXmlParser, ComponentReportParser, HtmlReportParser, JunitXmlParser, ReportFormat,
    ReportParser, detect_parser_for_path,
};
use failsight_types::FailureKind;
use std::path::Path;

#[test]
fn test_junit_fixture() {
    let path = Path::new("tests/samples/junit_results.xml");

    let report = JunitXmlParser
        .parse(path)
        .expect("Failed to parse JUnit fixture");

    assert_eq!(report.total, 5);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.skipped, 1);
    assert!((report.duration_seconds - 50.0).abs() < 1e-9);

    // Invariant: total always covers the non-passing buckets
    assert!(report.total >= report.failed + report.skipped + report.errors);

    let failure = report
        .failures
        .iter()
        .find(|f| f.kind == FailureKind::Failure)
        .expect("Expected one failure record");
    assert_eq!(failure.test_name, "test_attach_volume");
    assert!(failure.error_message.contains("in-use"));
    assert!(failure.traceback.contains("wait_for_volume_status"));

    // Passing tests never appear in the failures list
    assert!(
        report
            .failures
            .iter()
            .all(|f| f.test_name != "test_create_server")
    );
}

#[test]
fn test_certification_fixture() {
    let path = Path::new("tests/samples/certification_results.xml");

    let report = CertificationXmlParser
        .parse(path)
        .expect("Failed to parse certification fixture");

    assert_eq!(report.total, 4);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.review, 1);
    assert_eq!(report.skipped, 1);

    let failure = report
        .failures
        .iter()
        .find(|f| f.kind == FailureKind::Failure)
        .expect("Expected one FAIL record");
    assert!(failure.error_message.starts_with("Error: disk full"));
    assert!(failure.error_message.chars().count() <= 200);
    assert!(failure.traceback.contains("Command failed (RC=2)"));
    assert!(failure.traceback.contains("No space left on device"));

    let review = report
        .failures
        .iter()
        .find(|f| f.kind == FailureKind::Review)
        .expect("Expected one REVIEW record");
    assert!(review.error_message.starts_with("Test requires manual review"));

    assert_eq!(
        report.metadata.get("certification.id").map(String::as_str),
        Some("4012345")
    );
    assert_eq!(
        report.metadata.get("platform.version").map(String::as_str),
        Some("17.1")
    );
    assert_eq!(
        report.metadata.get("components").map(String::as_str),
        Some("cinder,manila")
    );
}

#[test]
fn test_html_fixture() {
    let path = Path::new("tests/samples/tempest_report.html");

    let report = HtmlReportParser
        .parse(path)
        .expect("Failed to parse HTML fixture");

    assert_eq!(report.total, 25);
    assert_eq!(report.passed, 22);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.duration_seconds, 310.2);

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].test_name, "test_boot_from_volume");
    assert!(report.failures[0].traceback.contains("BuildErrorException"));
    assert_eq!(report.failures[1].test_name, "test_resize_server");
}

#[test]
fn test_component_fixture() {
    let path = Path::new("tests/samples/neutron_ipv4-validation_report.json");

    let report = ComponentReportParser
        .parse(path)
        .expect("Failed to parse component fixture");

    assert_eq!(report.total, 10);
    assert_eq!(report.passed, 7);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors, 0);

    let fail = report
        .failures
        .iter()
        .find(|f| f.test_name.starts_with("test_create_port"))
        .expect("Expected port failure");
    assert_eq!(fail.test_name, "test_create_port [id-67f1b211-a7c8]");
    assert_eq!(
        fail.class_name,
        "tempest.api.network.test_ports.PortsTestJSON"
    );
    assert_eq!(fail.source_component.as_deref(), Some("neutron_ipv4"));
}

#[test]
fn test_format_detection_across_fixtures() {
    let cases = [
        ("tests/samples/junit_results.xml", ReportFormat::Junit),
        (
            "tests/samples/certification_results.xml",
            ReportFormat::Certification,
        ),
        ("tests/samples/tempest_report.html", ReportFormat::Html),
        (
            "tests/samples/neutron_ipv4-validation_report.json",
            ReportFormat::Component,
        ),
    ];

    for (path, expected) in cases {
        let parser = detect_parser_for_path(Path::new(path))
            .unwrap_or_else(|e| panic!("detection failed for {}: {}", path, e));
        assert_eq!(parser.format(), expected, "wrong format for {}", path);
    }
}
