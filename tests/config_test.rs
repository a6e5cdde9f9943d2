// Export configuration loaded from YAML files

mod common;

use std::io::Write;

use common::*;
use musicxml_export::config::{ConfigError, ExportConfig};
use musicxml_export::models::{Measure, Part, Score, Step};
use musicxml_export::renderers::musicxml::to_musicxml;

fn one_measure_score() -> Score {
    let mut ids = Ids::new();
    let mut measure = Measure::new(ids.next(), 1);
    measure.elements.push(note(&mut ids, ql(0, 1), Step::F, 4, ql(4, 1)));
    Score { parts: vec![Part { measures: vec![measure], ..Part::default() }], ..Score::default() }
}

#[test]
fn test_config_file_drives_header() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "encoding:\n  software: Engraver 2\n  encoding_date: \"2024-05-01\"\nlayout:\n  scaling:\n    millimeters: 6.5\n    tenths: 40\n  page:\n    height: 1700\n    width: 1200\nexport:\n  indent: 0\n"
    )
    .expect("write config");

    let config = ExportConfig::from_yaml_file(file.path()).expect("config should load");
    assert_eq!(config.encoding.software, "Engraver 2");
    assert!(config.export.join_part_staffs, "unset keys keep their defaults");

    let xml = to_musicxml(&one_measure_score(), &config).unwrap();
    assert!(xml.contains("<software>Engraver 2</software>"));
    assert!(xml.contains("<encoding-date>2024-05-01</encoding-date>"));
    assert!(xml.contains("<millimeters>6.5</millimeters>"));
    assert!(xml.contains("<page-height>1700</page-height>"));
    assert!(xml.contains(r#"<page-margins type="both">"#));
    assert_eq!(xml.trim_end().lines().count(), 1, "indent 0 writes a single line");
}

#[test]
fn test_indent_width() {
    let mut config = ExportConfig::default();
    config.export.indent = 4;
    let xml = to_musicxml(&one_measure_score(), &config).unwrap();
    assert!(xml.contains("\n    <part-list>"));
    assert!(xml.ends_with("</score-partwise>\n"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ExportConfig::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_musicxml_version_from_config() {
    let config = ExportConfig::from_yaml_str("encoding:\n  musicxml_version: \"3.0\"\n").unwrap();
    let xml = to_musicxml(&one_measure_score(), &config).unwrap();
    assert!(xml.contains(r#"<score-partwise version="3.0">"#));
}
