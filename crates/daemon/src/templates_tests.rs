// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn file_generator_appends_resolved_parameters_to_the_template_body() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("crystal23/opt"), "CRYSTAL\nEND").ok();
    std::fs::create_dir_all(dir.path().join("crystal23")).unwrap();
    std::fs::write(dir.path().join("crystal23/opt"), "CRYSTAL\nEND").unwrap();

    let generator = FileInputGenerator::new(dir.path());
    let rendered = generator.generate("crystal23/opt", "TOLDEE 8").unwrap();
    assert!(rendered.starts_with("CRYSTAL\nEND"));
    assert!(rendered.contains("TOLDEE 8"));
}

#[test]
fn file_generator_reports_a_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let generator = FileInputGenerator::new(dir.path());
    assert!(generator.generate("does/not/exist", "").is_err());
}

#[test]
fn key_value_parser_extracts_trimmed_pairs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("output"), "FINAL_ENERGY = -1234.5\nCONVERGED = true\n").unwrap();

    let parser = KeyValueOutputParser::new("output");
    let parsed = parser.parse(dir.path()).unwrap();
    assert_eq!(parsed.get("FINAL_ENERGY"), Some(&"-1234.5".to_string()));
    assert_eq!(parsed.get("CONVERGED"), Some(&"true".to_string()));
}

#[test]
fn key_value_parser_reports_a_missing_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let parser = KeyValueOutputParser::new("output");
    assert!(parser.parse(dir.path()).is_err());
}
