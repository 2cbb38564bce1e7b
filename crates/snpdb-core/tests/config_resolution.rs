// SPDX-License-Identifier: Apache-2.0

use snpdb_core::{SnpdbConfig, DEFAULT_GENOTYPE_BLOCK_SIZE};
use tempfile::tempdir;

#[test]
fn explicit_config_path_is_loaded() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"database": "db.sqlite", "marker_chunk_size": 4, "genotype_block_size": 2}"#,
    )
    .expect("write config");

    let config = SnpdbConfig::from_path(&path).expect("load config");
    assert_eq!(config.marker_chunk_size, 4);
    assert_eq!(config.genotype_block_size, 2);
}

#[test]
fn missing_config_file_reports_its_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let err = SnpdbConfig::from_path(&path).expect_err("missing file");
    assert!(err.to_string().contains("absent.json"), "{err}");
}

#[test]
fn defaults_are_valid() {
    let config = SnpdbConfig::default();
    config.validate().expect("defaults validate");
    assert_eq!(config.genotype_block_size, DEFAULT_GENOTYPE_BLOCK_SIZE);
}
