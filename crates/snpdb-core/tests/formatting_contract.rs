// SPDX-License-Identifier: Apache-2.0

use snpdb_core::{sha256_hex, ErrorCode, ExitCode, MachineError, ERROR_CODES};

#[test]
fn display_and_debug_contracts_are_stable() {
    assert_eq!(sha256_hex(b"snpdb").len(), 64);
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );

    assert_eq!(format!("{}", ErrorCode::UniquenessViolation), "uniqueness_violation");
    assert_eq!(format!("{:?}", ExitCode::Internal), "Internal");

    let err = MachineError::new("usage_error", "invalid");
    assert_eq!(format!("{err}"), "usage_error: invalid");
    assert_eq!(
        format!("{err:?}"),
        "MachineError { code: \"usage_error\", message: \"invalid\", details: {} }"
    );
}

#[test]
fn every_error_code_has_a_unique_string_and_nonzero_exit() {
    let mut seen = std::collections::BTreeSet::new();
    for code in ERROR_CODES {
        assert!(seen.insert(code.as_str()), "duplicate code {}", code.as_str());
        assert_ne!(code.exit_code(), ExitCode::Success);
    }
}

#[test]
fn machine_error_serde_contract_is_strict() {
    let err = MachineError::from_code(ErrorCode::NotFound, "map not found").with_detail("map", "M1");
    let raw = serde_json::to_string(&err).expect("serialize");
    assert_eq!(
        raw,
        r#"{"code":"not_found","message":"map not found","details":{"map":"M1"}}"#
    );
    let parsed: Result<MachineError, _> =
        serde_json::from_str(r#"{"code":"x","message":"y","extra":1}"#);
    assert!(parsed.is_err(), "unknown fields must be rejected");
}
