//! Header generation: exact text, file handling and byte fidelity.

use ner_header::{BYTES_PER_LINE, HeaderError, HeaderOptions, generate_header_file, transcode};
use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

/// Recover the embedded bytes from a generated header.
fn parse_bytes(text: &str) -> Vec<u8> {
    text.lines()
        .filter(|l| l.starts_with("    0x"))
        .flat_map(|l| l.trim().trim_end_matches(',').split(", "))
        .map(|h| u8::from_str_radix(h.trim_start_matches("0x"), 16).unwrap())
        .collect()
}

#[test]
fn three_byte_header() {
    let text = transcode(&[0x00, 0xFF, 0x10], "model.bin", &HeaderOptions::default());
    insta::assert_snapshot!(text.trim_end(), @r"
    #ifndef DEFAULT_MODEL_HPP
    #define DEFAULT_MODEL_HPP

    #include <stdint.h>
    #include <stddef.h>

    // Bundled model from model.bin
    // Original size: 3 bytes
    static const uint8_t DEFAULT_MODEL_DATA[] = {
        0x00, 0xff, 0x10
    };

    static const size_t DEFAULT_MODEL_SIZE = sizeof(DEFAULT_MODEL_DATA);

    #endif // DEFAULT_MODEL_HPP
    ");
}

#[test]
fn writes_header_next_to_missing_directories() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tiny_ner.bin");
    fs::write(&input, [0x6cu8, 0x6d, 0x67, 0x67, 0x02]).unwrap();
    let output = dir.path().join("src/include/default_model.hpp");

    let n = generate_header_file(&input, &output, &HeaderOptions::default()).unwrap();
    assert_eq!(n, 5);

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("// Bundled model from tiny_ner.bin\n"));
    assert!(text.contains("    0x6c, 0x6d, 0x67, 0x67, 0x02\n};"));
    assert_eq!(parse_bytes(&text), [0x6c, 0x6d, 0x67, 0x67, 0x02]);
}

#[test]
fn missing_input_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.hpp");
    let err = generate_header_file(&dir.path().join("absent.bin"), &output, &HeaderOptions::default())
        .unwrap_err();
    assert!(matches!(err, HeaderError::MissingInput(_)), "got {err:?}");
    assert!(!output.exists());
}

#[test]
fn empty_input_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("empty.bin");
    fs::write(&input, b"").unwrap();
    let output = dir.path().join("out.hpp");

    let err = generate_header_file(&input, &output, &HeaderOptions::default()).unwrap_err();
    assert!(matches!(err, HeaderError::EmptyInput(_)), "got {err:?}");
    assert!(!output.exists());
}

#[test]
fn bad_identifier_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("m.bin");
    fs::write(&input, [1u8, 2, 3]).unwrap();
    let output = dir.path().join("out.hpp");
    let opts = HeaderOptions { guard: "MODEL-H".into(), ..HeaderOptions::default() };

    let err = generate_header_file(&input, &output, &opts).unwrap_err();
    assert!(matches!(err, HeaderError::InvalidIdentifier { .. }), "got {err:?}");
    assert!(!output.exists());
}

proptest! {
    #[test]
    fn bytes_survive_transcoding(data in prop::collection::vec(any::<u8>(), 1..200)) {
        let text = transcode(&data, "p.bin", &HeaderOptions::default());
        prop_assert_eq!(parse_bytes(&text), data.clone());

        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("    0x")).collect();
        prop_assert_eq!(rows.len(), data.len().div_ceil(BYTES_PER_LINE));
        let (last, rest) = rows.split_last().unwrap();
        prop_assert!(rest.iter().all(|r| r.ends_with(',')));
        prop_assert!(!last.ends_with(','));
        let size_comment = format!("// Original size: {} bytes", data.len());
        prop_assert!(text.contains(&size_comment));
    }
}
