//! Integration tests for package inspection

use std::io::{Cursor, Write};

use ota_errors::{Error, PackageError, ValidationFailure};
use ota_package::{inspect, inspect_file, METADATA_ENTRY, PAYLOAD_ENTRY, PROPERTIES_ENTRY};
use proptest::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const PROPERTIES: &str = "FILE_HASH=lZ8jS0ZEdm2uBz6ZYwiwEsMEF/Pg5JrQJjvjUAOKVFY=\nFILE_SIZE=1000\n";

struct Fixture {
    properties: Option<String>,
    metadata: Option<String>,
    payload: Option<Vec<u8>>,
    payload_method: CompressionMethod,
    directories: bool,
}

impl Fixture {
    fn alpha() -> Self {
        Self {
            properties: Some(PROPERTIES.to_string()),
            metadata: Some("ota-type=AB\npre-device=alpha\n".to_string()),
            payload: Some((0..1000u32).map(|i| (i % 251) as u8).collect()),
            payload_method: CompressionMethod::Stored,
            directories: false,
        }
    }

    fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let text = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        if self.directories {
            writer.add_directory("META-INF/", text).unwrap();
            writer.add_directory("META-INF/com/", text).unwrap();
        }
        if let Some(metadata) = &self.metadata {
            writer.start_file(METADATA_ENTRY, text).unwrap();
            writer.write_all(metadata.as_bytes()).unwrap();
        }
        if let Some(properties) = &self.properties {
            writer
                .start_file(
                    PROPERTIES_ENTRY,
                    SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
                )
                .unwrap();
            writer.write_all(properties.as_bytes()).unwrap();
        }
        if let Some(payload) = &self.payload {
            writer
                .start_file(
                    PAYLOAD_ENTRY,
                    SimpleFileOptions::default().compression_method(self.payload_method),
                )
                .unwrap();
            writer.write_all(payload).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

fn failure(err: PackageError) -> ValidationFailure {
    err.validation_failure().cloned().expect("validation failure")
}

#[test]
fn test_alpha_package_on_alpha_device() {
    let fixture = Fixture::alpha();
    let bytes = fixture.build();

    let descriptor = inspect(Cursor::new(&bytes), "alpha").unwrap();
    assert_eq!(descriptor.size, 1000);
    assert_eq!(descriptor.headers.len(), 2);
    assert!(descriptor.headers[0].starts_with("FILE_HASH="));
    assert_eq!(descriptor.headers[1], "FILE_SIZE=1000");
    assert_eq!(descriptor.metadata_value("pre-device"), Some("alpha"));

    let start = usize::try_from(descriptor.offset).unwrap();
    assert_eq!(&bytes[start..start + 1000], fixture.payload.as_deref().unwrap());
}

#[test]
fn test_alpha_package_on_beta_device() {
    let bytes = Fixture::alpha().build();
    let err = inspect(Cursor::new(&bytes), "beta").unwrap_err();
    let failure = failure(err);
    assert_eq!(failure.reason(), "device mismatch");
    assert_eq!(
        failure,
        ValidationFailure::DeviceMismatch {
            expected: "beta".into(),
            found: "alpha".into(),
        }
    );
}

#[test]
fn test_missing_pre_device_is_a_mismatch() {
    let fixture = Fixture {
        metadata: Some("ota-type=AB\n".to_string()),
        ..Fixture::alpha()
    };
    let err = inspect(Cursor::new(fixture.build()), "alpha").unwrap_err();
    assert_eq!(failure(err).reason(), "device mismatch");
}

#[test]
fn test_missing_pre_device_never_matches_empty_device() {
    let fixture = Fixture {
        metadata: Some("ota-type=AB\n".to_string()),
        ..Fixture::alpha()
    };
    let err = inspect(Cursor::new(fixture.build()), "").unwrap_err();
    assert_eq!(
        failure(err),
        ValidationFailure::DeviceMismatch {
            expected: String::new(),
            found: String::new(),
        }
    );
}

#[test]
fn test_deflated_payload_is_rejected() {
    let fixture = Fixture {
        payload_method: CompressionMethod::Deflated,
        ..Fixture::alpha()
    };
    let err = inspect(Cursor::new(fixture.build()), "alpha").unwrap_err();
    assert!(matches!(
        failure(err),
        ValidationFailure::UnsupportedCompression { .. }
    ));
}

#[test]
fn test_missing_entries() {
    for (fixture, name) in [
        (
            Fixture {
                payload: None,
                ..Fixture::alpha()
            },
            PAYLOAD_ENTRY,
        ),
        (
            Fixture {
                properties: None,
                ..Fixture::alpha()
            },
            PROPERTIES_ENTRY,
        ),
        (
            Fixture {
                metadata: None,
                ..Fixture::alpha()
            },
            METADATA_ENTRY,
        ),
    ] {
        let err = inspect(Cursor::new(fixture.build()), "alpha").unwrap_err();
        assert_eq!(
            failure(err),
            ValidationFailure::MissingEntry { name: name.into() }
        );
    }
}

#[test]
fn test_directory_entries_are_counted_without_data() {
    let fixture = Fixture {
        directories: true,
        ..Fixture::alpha()
    };
    let bytes = fixture.build();
    let descriptor = inspect(Cursor::new(&bytes), "alpha").unwrap();
    let start = usize::try_from(descriptor.offset).unwrap();
    assert_eq!(&bytes[start..start + 1000], fixture.payload.as_deref().unwrap());
}

#[test]
fn test_not_a_zip() {
    let err = inspect(Cursor::new(b"definitely not a zip".to_vec()), "alpha").unwrap_err();
    assert!(matches!(err, PackageError::InvalidFormat { .. }));
}

#[tokio::test]
async fn test_inspect_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ota-alpha.zip");
    std::fs::write(&path, Fixture::alpha().build()).unwrap();

    let descriptor = inspect_file(&path, "alpha").await.unwrap();
    assert_eq!(descriptor.size, 1000);

    let missing = inspect_file(&temp.path().join("nope.zip"), "alpha").await;
    assert!(matches!(
        missing,
        Err(Error::Package(PackageError::NotFound { .. }))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_inspection_is_idempotent_and_locates_payload(
        payload in proptest::collection::vec(any::<u8>(), 0..4096),
        lines in proptest::collection::vec("[A-Z_]{1,12}=[a-z0-9]{0,16}", 0..6),
        directories in any::<bool>(),
    ) {
        let fixture = Fixture {
            properties: Some(lines.join("\n")),
            payload: Some(payload.clone()),
            directories,
            ..Fixture::alpha()
        };
        let bytes = fixture.build();

        let first = inspect(Cursor::new(&bytes), "alpha").unwrap();
        let second = inspect(Cursor::new(&bytes), "alpha").unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first.headers, &lines);

        let start = usize::try_from(first.offset).unwrap();
        prop_assert_eq!(&bytes[start..start + payload.len()], payload.as_slice());
    }

    #[test]
    fn prop_non_stored_payload_always_fails(
        payload in proptest::collection::vec(any::<u8>(), 1..2048),
    ) {
        let fixture = Fixture {
            payload: Some(payload),
            payload_method: CompressionMethod::Deflated,
            ..Fixture::alpha()
        };
        let err = inspect(Cursor::new(fixture.build()), "alpha").unwrap_err();
        prop_assert!(
            matches!(
                err.validation_failure(),
                Some(ValidationFailure::UnsupportedCompression { .. })
            ),
            "unexpected error: {}",
            err
        );
    }
}
