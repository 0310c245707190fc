#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Update package inspection
//!
//! Locates the uncompressed payload blob inside an OTA zip container,
//! collects its installer headers and metadata, and checks that the
//! package targets the running device. Nothing is decompressed except the
//! two small text entries.

mod inspector;

pub use inspector::{inspect, inspect_file, parse_metadata, parse_properties};

/// Archive entry holding the payload blob
pub const PAYLOAD_ENTRY: &str = "payload.bin";

/// Archive entry holding installer header lines
pub const PROPERTIES_ENTRY: &str = "payload_properties.txt";

/// Archive entry holding `key=value` metadata
pub const METADATA_ENTRY: &str = "META-INF/com/android/metadata";

/// Metadata key naming the device the package was built for
pub const PRE_DEVICE_KEY: &str = "pre-device";

/// Size of a zip local file header without its variable-length fields
pub const LOCAL_HEADER_LEN: u64 = 30;
