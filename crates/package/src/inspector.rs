//! Single-pass payload locator

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use ota_errors::{Error, PackageError, ValidationFailure};
use ota_types::PackagePayloadDescriptor;
use tracing::{debug, warn};
use zip::{CompressionMethod, ZipArchive};

use crate::{
    LOCAL_HEADER_LEN, METADATA_ENTRY, PAYLOAD_ENTRY, PRE_DEVICE_KEY, PROPERTIES_ENTRY,
};

/// Inspect an update package and validate it against `device`
///
/// Entries are visited once in central-directory order. Each entry adds its
/// local header, name and extra field to a running total, and non-directory
/// entries add their stored size too. The payload is written last by the
/// packaging tools, so its data starts at `total - payload_size`. Archives
/// with data descriptors or padding between entries break that assumption.
///
/// # Errors
///
/// Returns `PackageError::Validation` for a missing entry, a compressed
/// payload or a `pre-device` mismatch (an absent key included), and
/// `PackageError::InvalidFormat` if the container cannot be read as a zip
/// archive or its sizes overflow.
pub fn inspect<R: Read + Seek>(
    reader: R,
    device: &str,
) -> Result<PackagePayloadDescriptor, PackageError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| PackageError::InvalidFormat {
        message: format!("failed to read zip archive: {e}"),
    })?;

    let mut total: u64 = 0;
    let mut payload_size = None;
    let mut headers = None;
    let mut metadata = None;

    for index in 0..archive.len() {
        let (name, is_dir, compressed_size, method) = {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| PackageError::InvalidFormat {
                    message: format!("failed to read zip entry {index}: {e}"),
                })?;
            let extra_len = entry.extra_data().map_or(0, <[u8]>::len) as u64;
            let header_len = entry.name_raw().len() as u64 + LOCAL_HEADER_LEN + extra_len;
            total = advance(total, header_len)?;
            (
                entry.name().to_string(),
                entry.is_dir(),
                entry.compressed_size(),
                entry.compression(),
            )
        };

        if is_dir {
            continue;
        }

        match name.as_str() {
            PAYLOAD_ENTRY => {
                if method != CompressionMethod::Stored {
                    return Err(ValidationFailure::UnsupportedCompression {
                        method: format!("{method:?}"),
                    }
                    .into());
                }
                payload_size = Some(compressed_size);
            }
            PROPERTIES_ENTRY => {
                headers = Some(parse_properties(&read_entry(&mut archive, index, &name)?));
            }
            METADATA_ENTRY => {
                metadata = Some(parse_metadata(&read_entry(&mut archive, index, &name)?));
            }
            _ => {}
        }

        total = advance(total, compressed_size)?;
    }

    let size = payload_size.ok_or_else(|| missing(PAYLOAD_ENTRY))?;
    let headers = headers.ok_or_else(|| missing(PROPERTIES_ENTRY))?;
    let metadata = metadata.ok_or_else(|| missing(METADATA_ENTRY))?;

    // A package without a target device never matches, whatever the device
    match metadata.get(PRE_DEVICE_KEY) {
        Some(found) if found == device => {}
        found => {
            return Err(ValidationFailure::DeviceMismatch {
                expected: device.to_string(),
                found: found.cloned().unwrap_or_default(),
            }
            .into());
        }
    }

    let offset = total
        .checked_sub(size)
        .ok_or_else(|| PackageError::InvalidFormat {
            message: format!("payload size {size} exceeds archive span {total}"),
        })?;
    debug!(offset, size, headers = headers.len(), "located payload");

    Ok(PackagePayloadDescriptor {
        offset,
        size,
        headers,
        metadata,
    })
}

/// Inspect the package at `path` on the blocking pool
///
/// # Errors
///
/// Returns `PackageError::NotFound` if the file does not exist, otherwise
/// the errors of [`inspect`].
pub async fn inspect_file(path: &Path, device: &str) -> Result<PackagePayloadDescriptor, Error> {
    let path = path.to_path_buf();
    let device = device.to_string();

    tokio::task::spawn_blocking(move || -> Result<PackagePayloadDescriptor, Error> {
        let file = std::fs::File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PackageError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                PackageError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        let result = inspect(std::io::BufReader::new(file), &device);
        if let Err(e) = &result {
            warn!(path = %path.display(), error = %e, "package inspection failed");
        }
        result.map_err(Error::from)
    })
    .await
    .map_err(|e| Error::internal(format!("inspect task failed: {e}")))?
}

/// Installer header lines, blank lines dropped, order kept
#[must_use]
pub fn parse_properties(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `key=value` metadata, split on the first `=`; lines without one are skipped
#[must_use]
pub fn parse_metadata(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    name: &str,
) -> Result<String, PackageError> {
    let mut entry = archive
        .by_index(index)
        .map_err(|e| PackageError::InvalidFormat {
            message: format!("failed to open {name}: {e}"),
        })?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| PackageError::InvalidFormat {
            message: format!("failed to read {name}: {e}"),
        })?;
    Ok(text)
}

/// Add an archive-supplied length to the running offset
fn advance(total: u64, len: u64) -> Result<u64, PackageError> {
    total
        .checked_add(len)
        .ok_or_else(|| PackageError::InvalidFormat {
            message: "entry sizes overflow the archive offset".to_string(),
        })
}

fn missing(name: &str) -> PackageError {
    ValidationFailure::MissingEntry {
        name: name.to_string(),
    }
    .into()
}
