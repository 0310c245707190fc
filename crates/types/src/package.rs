//! Update package type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Caller-supplied description of one update target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Display name of the update
    pub name: String,
    /// Where the package came from: a local path or a URL
    pub source: String,
    /// Raw descriptor text the config was built from (may be empty)
    #[serde(default)]
    pub raw: String,
    /// Local path of the package the inspector reads
    pub package_path: PathBuf,
}

impl UpdateConfig {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        raw: impl Into<String>,
        package_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            raw: raw.into(),
            package_path: package_path.into(),
        }
    }

    /// Config for a package that was picked straight from the filesystem
    #[must_use]
    pub fn from_package_path(path: impl Into<PathBuf>) -> Self {
        let package_path = path.into();
        let name = package_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: package_path.display().to_string(),
            raw: String::new(),
            package_path,
        }
    }

    /// File name of the package, if the path has one
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.package_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Locator handed to the engine for this package.
    ///
    /// URL sources are passed through. Local packages become `file://`
    /// URLs; when `payload_root` is set the engine is assumed to see the
    /// package under that directory instead of the local path.
    #[must_use]
    pub fn payload_locator(&self, payload_root: Option<&Path>) -> String {
        if is_url(&self.source) {
            return self.source.clone();
        }
        match (payload_root, self.package_path.file_name()) {
            (Some(root), Some(file_name)) => format!("file://{}", root.join(file_name).display()),
            _ => format!("file://{}", self.package_path.display()),
        }
    }
}

fn is_url(source: &str) -> bool {
    ["file://", "http://", "https://"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}

/// Location and installer inputs of the payload blob inside a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePayloadDescriptor {
    /// Byte offset of the payload blob within the archive file
    pub offset: u64,
    /// Byte size of the payload blob
    pub size: u64,
    /// Installer header lines, in package order
    pub headers: Vec<String>,
    /// Metadata `key=value` pairs
    pub metadata: HashMap<String, String>,
}

impl PackagePayloadDescriptor {
    /// Convenience lookup into the metadata block
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
