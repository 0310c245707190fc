//! Packages waiting in the packages directory

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix of a download that has not finished yet
const PARTIAL_SUFFIX: &str = ".part";

/// One package file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Regular files in `dir`, sorted by path. Unfinished downloads are left
/// out and a missing directory lists nothing.
pub async fn list_packages(dir: &Path) -> io::Result<Vec<PackageFile>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "packages directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut packages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        let path = entry.path();
        if !metadata.is_file() || path.to_string_lossy().ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        packages.push(PackageFile {
            path,
            size: metadata.len(),
        });
    }
    packages.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_finished_packages_only() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("b.zip"), b"bb").unwrap();
        std::fs::write(temp.path().join("a.zip"), b"a").unwrap();
        std::fs::write(temp.path().join("c.zip.part"), b"ccc").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        let packages = list_packages(temp.path()).await.unwrap();
        assert_eq!(
            packages,
            vec![
                PackageFile {
                    path: temp.path().join("a.zip"),
                    size: 1
                },
                PackageFile {
                    path: temp.path().join("b.zip"),
                    size: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let packages = list_packages(&temp.path().join("absent")).await.unwrap();
        assert!(packages.is_empty());
    }
}
