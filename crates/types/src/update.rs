//! Published builds for a device

use serde::{Deserialize, Deserializer, Serialize};

/// Document served for one device: every build published for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    pub updates: Vec<AvailableUpdate>,
}

/// One published build
///
/// Unknown keys are ignored. `datetime` and `size` are accepted as numbers
/// or as numeric strings, since servers have published both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableUpdate {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub version: String,
    /// Build time in seconds since the epoch
    #[serde(deserialize_with = "number_or_string")]
    pub datetime: i64,
    #[serde(deserialize_with = "number_or_string")]
    pub size: u64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub build_type: String,
    #[serde(default)]
    pub version_code: String,
    #[serde(default)]
    pub android_version: String,
    #[serde(default)]
    pub android_spl: String,
    #[serde(default)]
    pub recovery_sha256: String,
    #[serde(default)]
    pub changelog_device: String,
}

impl UpdateManifest {
    /// The most recent build published after `build_time` (epoch seconds)
    #[must_use]
    pub fn newest_after(&self, build_time: i64) -> Option<&AvailableUpdate> {
        self.updates
            .iter()
            .filter(|update| update.datetime > build_time)
            .max_by_key(|update| update.datetime)
    }
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + Deserialize<'de>,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, datetime: i64) -> AvailableUpdate {
        AvailableUpdate {
            id: id.to_string(),
            filename: format!("{id}.zip"),
            url: format!("https://example.com/{id}.zip"),
            version: "1".to_string(),
            datetime,
            size: 10,
            date: String::new(),
            build_type: String::new(),
            version_code: String::new(),
            android_version: String::new(),
            android_spl: String::new(),
            recovery_sha256: String::new(),
            changelog_device: String::new(),
        }
    }

    #[test]
    fn test_newest_after_skips_older_builds() {
        let manifest = UpdateManifest {
            updates: vec![update("a", 100), update("c", 300), update("b", 200)],
        };
        assert_eq!(manifest.newest_after(150).map(|u| u.id.as_str()), Some("c"));
        assert!(manifest.newest_after(300).is_none());
    }
}
