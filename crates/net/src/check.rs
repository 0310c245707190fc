//! Asking the update server for newer builds

use ota_errors::{Error, NetworkError};
use ota_events::{AppEvent, EventEmitter, EventSender, NetworkEvent};
use ota_types::{AvailableUpdate, UpdateManifest};
use tracing::{debug, info};
use url::Url;

use crate::client::{ensure_success, NetClient};

/// URL of the manifest for `device` under `base`
///
/// # Errors
///
/// Returns `InvalidUrl` if `base` does not parse or `device` is empty.
pub fn manifest_url(base: &str, device: &str) -> Result<Url, Error> {
    if device.is_empty() {
        return Err(NetworkError::InvalidUrl("empty device name".to_string()).into());
    }
    let mut url = Url::parse(base).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| NetworkError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(device);
    Ok(url)
}

/// Fetch every build published for `device`
///
/// # Errors
///
/// Returns `HttpError` for a non-success status and `InvalidManifest` if
/// the body is not a manifest document.
pub async fn fetch_manifest(
    client: &NetClient,
    base: &str,
    device: &str,
    tx: &EventSender,
) -> Result<UpdateManifest, Error> {
    let url = manifest_url(base, device)?;
    tx.emit(AppEvent::Network(NetworkEvent::CheckStarted {
        device: device.to_string(),
        url: url.to_string(),
    }));

    let response = ensure_success(client.get(url.as_str()).await?)?;
    let body = response
        .text()
        .await
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;

    let manifest: UpdateManifest =
        serde_json::from_str(&body).map_err(|e| NetworkError::InvalidManifest {
            message: e.to_string(),
        })?;
    debug!(device, published = manifest.updates.len(), "fetched update manifest");
    Ok(manifest)
}

/// The newest build for `device` made after `build_time`, if any
///
/// # Errors
///
/// Returns the errors of [`fetch_manifest`].
pub async fn check_for_update(
    client: &NetClient,
    base: &str,
    device: &str,
    build_time: i64,
    tx: &EventSender,
) -> Result<Option<AvailableUpdate>, Error> {
    let manifest = fetch_manifest(client, base, device, tx).await?;

    match manifest.newest_after(build_time) {
        Some(update) => {
            info!(
                id = %update.id,
                version = %update.version,
                datetime = update.datetime,
                "update available"
            );
            tx.emit(AppEvent::Network(NetworkEvent::UpdateAvailable {
                id: update.id.clone(),
                version: update.version.clone(),
                datetime: update.datetime,
                size: update.size,
            }));
            Ok(Some(update.clone()))
        }
        None => {
            info!(device, build_time, "no newer build published");
            tx.emit(AppEvent::Network(NetworkEvent::NoUpdateAvailable {
                device: device.to_string(),
                published: manifest.updates.len(),
            }));
            Ok(None)
        }
    }
}
