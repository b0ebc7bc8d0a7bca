//! Call recording download.
//!
//! Recordings live in private object storage; the pipeline resolves a
//! short-lived signed URL and fetches the payload over plain HTTP.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Download the audio payload behind `url` into `dest`.
///
/// Any non-success HTTP status is a hard failure; the signed URL either
/// works or the attempt is retried from the top. Returns the payload size
/// in bytes, which feeds the duration estimate.
pub async fn download_audio(
    client: &reqwest::Client,
    url: &str,
    dest: impl AsRef<Path>,
) -> MediaResult<u64> {
    let dest = dest.as_ref();
    debug!("Downloading audio to {}", dest.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "audio download returned HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;

    info!("Downloaded {} bytes of audio", bytes.len());
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_audio_writes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recording.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-audio".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("audio").join("recording.mp3");
        let client = reqwest::Client::new();

        let size = download_audio(&client, &format!("{}/recording.mp3", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(size, 10);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"fake-audio");
    }

    #[tokio::test]
    async fn test_download_audio_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recording.mp3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("recording.mp3");
        let client = reqwest::Client::new();

        let err = download_audio(&client, &format!("{}/recording.mp3", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(!dest.exists());
    }
}
