//! Snapshot download: full retrieval into a staging file.

use std::path::Path;

use log::info;

use crate::error_handling::FetchError;

/// Downloads the compressed snapshot from `url` into `dest`.
///
/// The body is written to a sibling `.part` file and renamed onto `dest`
/// only after the full download succeeds, so a transport failure or a
/// non-success status never clobbers the previously staged file. The shared
/// client carries a request timeout, which bounds a hung download.
pub async fn fetch_snapshot(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), FetchError> {
    info!("Downloading snapshot from {}", url);

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let bytes = response.bytes().await?;
    info!("Downloaded {} bytes", bytes.len());

    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = Path::new(&part);

    tokio::fs::write(part, &bytes).await?;
    tokio::fs::rename(part, dest).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use tempfile::TempDir;

    #[tokio::test]
    async fn successful_download_lands_at_dest() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/latest.db.gz"))
                .respond_with(status_code(200).body("compressed bytes")),
        );

        let dir = TempDir::new().expect("temp dir");
        let dest = dir.path().join("latest.db.gz");
        let client = reqwest::Client::new();

        fetch_snapshot(&client, &server.url("/latest.db.gz").to_string(), &dest)
            .await
            .expect("download should succeed");

        assert_eq!(
            std::fs::read(&dest).expect("read staged file"),
            b"compressed bytes"
        );
        assert!(!dir.path().join("latest.db.gz.part").exists());
    }

    #[tokio::test]
    async fn error_status_leaves_previous_staging_untouched() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/latest.db.gz"))
                .respond_with(status_code(503)),
        );

        let dir = TempDir::new().expect("temp dir");
        let dest = dir.path().join("latest.db.gz");
        std::fs::write(&dest, b"previous download").expect("seed staging file");

        let client = reqwest::Client::new();
        let result = fetch_snapshot(&client, &server.url("/latest.db.gz").to_string(), &dest).await;

        assert!(matches!(result, Err(FetchError::Status(status)) if status.as_u16() == 503));
        assert_eq!(
            std::fs::read(&dest).expect("read staged file"),
            b"previous download"
        );
    }

    #[tokio::test]
    async fn connection_failure_reports_request_error() {
        // Nothing is listening on this port.
        let client = reqwest::Client::new();
        let dir = TempDir::new().expect("temp dir");
        let dest = dir.path().join("latest.db.gz");

        let result = fetch_snapshot(&client, "http://127.0.0.1:1/latest.db.gz", &dest).await;

        assert!(matches!(result, Err(FetchError::Request(_))));
        assert!(!dest.exists());
    }
}
