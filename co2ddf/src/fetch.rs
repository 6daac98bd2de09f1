//! Checking for and downloading newer releases of the source files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use log::{debug, info, warn};
use reqwest::header::LAST_MODIFIED;

use crate::config::Config;
use crate::error::{Co2DdfError, Co2DdfResult};

/// `{base_url}/{file}`
pub fn source_url(base_url: &str, file: &str) -> String {
    format!("{}/{file}", base_url.trim_end_matches('/'))
}

/// Parse an HTTP date, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`
pub fn parse_http_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.date_naive())
        .ok()
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Co2DdfResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Co2DdfError::RequestFailed {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// The `Last-Modified` date reported for `url`, if any
pub async fn last_modified(client: &reqwest::Client, url: &str) -> Co2DdfResult<Option<NaiveDate>> {
    let response = client.head(url).send().await?;
    check_status(url, response.status())?;
    let date = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);
    debug!("{url} last modified: {date:?}");
    Ok(date)
}

/// Whether any configured source file changed after `config.last_update`. A file
/// without a `Last-Modified` header is treated as newer.
pub async fn has_newer_source(config: &Config) -> Co2DdfResult<bool> {
    let client = reqwest::Client::new();
    for file in &config.source_files {
        let url = source_url(&config.base_url, file);
        match last_modified(&client, &url).await? {
            Some(date) if date <= config.last_update => {
                debug!("{file} unchanged since {}", config.last_update);
            }
            Some(date) => {
                info!("{file} updated on {date}");
                return Ok(true);
            }
            None => {
                warn!("No Last-Modified header for {url}, assuming it is newer");
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Download every configured source file into `source_dir`. Nothing is written until all
/// files have been fetched, so a failed request leaves the previous files in place.
pub async fn bulk_download(config: &Config, source_dir: &Path) -> Co2DdfResult<Vec<PathBuf>> {
    let client = reqwest::Client::new();
    let mut downloads = vec![];
    for file in &config.source_files {
        let url = source_url(&config.base_url, file);
        info!("Downloading {url}");
        let response = client.get(&url).send().await?;
        check_status(&url, response.status())?;
        downloads.push((source_dir.join(file), response.bytes().await?));
    }

    tokio::fs::create_dir_all(source_dir).await?;
    let mut paths = vec![];
    for (path, bytes) in downloads {
        tokio::fs::write(&path, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    fn config_for(server: &MockServer) -> Config {
        Config {
            base_url: server.base_url(),
            source_files: vec!["global.1751_2014.csv".into()],
            ..Config::default()
        }
    }

    #[test]
    fn test_source_url() {
        assert_eq!(
            source_url("https://example.org/csv/", "global.csv"),
            "https://example.org/csv/global.csv"
        );
        assert_eq!(
            source_url("https://example.org/csv", "global.csv"),
            "https://example.org/csv/global.csv"
        );
    }

    #[test]
    fn test_parse_http_date() {
        assert_eq!(
            parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT"),
            NaiveDate::from_ymd_opt(2015, 10, 21)
        );
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[tokio::test]
    async fn newer_source_should_be_detected() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(HEAD).path("/global.1751_2014.csv");
                then.status(200)
                    .header("Last-Modified", "Thu, 01 Mar 2018 00:00:00 GMT");
            })
            .await;
        let config = config_for(&server);
        assert!(has_newer_source(&config).await.unwrap());
        mock.assert_async().await;

        let config = Config {
            last_update: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            ..config
        };
        assert!(!has_newer_source(&config).await.unwrap());
    }

    #[tokio::test]
    async fn missing_last_modified_counts_as_newer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/global.1751_2014.csv");
                then.status(200);
            })
            .await;
        assert!(has_newer_source(&config_for(&server)).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_download_should_write_files() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/global.1751_2014.csv");
                then.status(200).body("Year,Total emissions\n");
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("source");
        let paths = bulk_download(&config_for(&server), &target).await.unwrap();
        assert_eq!(paths, vec![target.join("global.1751_2014.csv")]);
        assert_eq!(
            std::fs::read_to_string(&paths[0]).unwrap(),
            "Year,Total emissions\n"
        );
    }

    #[tokio::test]
    async fn failed_download_should_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/global.1751_2014.csv");
                then.status(404);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let result = bulk_download(&config_for(&server), dir.path()).await;
        assert!(matches!(
            result,
            Err(Co2DdfError::RequestFailed { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn failed_status_check_should_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/global.1751_2014.csv");
                then.status(503);
            })
            .await;
        let result = has_newer_source(&config_for(&server)).await;
        match result {
            Err(e @ Co2DdfError::RequestFailed { status: 503, .. }) => {
                assert!(e.to_string().starts_with("Request to "));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_download_should_keep_previous_files() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/global.1751_2014.csv");
                then.status(200).body("Year,Total emissions\n1950,1\n");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/nation.1751_2014.csv");
                then.status(404);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("global.1751_2014.csv");
        std::fs::write(&previous, "previous release\n").unwrap();

        let config = Config {
            source_files: vec![
                "global.1751_2014.csv".into(),
                "nation.1751_2014.csv".into(),
            ],
            ..config_for(&server)
        };
        let result = bulk_download(&config, dir.path()).await;
        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(&previous).unwrap(),
            "previous release\n",
            "files should only be replaced once every download succeeded"
        );
        assert!(!dir.path().join("nation.1751_2014.csv").exists());
    }
}
