//! Client for the OMDb title-lookup API.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::config::OmdbSettings;
use crate::error::{AppError, AppResult};
use crate::model::{MediaKind, MediaRecord, Movie, Series};

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Looks titles up by name and returns the single best match.
#[derive(Debug, Clone)]
pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

/// The subset of an OMDb `?t=` response we keep.
#[derive(Debug, Deserialize)]
struct TitleResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "imdbRating", default)]
    rating: String,
    #[serde(rename = "Genre", default)]
    genre: String,
    #[serde(rename = "totalSeasons", default)]
    total_seasons: String,
    #[serde(rename = "Director", default)]
    director: String,
    #[serde(rename = "Runtime", default)]
    runtime: String,
}

impl TitleResponse {
    /// Converts a response into a record of `kind`, or `None` when OMDb
    /// found nothing or found a title of another kind.
    fn into_record(self, kind: MediaKind) -> Option<MediaRecord> {
        if self.response != "True" || self.kind.as_deref() != Some(kind.as_str()) {
            return None;
        }
        Some(match kind {
            MediaKind::Series => MediaRecord::Series(Series {
                title: self.title,
                year: self.year,
                rating: self.rating,
                genre: self.genre,
                total_seasons: self.total_seasons,
            }),
            MediaKind::Movie => MediaRecord::Movie(Movie {
                title: self.title,
                year: self.year,
                rating: self.rating,
                genre: self.genre,
                director: self.director,
                runtime: self.runtime,
            }),
        })
    }
}

impl OmdbClient {
    pub fn new(settings: &OmdbSettings) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(OmdbClient {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Looks `title` up and returns it if OMDb reports a title of `kind`.
    ///
    /// Fails with `LookupMiss` if nothing (or something of another kind)
    /// matches, and with `TransportFailure` if OMDb cannot be reached or
    /// answers with an error status.
    pub async fn lookup(&self, title: &str, kind: MediaKind) -> AppResult<MediaRecord> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("t", title), ("apikey", self.api_key.expose_secret())])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| {
                // The URL carries the API key.
                let err = err.without_url();
                log::warn!("OMDb request for {:?} failed: {}", title, err);
                AppError::TransportFailure(err.to_string())
            })?;

        let body: TitleResponse = response.json().await.map_err(|err| {
            let err = err.without_url();
            log::warn!("OMDb returned an unreadable body for {:?}: {}", title, err);
            AppError::TransportFailure(err.to_string())
        })?;

        if let Some(reason) = &body.error {
            log::debug!("OMDb miss for {:?}: {}", title, reason);
        }
        body.into_record(kind).ok_or_else(|| AppError::LookupMiss {
            query: title.to_owned(),
            kind,
        })
    }
}
