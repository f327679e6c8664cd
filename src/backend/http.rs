use super::range::{parse_content_range, ByteRange};
use super::{Backend, RangeChunk};
use crate::config::BackendConfig;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use theatre_common::{Episode, Error, MediaKind, MediaReference, Result, SeriesId, Timecode};

/// [`Backend`] over the media-library server's HTTP API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    media_path: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        // A stalled range fetch must eventually error so the in-flight guard clears.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            media_path: config.media_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let response = self
            .client
            .post(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(transport)?;

        check_status(&format!("POST {}", path), response.status())
    }

    fn progress_path(reference: &MediaReference) -> String {
        match reference.kind {
            MediaKind::Movie => format!("/last-access/{}", reference.id),
            MediaKind::Episode { .. } => format!("/episodes/{}/last-access", reference.id),
        }
    }
}

fn transport(e: reqwest::Error) -> Error {
    if e.is_decode() {
        Error::decode(e.to_string())
    } else {
        Error::transport(e.to_string())
    }
}

fn check_status(endpoint: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::status(endpoint, status.as_u16()))
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn fetch_range(
        &self,
        reference: &MediaReference,
        range: ByteRange,
        position: &Timecode,
    ) -> Result<RangeChunk> {
        let endpoint = format!("GET {}", self.media_path);
        let response = self
            .client
            .get(self.url(&self.media_path))
            .query(&[
                ("file", reference.locator.as_str()),
                ("timePlaying", position.as_str()),
            ])
            .header(header::RANGE, range.header_value())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let content_range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        match status {
            StatusCode::PARTIAL_CONTENT => {
                let header_value = content_range
                    .ok_or_else(|| Error::decode("206 response without Content-Range"))?;
                let (served, total_len) = parse_content_range(&header_value).ok_or_else(|| {
                    Error::decode(format!("Unparseable Content-Range: {}", header_value))
                })?;

                let bytes = response.bytes().await.map_err(transport)?;
                if bytes.len() as u64 != served.len() {
                    tracing::debug!(
                        expected = served.len(),
                        received = bytes.len(),
                        "Range body length differs from Content-Range"
                    );
                }

                Ok(RangeChunk {
                    range: served,
                    total_len,
                    bytes,
                })
            }
            StatusCode::OK => {
                // Server ignored the Range header and sent the whole file.
                let bytes = response.bytes().await.map_err(transport)?;
                let len = bytes.len() as u64;
                let served = ByteRange::new(0, len.saturating_sub(1))
                    .filter(|_| len > 0)
                    .ok_or_else(|| Error::decode("Empty media response"))?;

                Ok(RangeChunk {
                    range: served,
                    total_len: Some(len),
                    bytes,
                })
            }
            other => Err(Error::status(endpoint, other.as_u16())),
        }
    }

    async fn persist_progress(&self, reference: &MediaReference, offset: &Timecode) -> Result<()> {
        let path = Self::progress_path(reference);
        self.post(&path, &[("time", offset.as_str())]).await
    }

    async fn current_index(&self, series: SeriesId) -> Result<usize> {
        let path = format!("/series/{}/current", series);
        let response = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .map_err(transport)?;
        check_status(&format!("GET {}", path), response.status())?;

        let body: serde_json::Value = response.json().await.map_err(transport)?;
        let index = body
            .as_u64()
            .or_else(|| body.get("CurrentIndex").and_then(serde_json::Value::as_u64))
            .ok_or_else(|| Error::decode(format!("Unexpected current index body: {}", body)))?;

        usize::try_from(index).map_err(|_| Error::decode(format!("Index out of range: {}", index)))
    }

    async fn set_current_index(&self, series: SeriesId, index: usize) -> Result<()> {
        let path = format!("/series/{}/current", series);
        let index = index.to_string();
        self.post(&path, &[("index", index.as_str())]).await
    }

    async fn list_episodes(&self, series: SeriesId) -> Result<Vec<Episode>> {
        let path = format!("/series/{}/episodes", series);
        let response = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .map_err(transport)?;
        check_status(&format!("GET {}", path), response.status())?;

        let mut episodes: Vec<Episode> = response.json().await.map_err(transport)?;
        episodes.sort_by_key(|e| e.episode_index);
        Ok(episodes)
    }

    async fn start_keep_alive(&self, interval: &str) -> Result<()> {
        self.post("/start-cronos", &[("interval", interval)]).await
    }

    async fn stop_keep_alive(&self) -> Result<()> {
        self.post("/stop-cronos", &[]).await
    }
}
