//! Scryfall image resolution with a local file cache.
//!
//! Resolution never fails from the caller's point of view: any error on
//! any step falls back to the configured placeholder URL, so a broken
//! image lookup can never abort a listing or a reservation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const BACKOFF_CAP_MS: u64 = 10_000;

/// Resolves display images for cards via the Scryfall API, caching the
/// downloaded files on disk.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: reqwest::Client,
    base_url: String,
    image_dir: PathBuf,
    placeholder_url: String,
    attempts: u32,
    backoff: Duration,
}

impl ImageResolver {
    /// Creates a resolver from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.scryfall_base_url().trim_end_matches('/').to_string(),
            image_dir: config.image_cache_dir.clone(),
            placeholder_url: config.placeholder_image_url.clone(),
            attempts: config.scryfall_retry_total.max(1),
            backoff: Duration::from_millis(config.scryfall_backoff_ms),
        }
    }

    /// Returns the local URL for a card image, fetching and caching it on
    /// demand. Never fails; any error yields the placeholder URL.
    pub async fn resolve(&self, card_name: &str) -> String {
        let name = card_name.trim();
        if name.is_empty() {
            tracing::warn!("image lookup requested for an empty card name");
            return self.placeholder_url.clone();
        }

        let slug = slugify(name);
        if slug.is_empty() {
            tracing::warn!(card = name, "card name produced an empty slug");
            return self.placeholder_url.clone();
        }

        let filename = format!("{slug}.jpg");
        let path = self.image_dir.join(&filename);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(card = name, "serving cached image");
            return format!("/images/{filename}");
        }

        match self.fetch_and_cache(name, &path).await {
            Ok(()) => format!("/images/{filename}"),
            Err(err) => {
                tracing::warn!(card = name, error = %err, "image lookup failed, using placeholder");
                self.placeholder_url.clone()
            }
        }
    }

    async fn fetch_and_cache(&self, card_name: &str, path: &Path) -> Result<()> {
        let remote_url = self.card_image_uri(card_name).await?;

        let response = self.get_with_retry(&remote_url, &[]).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(Error::data_source(format!(
                "downloaded content is not an image (content-type: {content_type})"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::data_source_with_source("image download failed", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::data_source_with_source("image cache dir unavailable", e))?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| Error::data_source_with_source("failed to write cached image", e))?;

        tracing::info!(card = card_name, path = %path.display(), "cached card image");
        Ok(())
    }

    /// Looks up the card's image URI, preferring normal > large > small
    /// and falling back to the first face of double-faced cards.
    async fn card_image_uri(&self, card_name: &str) -> Result<String> {
        let url = format!("{}/cards/named", self.base_url);
        let response = self.get_with_retry(&url, &[("exact", card_name)]).await?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::data_source_with_source("invalid card lookup response", e))?;

        let uris = data
            .get("image_uris")
            .or_else(|| {
                data.get("card_faces")
                    .and_then(|faces| faces.get(0))
                    .and_then(|face| face.get("image_uris"))
            })
            .cloned()
            .unwrap_or_default();

        ["normal", "large", "small"]
            .iter()
            .find_map(|key| uris.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .ok_or_else(|| {
                Error::data_source(format!("no image URI in response for '{card_name}'"))
            })
    }

    /// GET with bounded retries on transient failures (429 and server
    /// errors). Read-only calls only; timeouts fail fast.
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = self.client.get(url).query(query).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < self.attempts {
                        tokio::time::sleep(self.backoff_for(attempt)).await;
                        continue;
                    }
                    return Err(Error::data_source(format!(
                        "request to {url} failed (status={status})"
                    )));
                }
                Err(err) => {
                    if err.is_timeout() {
                        return Err(Error::data_source_with_source("request timed out", err));
                    }
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff_for(attempt)).await;
                        continue;
                    }
                    return Err(Error::data_source_with_source("request failed", err));
                }
            }
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let millis = u64::try_from(self.backoff.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(2_u64.saturating_pow(exponent))
            .min(BACKOFF_CAP_MS);
        Duration::from_millis(millis)
    }
}

/// Creates a URL-friendly slug: lowercased, with runs of characters other
/// than alphanumerics and hyphens collapsed into single underscores.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '-' {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Lightning Bolt"), "lightning_bolt");
        assert_eq!(slugify("Jace, the Mind Sculptor"), "jace_the_mind_sculptor");
    }

    #[test]
    fn slugify_edge_cases() {
        assert_eq!(slugify("  Spaced   Out  "), "spaced_out");
        assert_eq!(slugify("Half-Elf"), "half-elf");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    fn resolver(base_url: &str, image_dir: &Path) -> ImageResolver {
        let config = Config {
            debug: true,
            scryfall_base_url: Some(base_url.to_string()),
            image_cache_dir: image_dir.to_path_buf(),
            scryfall_retry_total: 3,
            scryfall_backoff_ms: 1,
            ..Config::default()
        };
        ImageResolver::from_config(&config)
    }

    /// Binds first so handlers can reference the server's own address.
    async fn spawn_with(build: impl FnOnce(String) -> Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let app = build(base.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        base
    }

    #[tokio::test]
    async fn empty_name_resolves_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver("http://127.0.0.1:1", dir.path());
        assert_eq!(resolver.resolve("   ").await, "/images/placeholder.jpg");
    }

    #[tokio::test]
    async fn cached_file_short_circuits_the_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lightning_bolt.jpg"), b"jpeg").unwrap();

        // Unroutable base URL: a network hit would fail the test.
        let resolver = resolver("http://127.0.0.1:1", dir.path());
        assert_eq!(
            resolver.resolve("Lightning Bolt").await,
            "/images/lightning_bolt.jpg"
        );
    }

    #[tokio::test]
    async fn fetches_downloads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_with(|base| {
            Router::new()
                .route(
                    "/cards/named",
                    get(move || {
                        let base = base.clone();
                        async move {
                            axum::Json(serde_json::json!({
                                "image_uris": { "normal": format!("{base}/img/bolt.jpg") }
                            }))
                        }
                    }),
                )
                .route(
                    "/img/bolt.jpg",
                    get(|| async {
                        ([("content-type", "image/jpeg")], b"jpegbytes".to_vec())
                    }),
                )
        })
        .await;

        let resolver = resolver(&base, dir.path());
        assert_eq!(
            resolver.resolve("Lightning Bolt").await,
            "/images/lightning_bolt.jpg"
        );
        assert!(dir.path().join("lightning_bolt.jpg").exists());
    }

    #[tokio::test]
    async fn double_faced_cards_use_the_first_face() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_with(|base| {
            Router::new()
                .route(
                    "/cards/named",
                    get(move || {
                        let base = base.clone();
                        async move {
                            axum::Json(serde_json::json!({
                                "card_faces": [
                                    { "image_uris": { "large": format!("{base}/img/front.jpg") } },
                                    { "image_uris": { "large": format!("{base}/img/back.jpg") } }
                                ]
                            }))
                        }
                    }),
                )
                .route(
                    "/img/front.jpg",
                    get(|| async { ([("content-type", "image/jpeg")], b"front".to_vec()) }),
                )
        })
        .await;

        let resolver = resolver(&base, dir.path());
        assert_eq!(
            resolver.resolve("Delver of Secrets").await,
            "/images/delver_of_secrets.jpg"
        );
    }

    #[tokio::test]
    async fn non_image_content_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_with(|base| {
            Router::new()
                .route(
                    "/cards/named",
                    get(move || {
                        let base = base.clone();
                        async move {
                            axum::Json(serde_json::json!({
                                "image_uris": { "normal": format!("{base}/img/bolt.jpg") }
                            }))
                        }
                    }),
                )
                .route(
                    "/img/bolt.jpg",
                    get(|| async { ([("content-type", "text/html")], "<html>".to_string()) }),
                )
        })
        .await;

        let resolver = resolver(&base, dir.path());
        assert_eq!(
            resolver.resolve("Lightning Bolt").await,
            "/images/placeholder.jpg"
        );
        assert!(!dir.path().join("lightning_bolt.jpg").exists());
    }

    #[tokio::test]
    async fn lookup_retries_transient_server_errors() {
        let dir = tempfile::tempdir().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let base = spawn_with(move |base| {
            Router::new()
                .route(
                    "/cards/named",
                    get(move || {
                        let counter = Arc::clone(&counter);
                        let base = base.clone();
                        async move {
                            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                                Err(axum::http::StatusCode::TOO_MANY_REQUESTS)
                            } else {
                                Ok(axum::Json(serde_json::json!({
                                    "image_uris": { "normal": format!("{base}/img/bolt.jpg") }
                                })))
                            }
                        }
                    }),
                )
                .route(
                    "/img/bolt.jpg",
                    get(|| async { ([("content-type", "image/jpeg")], b"jpeg".to_vec()) }),
                )
        })
        .await;

        let resolver = resolver(&base, dir.path());
        assert_eq!(
            resolver.resolve("Lightning Bolt").await,
            "/images/lightning_bolt.jpg"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_image_uris_fall_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_with(|_| {
            Router::new().route(
                "/cards/named",
                get(|| async { axum::Json(serde_json::json!({ "name": "Weird Card" })) }),
            )
        })
        .await;

        let resolver = resolver(&base, dir.path());
        assert_eq!(
            resolver.resolve("Weird Card").await,
            "/images/placeholder.jpg"
        );
    }
}
