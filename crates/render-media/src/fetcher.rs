//! Asset Fetcher: materializes remote assets into a job's working directory
//! before the Timeline Compiler runs against local paths.
//!
//! Object-store assets are expected to arrive here already presigned to a
//! plain URL — the fetcher only speaks HTTP, it doesn't hold storage
//! credentials itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use render_models::{Asset, AssetLocation};

use crate::error::{MediaError, MediaResult};

const MAX_REDIRECTS: usize = 10;
const MAX_CONSENT_ALTERNATES: usize = 3;
const DEFAULT_CONCURRENCY: usize = 4;

/// Downloads the assets a timeline references, following redirects and the
/// interstitial "consent" pages some public hosts insert before a direct
/// download link, bounded to a handful of concurrent transfers.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl Fetcher {
    pub fn new() -> MediaResult<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (compatible; RenderWorker/1.0)")
            .build()?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        })
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(n.max(1)));
        self
    }

    /// Fetches every asset into `working_dir`, keyed by asset id, deduping
    /// by id and bounding concurrency to the configured semaphore.
    pub async fn fetch_all(&self, assets: &[Asset], working_dir: &Path) -> MediaResult<HashMap<String, PathBuf>> {
        tokio::fs::create_dir_all(working_dir).await?;

        let mut set = tokio::task::JoinSet::new();
        for asset in assets {
            let fetcher = self.clone();
            let dir = working_dir.to_path_buf();
            let asset = asset.clone();
            set.spawn(async move {
                let id = asset.id.to_string();
                let result = fetcher.fetch_one(&asset, &dir).await;
                (id, result)
            });
        }

        let mut paths = HashMap::new();
        while let Some(joined) = set.join_next().await {
            let (id, result) = joined.map_err(|e| MediaError::download_failed(e.to_string()))?;
            paths.insert(id, result?);
        }
        Ok(paths)
    }

    async fn fetch_one(&self, asset: &Asset, working_dir: &Path) -> MediaResult<PathBuf> {
        let _permit = self.semaphore.acquire().await.expect("semaphore never closed");

        let url = match &asset.location {
            AssetLocation::PublicUrl { url } => url.clone(),
            AssetLocation::ObjectKey { key } => {
                return Err(MediaError::PresignFailed(format!(
                    "object key {key} reached the fetcher unresolved"
                )));
            }
        };

        let ext = infer_extension(asset, &url);
        let dest = working_dir.join(format!("{}.{ext}", asset.id.as_str()));
        self.download_with_consent_handling(&url, &dest).await?;
        Ok(dest)
    }

    async fn download_with_consent_handling(&self, url: &str, dest: &Path) -> MediaResult<()> {
        let mut current_url = url.to_string();
        let mut redirects = 0usize;
        let mut alternates_tried = 0usize;

        loop {
            let response = self.client.get(&current_url).send().await?;
            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(MediaError::TooManyRedirects(url.to_string()));
                }
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| MediaError::download_failed("redirect missing Location header"))?
                    .to_string();
                current_url = resolve_redirect(&current_url, &location)?;
                continue;
            }

            if !status.is_success() {
                return Err(MediaError::download_failed(format!("HTTP {status} fetching {current_url}")));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            let bytes = response.bytes().await?;

            if content_type.starts_with("text/html") {
                match scan_consent_page(&bytes, &current_url, alternates_tried) {
                    Some(next_url) => {
                        debug!("following consent page link for {}", url);
                        alternates_tried += 1;
                        current_url = next_url;
                        continue;
                    }
                    None => {
                        warn!("got HTML where media was expected fetching {}", url);
                        return Err(MediaError::EmptyOrHtmlContent(url.to_string()));
                    }
                }
            }

            if bytes.is_empty() {
                return Err(MediaError::EmptyOrHtmlContent(url.to_string()));
            }

            // A mislabeled consent/error page can arrive under a content-type
            // other than text/html; sniff the body itself when it's small
            // enough to plausibly be one.
            if bytes.len() < 1024 && looks_like_html(&bytes) {
                warn!("got HTML body under a non-HTML content-type fetching {}", url);
                return Err(MediaError::EmptyOrHtmlContent(url.to_string()));
            }

            tokio::fs::write(dest, &bytes).await?;
            return Ok(());
        }
    }
}

/// Sniffs the first bytes of a small response for HTML markers, catching a
/// consent/error page served under a content-type other than `text/html`.
fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let text = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html") || text.starts_with("<html") || text.starts_with("<head")
}

fn resolve_redirect(base: &str, location: &str) -> MediaResult<String> {
    let base_url = url::Url::parse(base).map_err(|e| MediaError::download_failed(e.to_string()))?;
    let joined = base_url.join(location).map_err(|e| MediaError::download_failed(e.to_string()))?;
    Ok(joined.to_string())
}

/// Looks for a `confirm=<token>` link in an interstitial consent page and
/// builds the alternate URL it points to, bounded to a handful of attempts
/// so a host that never resolves doesn't loop forever.
fn scan_consent_page(body: &[u8], current_url: &str, alternates_tried: usize) -> Option<String> {
    if alternates_tried >= MAX_CONSENT_ALTERNATES {
        return None;
    }
    let text = String::from_utf8_lossy(body);
    let marker = "confirm=";
    let idx = text.find(marker)?;
    let token: String = text[idx + marker.len()..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if token.is_empty() {
        return None;
    }
    let base = url::Url::parse(current_url).ok()?;
    let mut alt = base;
    alt.query_pairs_mut().append_pair("confirm", &token);
    Some(alt.to_string())
}

/// Declared filename extension, then URL path extension, then MIME type,
/// then the asset kind's default — in that order of trust.
fn infer_extension(asset: &Asset, url: &str) -> String {
    if let Some(filename) = &asset.filename {
        if let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) {
            return ext.to_lowercase();
        }
    }
    let path_only = url.split('?').next().unwrap_or(url);
    if let Some(ext) = Path::new(path_only).extension().and_then(|e| e.to_str()) {
        if !ext.is_empty() {
            return ext.to_lowercase();
        }
    }
    if let Some(mime) = &asset.mime {
        if let Some(ext) = extension_from_mime(mime) {
            return ext.to_string();
        }
    }
    asset.kind.default_extension().to_string()
}

fn extension_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/gif" => Some("gif"),
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "video/mp4" => Some("mp4"),
        "audio/mpeg" => Some("mp3"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_models::{AssetId, AssetKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn asset(url: &str, kind: AssetKind, filename: Option<&str>) -> Asset {
        Asset {
            id: AssetId::from_string("a1"),
            kind,
            location: AssetLocation::PublicUrl { url: url.to_string() },
            filename: filename.map(|f| f.to_string()),
            mime: None,
        }
    }

    #[test]
    fn infers_extension_from_filename_first() {
        let a = asset("https://example.com/raw", AssetKind::Video, Some("clip.mov"));
        assert_eq!(infer_extension(&a, "https://example.com/raw"), "mov");
    }

    #[test]
    fn infers_extension_from_url_path_when_no_filename() {
        let a = asset("https://example.com/video.mp4?sig=x", AssetKind::Video, None);
        assert_eq!(infer_extension(&a, "https://example.com/video.mp4?sig=x"), "mp4");
    }

    #[test]
    fn falls_back_to_kind_default() {
        let a = asset("https://example.com/raw", AssetKind::Image, None);
        assert_eq!(infer_extension(&a, "https://example.com/raw"), "png");
    }

    #[test]
    fn scans_confirm_token_out_of_consent_html() {
        let html = b"<html><a href=\"/download?id=1&confirm=t0k3n9\">Download anyway</a></html>";
        let next = scan_consent_page(html, "https://drive.example.com/uc?id=1", 0).expect("token found");
        assert!(next.contains("confirm=t0k3n9"));
    }

    #[test]
    fn consent_scan_gives_up_past_alternate_limit() {
        let html = b"<a href=\"?confirm=abc\">go</a>";
        assert!(scan_consent_page(html, "https://example.com/x", MAX_CONSENT_ALTERNATES).is_none());
    }

    #[tokio::test]
    async fn downloads_a_direct_media_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not-really-a-video".to_vec()))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp4");
        fetcher
            .download_with_consent_handling(&format!("{}/clip.mp4", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"not-really-a-video");
    }

    #[tokio::test]
    async fn html_without_consent_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>").insert_header("content-type", "text/html"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp4");
        let err = fetcher
            .download_with_consent_handling(&format!("{}/page", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyOrHtmlContent(_)));
    }
}
