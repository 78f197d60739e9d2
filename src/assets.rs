//! Image asset resolution
//!
//! A reference string from a CSV cell becomes an [`Asset`] ready to embed,
//! or an [`AssetError`] the filler turns into visible fallback text. No
//! resolver ever aborts a batch.

use crate::error::{AssetError, Error, Result};
use crate::qr::QrStyler;
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// EMUs (English Metric Units) per millimetre, the unit DOCX drawings use
const EMU_PER_MM: f32 = 36_000.0;

/// File extensions accepted from the local asset directory
const LOCAL_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// A validated image, re-encoded as PNG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// PNG-encoded pixels
    pub png: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Format the bytes arrived in
    pub source_format: ImageFormat,
}

impl Asset {
    /// Decode `bytes` and normalize them to PNG.
    ///
    /// Anything `image` can decode is accepted; WebP and other formats Word
    /// may not render are converted on the way.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, AssetError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| AssetError::InvalidImage(e.to_string()))?;
        let source_format = reader
            .format()
            .ok_or_else(|| AssetError::InvalidImage("unrecognised image data".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| AssetError::InvalidImage(e.to_string()))?;

        if source_format != ImageFormat::Png {
            tracing::debug!(?source_format, "Converting asset to PNG");
        }

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AssetError::InvalidImage(e.to_string()))?;

        Ok(Self {
            png,
            width: image.width(),
            height: image.height(),
            source_format,
        })
    }

    /// Drawing extent in EMUs for a given display width, keeping the aspect ratio.
    pub fn extent_emu(&self, width_mm: f32) -> (u32, u32) {
        let width = (width_mm * EMU_PER_MM).round() as u32;
        let height = if self.width == 0 {
            width
        } else {
            let scaled = u64::from(width) * u64::from(self.height) / u64::from(self.width);
            u32::try_from(scaled).unwrap_or(u32::MAX)
        };
        (width, height)
    }
}

/// Outcome of resolving one reference
pub type AssetOutcome = std::result::Result<Asset, AssetError>;

/// Turns a CSV cell into image bytes
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve `reference`; failures are values, never panics or batch aborts.
    async fn resolve(&self, reference: &str) -> AssetOutcome;

    /// Short name used in logs and reports
    fn kind(&self) -> &'static str;
}

/// Looks references up as file names under a fixed directory
#[derive(Debug, Clone)]
pub struct LocalAssets {
    dir: PathBuf,
}

impl LocalAssets {
    /// Resolve references relative to `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Only plain relative names stay inside the asset directory.
fn stays_inside(reference: &Path) -> bool {
    reference
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl AssetResolver for LocalAssets {
    async fn resolve(&self, reference: &str) -> AssetOutcome {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AssetError::FetchFailed("empty image reference".to_string()));
        }

        if !stays_inside(Path::new(reference)) {
            return Err(AssetError::FetchFailed(format!(
                "{reference} is outside the asset directory"
            )));
        }

        let path = self.dir.join(reference);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AssetError::FetchFailed(format!("{} not found", path.display())));
        }
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !LOCAL_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AssetError::UnsupportedFormat(format!(
                "{} (expected one of {})",
                path.display(),
                LOCAL_EXTENSIONS.join(", ")
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AssetError::FetchFailed(format!("{}: {e}", path.display())))?;
        Asset::from_bytes(&bytes)
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

/// Fetches share-link references from a file-hosting download endpoint
#[derive(Debug, Clone)]
pub struct DriveAssets {
    client: reqwest::Client,
    endpoint: String,
}

impl DriveAssets {
    /// Fetch through `endpoint` (e.g. `https://drive.google.com/uc`).
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch(&self, url: &str, id: &str) -> AssetOutcome {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("export", "download"), ("id", id)])
            .send()
            .await
            .map_err(|e| AssetError::FetchFailed(format!("{url}: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AssetError::FetchFailed(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("image") {
            tracing::warn!(%url, %content_type, "Not an image");
            return Err(AssetError::FetchFailed(format!(
                "{url}: not an image (got {content_type})"
            )));
        }

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| AssetError::FetchFailed(format!("{url}: {e}")))?;
        Asset::from_bytes(&body)
    }
}

#[async_trait]
impl AssetResolver for DriveAssets {
    async fn resolve(&self, reference: &str) -> AssetOutcome {
        let url = reference.trim();
        let id = drive_file_id(url).ok_or_else(|| {
            AssetError::FetchFailed(format!("no file id in share link '{url}'"))
        })?;
        tracing::debug!(%url, %id, "Fetching remote asset");
        self.fetch(url, id).await
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}

/// Extract the file identifier from a share link.
///
/// Accepts `...?id=<ID>` and `.../d/<ID>/...` shapes.
pub fn drive_file_id(url: &str) -> Option<&str> {
    let id = if let Some((_, rest)) = url.split_once("id=") {
        rest.split('&').next()
    } else if let Some((_, rest)) = url.split_once("/d/") {
        rest.split(['/', '?']).next()
    } else {
        None
    };
    id.map(str::trim).filter(|id| !id.is_empty())
}

/// Sends `http(s)://` references to a remote resolver and everything else to
/// a local one
#[derive(Debug, Clone)]
pub struct RoutedAssets {
    local: LocalAssets,
    remote: DriveAssets,
}

impl RoutedAssets {
    /// Route between `local` and `remote`.
    pub fn new(local: LocalAssets, remote: DriveAssets) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl AssetResolver for RoutedAssets {
    async fn resolve(&self, reference: &str) -> AssetOutcome {
        let trimmed = reference.trim_start();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            self.remote.resolve(reference).await
        } else {
            self.local.resolve(reference).await
        }
    }

    fn kind(&self) -> &'static str {
        "routed"
    }
}

/// Renders the reference itself as a QR code
#[derive(Debug, Clone)]
pub struct QrAssets {
    styler: QrStyler,
}

impl QrAssets {
    /// Encode references with `styler`.
    pub fn new(styler: QrStyler) -> Self {
        Self { styler }
    }
}

#[async_trait]
impl AssetResolver for QrAssets {
    async fn resolve(&self, reference: &str) -> AssetOutcome {
        let content = reference.trim();
        if content.is_empty() {
            return Err(AssetError::FetchFailed("nothing to encode".to_string()));
        }
        let png = self
            .styler
            .render_png(content)
            .map_err(|e| AssetError::FetchFailed(e.to_string()))?;
        Asset::from_bytes(&png)
    }

    fn kind(&self) -> &'static str {
        "qr"
    }
}
