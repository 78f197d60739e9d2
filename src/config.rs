//! qrdoc runtime configuration handling

use crate::error::{Error, Result};
use crate::qr::QrStyle;
use crate::template::PlaceholderStyle;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrdocConfig {
    /// Batch output and template filling
    pub batch: BatchOptions,
    /// Image asset lookup
    pub assets: AssetOptions,
    /// QR rendering
    pub qr: QrOptions,
    /// PDF conversion
    pub pdf: PdfOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrdocConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrdoc.toml", "qrdoc.yaml", "qrdoc.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrdoc");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => Self::from_toml_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.batch.apply_env_overrides();
        self.assets.apply_env_overrides();
        self.qr.apply_env_overrides();
        self.pdf.apply_env_overrides();
        self.logging.apply_env_overrides();
    }
}

/// Where and how batch documents are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Base output directory for `fill`
    pub output_dir: PathBuf,
    /// Pick `dir`, `dir1`, `dir2`, ... instead of reusing an existing directory
    pub unique_dir: bool,
    /// Width of inline images in millimetres
    pub image_width_mm: f32,
    /// Placeholder token syntax used by `fill`
    pub placeholder_style: PlaceholderStyle,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("monographs"),
            unique_dir: true,
            image_width_mm: 38.1, // 1.5 in
            placeholder_style: PlaceholderStyle::Single,
        }
    }
}

impl BatchOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRDOC_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(unique) = env::var("QRDOC_UNIQUE_DIR") {
            if let Some(parsed) = parse_flag(&unique) {
                self.unique_dir = parsed;
            }
        }
        if let Ok(width) = env::var("QRDOC_IMAGE_WIDTH_MM") {
            if let Ok(parsed) = width.parse::<f32>() {
                if parsed > 0.0 {
                    self.image_width_mm = parsed;
                }
            }
        }
    }
}

/// Local and remote image lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetOptions {
    /// Directory that local image references are resolved against
    pub dir: PathBuf,
    /// Direct-download endpoint for share-link identifiers
    pub drive_endpoint: String,
    /// Timeout for a single remote fetch; 0 disables the timeout
    pub http_timeout_secs: u64,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("assets"),
            drive_endpoint: "https://drive.google.com/uc".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl AssetOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRDOC_ASSETS_DIR") {
            self.dir = PathBuf::from(dir);
        }
        if let Ok(endpoint) = env::var("QRDOC_DRIVE_ENDPOINT") {
            self.drive_endpoint = endpoint;
        }
        if let Ok(timeout) = env::var("QRDOC_HTTP_TIMEOUT") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.http_timeout_secs = parsed;
            }
        }
    }

    /// Fetch timeout, if one is configured.
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }
}

/// QR rendering defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Style used when the command line does not name one
    pub style: QrStyle,
    /// Centre logo for the jignasa style
    pub jignasa_logo: PathBuf,
    /// Centre logo for the vishwanath style
    pub vishwanath_logo: PathBuf,
    /// Print density written into saved images
    pub dpi: u16,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            style: QrStyle::Jignasa,
            jignasa_logo: PathBuf::from("assets/jignasa.png"),
            vishwanath_logo: PathBuf::from("assets/vishwanath.jpg"),
            dpi: 300,
        }
    }
}

impl QrOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(style) = env::var("QRDOC_QR_STYLE") {
            if let Ok(parsed) = style.parse::<QrStyle>() {
                self.style = parsed;
            }
        }
        if let Ok(logo) = env::var("QRDOC_JIGNASA_LOGO") {
            self.jignasa_logo = PathBuf::from(logo);
        }
        if let Ok(logo) = env::var("QRDOC_VISHWANATH_LOGO") {
            self.vishwanath_logo = PathBuf::from(logo);
        }
        if let Ok(dpi) = env::var("QRDOC_QR_DPI") {
            if let Ok(parsed) = dpi.parse::<u16>() {
                self.dpi = parsed.max(72);
            }
        }
    }

    /// Logo configured for a style, if the style uses one.
    pub fn logo_for(&self, style: QrStyle) -> Option<&Path> {
        match style {
            QrStyle::Simple => None,
            QrStyle::Jignasa => Some(self.jignasa_logo.as_path()),
            QrStyle::Vishwanath => Some(self.vishwanath_logo.as_path()),
        }
    }
}

/// DOCX to PDF conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Office converter executable invoked in headless mode
    pub converter: String,
    /// Folder scanned for `.docx` files
    pub input_dir: PathBuf,
    /// Folder receiving the PDFs
    pub output_dir: PathBuf,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            converter: "soffice".to_string(),
            input_dir: PathBuf::from("docs"),
            output_dir: PathBuf::from("final"),
        }
    }
}

impl PdfOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(converter) = env::var("QRDOC_SOFFICE") {
            if !converter.trim().is_empty() {
                self.converter = converter;
            }
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRDOC_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stderr logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRDOC_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRDOC_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRDOC_LOG_COLOR") {
            if let Some(parsed) = parse_flag(&color) {
                self.color = parsed;
            }
        }
        if let Ok(rotation) = env::var("QRDOC_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::from_str(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_monograph_layout() {
        let config = QrdocConfig::default();
        assert_eq!(config.batch.output_dir, PathBuf::from("monographs"));
        assert!(config.batch.unique_dir);
        assert_eq!(config.assets.dir, PathBuf::from("assets"));
        assert_eq!(config.pdf.output_dir, PathBuf::from("final"));
        assert_eq!(config.qr.dpi, 300);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = QrdocConfig::from_toml_str(
            r#"
            [batch]
            output_dir = "out"
            placeholder_style = "double"

            [qr]
            style = "vishwanath"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch.output_dir, PathBuf::from("out"));
        assert_eq!(config.batch.placeholder_style, PlaceholderStyle::Double);
        assert!(config.batch.unique_dir);
        assert_eq!(config.qr.style, QrStyle::Vishwanath);
        assert_eq!(config.assets.http_timeout_secs, 30);
    }

    #[test]
    fn logo_lookup_follows_style() {
        let options = QrOptions::default();
        assert!(options.logo_for(QrStyle::Simple).is_none());
        assert_eq!(
            options.logo_for(QrStyle::Vishwanath),
            Some(Path::new("assets/vishwanath.jpg"))
        );
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut options = AssetOptions::default();
        assert_eq!(options.http_timeout(), Some(Duration::from_secs(30)));
        options.http_timeout_secs = 0;
        assert_eq!(options.http_timeout(), None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrdoc.ini");
        fs::write(&path, "level=debug").unwrap();
        assert!(matches!(
            QrdocConfig::from_file(&path),
            Err(Error::Config(_))
        ));
    }
}
