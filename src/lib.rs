//! QRDOC - styled QR codes and CSV-driven Word document batches
//!
//! This library backs the `qrdoc` command line tool: it renders branded QR
//! codes, fills DOCX templates once per CSV row, combines folders of
//! documents and hands them to a headless office suite for PDF conversion.
//!
//! # Features
//!
//! - **QR Styling**: circle modules, brand colours, centred logos, exact print sizes
//! - **Template Filling**: `{column}` / `{{column}}` tokens in paragraphs and tables
//! - **Image Assets**: local files, share-link downloads or per-row QR codes
//! - **Batch Output**: collision-free file and folder names, per-record reports
//!
//! # Example
//!
//! ```no_run
//! use qrdoc::{BatchDriver, BatchSettings, LocalAssets, QrdocConfig, RecordSet, Template};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> qrdoc::Result<()> {
//!     let config = QrdocConfig::load(None)?;
//!     let template = Template::open(Path::new("monograph.docx"))?;
//!     let records = RecordSet::from_path(Path::new("plants.csv"))?;
//!
//!     let report = BatchDriver::new(BatchSettings::monographs(&config.batch))
//!         .with_resolver(LocalAssets::new(&config.assets.dir))
//!         .run(&template, &records)
//!         .await?;
//!
//!     println!("{} documents saved", report.saved());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod assets;
pub mod batch;
pub mod combine;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pdf;
pub mod qr;
pub mod records;
pub mod template;

// Re-exports for convenience
pub use error::{AssetError, Error, Result};

pub use assets::{
    Asset, AssetOutcome, AssetResolver, DriveAssets, LocalAssets, QrAssets, RoutedAssets,
};
pub use batch::{BatchDriver, BatchReport, BatchSettings, RecordOutcome, RecordStatus};
pub use combine::{CombineReport, combine_folder};
pub use config::{LogRotation, LoggingOptions, QrdocConfig};
pub use pdf::{PdfConverter, PdfReport};
pub use qr::{QrEncoder, QrStyle, QrStyler};
pub use records::{Record, RecordSet};
pub use template::{PlaceholderStyle, Template, TemplateFiller};
