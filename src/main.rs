//! QRDOC command line entrypoint

use clap::{Parser, Subcommand};
use qrdoc::output::{self, Rendered};
use qrdoc::{
    BatchDriver, BatchSettings, DriveAssets, LocalAssets, PdfConverter, QrAssets, QrStyle,
    QrStyler, QrdocConfig, RecordSet, Result, RoutedAssets, Template, combine_folder, logging,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrdoc",
    version,
    about = "Styled QR codes and CSV-driven Word document batches"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrdoc.{toml,yaml} in cwd/XDG config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one styled QR code to `<OUTPUT_NAME>.<jpg|png>`
    Qr {
        /// Output file name without extension
        output_name: String,
        /// Text or URL to encode
        content: String,
        /// QR style (simple, jignasa, vishwanath); defaults to the configured style
        #[arg(long)]
        style: Option<QrStyle>,
        /// Logo to stamp instead of the configured one
        #[arg(long, value_name = "PATH")]
        logo: Option<PathBuf>,
    },

    /// Fill a `{{column}}` template once per CSV row, with a QR code of the `url` column
    Merge {
        /// CSV with `name` and `url` columns
        csv: PathBuf,
        /// Word template with `{{column}}` and `{{qrcode}}` tokens
        template: PathBuf,
        /// QR style (jignasa, vishwanath, simple)
        style: QrStyle,
        /// Folder for the generated documents
        #[arg(long, value_name = "DIR", default_value = "docs")]
        output_dir: PathBuf,
    },

    /// Fill a `{column}` template once per CSV row, with an image from the `image` column
    Fill {
        /// Word template with `{column}` and `{image}` tokens
        template: PathBuf,
        /// CSV with a `filename` or `name` column
        csv: PathBuf,
        /// Base folder name; `monographs`, `monographs1`, ... when it already exists
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Folder local image references are resolved against
        #[arg(long, value_name = "DIR")]
        assets_dir: Option<PathBuf>,
    },

    /// Combine every .docx in a folder into one document
    Combine {
        /// Folder containing the documents
        folder: PathBuf,
        /// Combined document path
        #[arg(long, value_name = "FILE", default_value = qrdoc::combine::DEFAULT_OUTPUT)]
        output: PathBuf,
    },

    /// Convert every .docx in a folder to PDF with a headless office suite
    Pdf {
        /// Folder with the documents (default: configured, `docs`)
        input_dir: Option<PathBuf>,
        /// Folder for the PDFs (default: configured, `final`)
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            // Printing can only fail on a closed stdout; nothing left to report to.
            let _ = output::render_error(&e.to_string()).print(json);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = QrdocConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;

    let json = cli.json;
    match cli.command {
        Command::Qr {
            output_name,
            content,
            style,
            logo,
        } => {
            let style = style.unwrap_or(config.qr.style);
            let rendered = generate_qr(&config, style, logo.as_deref(), &output_name, &content)?;
            rendered.print(json)
        }
        Command::Merge {
            csv,
            template,
            style,
            output_dir,
        } => {
            let styler = QrStyler::new(style, config.qr.logo_for(style), config.qr.dpi)?;
            let driver = BatchDriver::new(BatchSettings::qr_merge(output_dir))
                .with_resolver(QrAssets::new(styler));
            run_batch(&driver, &csv, &template, json).await
        }
        Command::Fill {
            template,
            csv,
            output_dir,
            assets_dir,
        } => {
            let mut settings = BatchSettings::monographs(&config.batch);
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            let assets_dir = assets_dir.unwrap_or_else(|| config.assets.dir.clone());
            let remote = DriveAssets::new(
                config.assets.drive_endpoint.clone(),
                config.assets.http_timeout(),
            )?;
            let driver = BatchDriver::new(settings)
                .with_resolver(RoutedAssets::new(LocalAssets::new(assets_dir), remote));
            run_batch(&driver, &csv, &template, json).await
        }
        Command::Combine { folder, output } => {
            let report = combine_folder(&folder, &output)?;
            output::render_combine(&report).print(json)
        }
        Command::Pdf {
            input_dir,
            output_dir,
        } => {
            let input_dir = input_dir.unwrap_or_else(|| config.pdf.input_dir.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.pdf.output_dir.clone());
            let report = PdfConverter::new(config.pdf.converter.clone())
                .convert_folder(&input_dir, &output_dir)
                .await?;
            output::render_pdf(&report).print(json)
        }
    }
}

fn generate_qr(
    config: &QrdocConfig,
    style: QrStyle,
    logo: Option<&Path>,
    output_name: &str,
    content: &str,
) -> Result<Rendered> {
    let logo = logo.or_else(|| config.qr.logo_for(style));
    let styler = QrStyler::new(style, logo, config.qr.dpi)?;
    let image = styler.render(content)?;

    let path = PathBuf::from(format!("{output_name}.{}", style.extension()));
    styler.save(&image, &path)?;
    info!(path = %path.display(), %style, "Saved QR code");

    Ok(output::render_qr(&path, &style.to_string(), content))
}

async fn run_batch(driver: &BatchDriver, csv: &Path, template: &Path, json: bool) -> Result<()> {
    let template = Template::open(template)?;
    let records = RecordSet::from_path(csv)?;

    let report = driver
        .run_with(&template, &records, |outcome| {
            if !json {
                println!("{}", output::outcome_line(outcome));
            }
        })
        .await?;

    output::render_batch(&report, !json).print(json)
}
