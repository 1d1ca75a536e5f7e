//! CSV destinations.
//!
//! Every CSV output follows the same rules: the path must end in `.csv`, the
//! file must not exist yet (no overwrite, no append), and each headline is one
//! line as produced by [`News::to_csv_line`] followed by `\n`. There is no
//! header row.

use crate::error::{NewsError, Result};
use crate::models::News;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Required suffix of every destination path.
pub const CSV_SUFFIX: &str = ".csv";

/// Reject paths that do not end in `.csv`.
///
/// # Arguments
///
/// * `path` - Destination to check; the comparison is case-sensitive
///
/// # Errors
///
/// [`NewsError::Destination`] with `path must end with .csv`.
pub fn check_destination(path: &Path) -> Result<()> {
    if path.to_string_lossy().ends_with(CSV_SUFFIX) {
        Ok(())
    } else {
        Err(NewsError::destination("path must end with .csv"))
    }
}

/// Create a fresh CSV file. Existing targets are never opened for writing.
///
/// # Arguments
///
/// * `path` - Destination of the new file
///
/// # Returns
///
/// The newly created, empty file opened for writing.
///
/// # Errors
///
/// [`NewsError::Destination`] for a wrong suffix, an existing target
/// (`target already exists`) or any other creation failure.
pub async fn create_destination(path: &Path) -> Result<File> {
    check_destination(path)?;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => NewsError::destination("target already exists"),
            _ => NewsError::destination(format!("cannot create {}: {e}", path.display())),
        })
}

/// Render headlines as CSV text, one terminated line each.
///
/// # Arguments
///
/// * `news` - Headlines in output order
///
/// # Returns
///
/// The file contents, empty for no headlines.
pub fn render<'a>(news: impl IntoIterator<Item = &'a News>) -> String {
    news.into_iter().fold(String::new(), |mut out, item| {
        out.push_str(&item.to_csv_line());
        out.push('\n');
        out
    })
}

/// Write `news` to a new CSV file in one go.
///
/// # Arguments
///
/// * `path` - Destination, same rules as [`create_destination`]
/// * `news` - Headlines to write, in order
///
/// # Errors
///
/// [`NewsError::Destination`] if the file cannot be created or written.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), count = news.len()))]
pub async fn save_news(path: impl AsRef<Path>, news: &[News]) -> Result<()> {
    let path = path.as_ref();
    let mut file = create_destination(path).await?;
    let write_failed =
        |e: std::io::Error| NewsError::destination(format!("write to {} failed: {e}", path.display()));
    file.write_all(render(news).as_bytes())
        .await
        .map_err(write_failed)?;
    file.flush().await.map_err(write_failed)?;
    info!("Saved news to CSV");
    Ok(())
}
