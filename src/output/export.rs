//! Export of stored results
//!
//! Renders the pages held in the result store into a single file in one of
//! the supported formats.

use crate::output::ExportFormat;
use crate::storage::StoredPage;
use crate::{CrawlerError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ExportRecord<'a> {
    url: &'a str,
    content: &'a str,
}

/// Renders pages in the given format
///
/// # Formats
///
/// - JSON: pretty-printed array of `{ url, content }`
/// - Markdown: one `# url` section per page, separated by `---`
/// - Text: one `URL: url` block per page, separated by `==========`
pub fn render(pages: &[StoredPage], format: ExportFormat) -> Result<String> {
    let rendered = match format {
        ExportFormat::Json => {
            let records: Vec<_> = pages
                .iter()
                .map(|page| ExportRecord {
                    url: &page.url,
                    content: &page.content,
                })
                .collect();
            serde_json::to_string_pretty(&records)?
        }
        ExportFormat::Markdown => pages
            .iter()
            .map(|page| format!("# {}\n\n{}\n\n---\n\n", page.url, page.content))
            .collect::<Vec<_>>()
            .join("\n"),
        ExportFormat::Text => pages
            .iter()
            .map(|page| format!("URL: {}\n\n{}\n\n==========\n\n", page.url, page.content))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(rendered)
}

/// Appends the format's extension to an export base path
pub fn export_path_for(base: &Path, format: ExportFormat) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(format.extension());
    PathBuf::from(path)
}

/// Writes pages to `{base}.{ext}`
///
/// # Returns
///
/// * `Ok(PathBuf)` - The file that was written
/// * `Err(CrawlerError::Validation)` - There are no pages to export
/// * `Err(CrawlerError)` - Rendering or writing failed
pub fn write_export(pages: &[StoredPage], format: ExportFormat, base: &Path) -> Result<PathBuf> {
    if pages.is_empty() {
        return Err(CrawlerError::Validation("no data to export".to_string()));
    }

    let path = export_path_for(base, format);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&path, render(pages, format)?)?;
    tracing::info!("Exported {} pages to {}", pages.len(), path.display());
    Ok(path)
}
