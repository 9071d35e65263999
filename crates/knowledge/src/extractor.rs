//! PDF page text and table extraction.
//!
//! `pdf-extract` handles font encodings best but can panic on malformed
//! files, so it runs under `catch_unwind` with `lopdf` as the fallback.
//! Neither backend models tables; tables are recovered from the page text
//! by column alignment (see [`detect_tables`]).

use crate::types::{SourceDocument, TableGrid};
use manualqa_core::{AppError, AppResult};
use std::path::Path;

/// Extract one manual.
///
/// Returns `None` when the file cannot be read by either backend; the
/// failure is logged and the caller skips the source.
pub fn extract_document(path: &Path) -> Option<SourceDocument> {
    let id = source_id(path)?;

    match read_pages(path) {
        Ok(pages) => {
            tracing::debug!("Extracted {} page(s) from '{}'", pages.len(), id);
            Some(SourceDocument::from_pages(id, pages))
        }
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    }
}

/// Machine name for a manual: its file stem.
pub fn source_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Read page texts in order, empty string for pages without text.
pub fn read_pages(path: &Path) -> AppResult<Vec<String>> {
    let id = source_id(path).unwrap_or_else(|| path.display().to_string());

    let primary = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(path)
    }));

    let reason = match primary {
        Ok(Ok(pages)) => return Ok(pages),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
    };

    tracing::warn!("pdf-extract failed for '{}', trying lopdf: {}", id, reason);

    read_pages_via_lopdf(path).map_err(|message| AppError::Ingestion {
        source_id: id,
        message,
    })
}

fn read_pages_via_lopdf(path: &Path) -> Result<Vec<String>, String> {
    let doc = lopdf::Document::load(path).map_err(|e| format!("Failed to load PDF: {}", e))?;

    // get_pages is keyed by 1-based page number in document order.
    let pages = doc
        .get_pages()
        .keys()
        .map(|&number| doc.extract_text(&[number]).unwrap_or_default())
        .collect();

    Ok(pages)
}

fn split_cells(line: &str) -> Option<Vec<String>> {
    let cells: Vec<String> = line
        .replace('\t', "  ")
        .split("  ")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    (cells.len() >= 2).then_some(cells)
}

/// Recover tables from page text.
///
/// A maximal run of at least two consecutive lines that each split into two
/// or more cells (on tabs or runs of two or more spaces) forms one table.
/// The first line is the header; shorter rows are padded with `""`.
pub fn detect_tables(page_text: &str) -> Vec<TableGrid> {
    let mut tables = Vec::new();
    let mut run: TableGrid = Vec::new();

    for line in page_text.lines() {
        match split_cells(line) {
            Some(cells) => run.push(cells),
            None => flush_run(&mut run, &mut tables),
        }
    }
    flush_run(&mut run, &mut tables);

    tables
}

fn flush_run(run: &mut TableGrid, tables: &mut Vec<TableGrid>) {
    if run.len() >= 2 {
        tables.push(pad_rows(std::mem::take(run)));
    } else {
        run.clear();
    }
}

/// Pad every row to the header width with empty cells.
pub fn pad_rows(mut grid: TableGrid) -> TableGrid {
    let width = grid.first().map(Vec::len).unwrap_or(0);
    for row in grid.iter_mut().skip(1) {
        if row.len() < width {
            row.resize(width, String::new());
        }
    }
    grid
}
