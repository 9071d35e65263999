//! Corpus enumeration, validation and fingerprinting.

use crate::extractor::extract_document;
use crate::types::{Chunk, ChunkTag, EntityManifest, SourceDocument};
use manualqa_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// All `*.pdf` files directly inside `dir`, sorted by path.
pub fn list_pdfs(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "PDF directory does not exist: {:?}",
            dir
        )));
    }

    let mut pdfs: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    pdfs.sort();
    Ok(pdfs)
}

/// Whether a manual qualifies for the manifest.
pub fn is_valid(doc: &SourceDocument, marker_term: &str) -> bool {
    if doc.contains_term(marker_term) {
        tracing::info!("'{}' text found in '{}'", marker_term, doc.id);
        true
    } else {
        tracing::warn!(
            "Manual for '{}' lacks '{}' data; not listed as a machine",
            doc.id,
            marker_term
        );
        false
    }
}

/// Manifest of already-extracted manuals that contain the marker term.
pub fn manifest_from_documents(docs: &[SourceDocument], marker_term: &str) -> EntityManifest {
    EntityManifest::new(
        docs.iter()
            .filter(|doc| is_valid(doc, marker_term))
            .map(|doc| doc.id.clone()),
    )
}

/// Extract and validate every manual in `pdf_dir`.
///
/// Unreadable files are skipped like files without the marker term.
pub fn load_manifest(pdf_dir: &Path, marker_term: &str) -> AppResult<EntityManifest> {
    tracing::info!("Loading machines from {:?}", pdf_dir);

    let docs: Vec<SourceDocument> = list_pdfs(pdf_dir)?
        .iter()
        .filter_map(|path| extract_document(path))
        .collect();

    let manifest = manifest_from_documents(&docs, marker_term);
    tracing::info!("Total valid machines found: {}", manifest.len());
    Ok(manifest)
}

/// The always-included chunk listing every known machine.
pub fn manifest_chunk(manifest: &EntityManifest, label: &str) -> Chunk {
    let text = format!("{} Machines List:\n{}", label, manifest.names().join("\n"));
    Chunk::tagged(ChunkTag::MachineList, text)
}

/// SHA-256 over sorted file names, sizes and modification times.
pub fn corpus_fingerprint(pdfs: &[PathBuf]) -> AppResult<String> {
    let mut entries = Vec::with_capacity(pdfs.len());
    for path in pdfs {
        let meta = std::fs::metadata(path)?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        entries.push((name, meta.len(), modified));
    }
    entries.sort();

    let mut hasher = Sha256::new();
    for (name, size, modified) in &entries {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(size.to_le_bytes());
        hasher.update(modified.to_le_bytes());
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_pdfs_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Warrior.pdf"), b"x").unwrap();
        fs::write(temp.path().join("Aristo.PDF"), b"x").unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(temp.path().join("nested.pdf")).unwrap();

        let pdfs = list_pdfs(temp.path()).unwrap();
        let names: Vec<_> = pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Aristo.PDF", "Warrior.pdf"]);
    }

    #[test]
    fn test_list_pdfs_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(list_pdfs(&temp.path().join("absent")).is_err());
    }

    #[test]
    fn test_manifest_requires_marker_term() {
        let docs = vec![
            SourceDocument::from_pages("Warrior", vec!["Overall Dimensions: 1 m".to_string()]),
            SourceDocument::from_pages("Brochure", vec!["Buy now".to_string()]),
            SourceDocument::from_pages("Aristo", vec![String::new(), "DIMENSIONS".to_string()]),
        ];

        let manifest = manifest_from_documents(&docs, "dimensions");
        assert_eq!(manifest.names(), &["Aristo", "Warrior"]);
    }

    #[test]
    fn test_load_manifest_skips_unreadable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Broken.pdf"), b"not a pdf").unwrap();

        let manifest = load_manifest(temp.path(), "dimensions").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_manifest_chunk_text() {
        let manifest = EntityManifest::new(vec!["Renegade".to_string(), "Aristo".to_string()]);
        let chunk = manifest_chunk(&manifest, "ESAB");
        assert_eq!(chunk.text, "ESAB Machines List:\nAristo\nRenegade");
        assert_eq!(chunk.metadata.source, Some(ChunkTag::MachineList));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Warrior.pdf");
        fs::write(&path, b"one").unwrap();
        let pdfs = vec![path.clone()];

        let first = corpus_fingerprint(&pdfs).unwrap();
        assert_eq!(first, corpus_fingerprint(&pdfs).unwrap());
        assert_eq!(first.len(), 64);

        fs::write(&path, b"a longer body").unwrap();
        assert_ne!(first, corpus_fingerprint(&pdfs).unwrap());
    }
}
