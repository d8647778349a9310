use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Documents directory {0} could not be read: {1}")]
    Directory(PathBuf, #[source] std::io::Error),

    #[error("No loadable documents found in {0}")]
    NoDocuments(PathBuf),
}

/// Raw text of one source file, identified by its file name.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

/// Loads every `.txt`, `.md` and `.pdf` file directly inside `dir`, sorted by file name.
/// Unreadable files are skipped with a warning; an empty result is an error.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>, LoadError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| LoadError::Directory(dir.to_path_buf(), e))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && document_kind(path).is_some())
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match read_document(&path) {
            Ok(text) if text.trim().is_empty() => {
                warn!("Skipping empty document {source}");
            }
            Ok(text) => documents.push(SourceDocument { source, text }),
            Err(e) => warn!("Skipping unreadable document {source}: {e}"),
        }
    }

    if documents.is_empty() {
        return Err(LoadError::NoDocuments(dir.to_path_buf()));
    }

    info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Pdf,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "txt" | "md" => Some(DocumentKind::Text),
        "pdf" => Some(DocumentKind::Pdf),
        _ => None,
    }
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    match document_kind(path) {
        Some(DocumentKind::Text) => Ok(std::fs::read_to_string(path)?),
        Some(DocumentKind::Pdf) => pdf_extract::extract_text(path)
            .map_err(|e| anyhow::anyhow!("PDF text extraction failed: {e}")),
        None => anyhow::bail!("unsupported document type: {}", path.display()),
    }
}
