//! Debounced filesystem watcher for the ingestion folder.
//!
//! Events land on an explicit channel; the consumer loop drains them one at
//! a time and drives the same ingestion function as the batch path, keeping
//! the store single-writer.

use crate::error::IngestError;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use tracing::{debug, info};

/// Events emitted by the watcher.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A PDF appeared (or finished being written) in the watched folder.
    PdfDetected { path: PathBuf },
    /// The underlying notify backend reported an error.
    Error(String),
}

pub struct PdfWatcher {
    receiver: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    // Dropping the debouncer stops the watch thread.
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl PdfWatcher {
    /// Starts watching `folder` (non-recursive) with the given debounce.
    pub fn new(folder: &Path, debounce: Duration) -> Result<Self, IngestError> {
        let (tx, rx) = channel();

        let mut debouncer =
            new_debouncer(debounce, tx).map_err(|error| IngestError::Watch(error.to_string()))?;

        debouncer
            .watcher()
            .watch(folder, RecursiveMode::NonRecursive)
            .map_err(|error| IngestError::Watch(error.to_string()))?;

        info!(folder = %folder.display(), "watching for new pdfs");

        Ok(Self {
            receiver: rx,
            _debouncer: debouncer,
        })
    }

    /// Blocks until the next batch of events; `None` once the watch thread
    /// has shut down.
    pub fn next_events(&self) -> Option<Vec<WatchEvent>> {
        match self.receiver.recv() {
            Ok(Ok(debounced)) => Some(
                debounced
                    .into_iter()
                    .filter_map(|event| pdf_event(&event.path))
                    .collect(),
            ),
            Ok(Err(error)) => Some(vec![WatchEvent::Error(error.to_string())]),
            Err(_) => None,
        }
    }
}

fn pdf_event(path: &Path) -> Option<WatchEvent> {
    if !is_pdf_path(path) {
        debug!(path = %path.display(), "ignoring non-pdf event");
        return None;
    }

    // Deletions also debounce through here; only surface files that exist.
    if !path.is_file() {
        return None;
    }

    Some(WatchEvent::PdfDetected {
        path: path.to_path_buf(),
    })
}

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check_is_case_insensitive() {
        assert!(is_pdf_path(Path::new("/books/manual.pdf")));
        assert!(is_pdf_path(Path::new("/books/MANUAL.PDF")));
        assert!(!is_pdf_path(Path::new("/books/manual.txt")));
        assert!(!is_pdf_path(Path::new("/books/pdf")));
    }

    #[test]
    fn missing_files_produce_no_event() {
        assert!(pdf_event(Path::new("/definitely/not/here.pdf")).is_none());
    }

    #[test]
    fn existing_pdf_produces_detection_event() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("new.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%fake")?;

        let event = pdf_event(&path);
        assert!(matches!(event, Some(WatchEvent::PdfDetected { .. })));
        Ok(())
    }
}
