use crate::chunking::split_text;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{extract_document_text, PdfExtractor};
use crate::models::{ChunkMetadata, ChunkRecord, IngestionOptions};
use crate::traits::DocumentStore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn file_source_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })
}

/// Builds the chunk records for one document: ids are `{digest}_{index}` in
/// chunk order, every record carries the filename as its `source`.
pub fn chunk_records(digest: &str, source: &str, chunks: Vec<String>) -> Vec<ChunkRecord> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| ChunkRecord {
            chunk_id: format!("{digest}_{index}"),
            text,
            metadata: ChunkMetadata {
                source: source.to_string(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The filename was already present among stored sources.
    Skipped { source: String },
    Ingested { source: String, chunk_count: usize },
}

/// Ingests one PDF into the store.
///
/// The dedup key is the filename: if any stored chunk already carries it as
/// `source`, the file is skipped without reading its content. Otherwise the
/// text is extracted, chunked, embedded, and written in `batch_size` groups.
/// Any extraction or store error aborts this file's ingestion; partially
/// written batches are not rolled back.
pub async fn ingest_pdf(
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
    extractor: &dyn PdfExtractor,
    path: &Path,
    options: &IngestionOptions,
) -> Result<IngestOutcome, IngestError> {
    let source = file_source_name(path)?;

    let existing = store.list_sources().await?;
    if existing.contains(&source) {
        debug!(source = %source, "already ingested, skipping");
        return Ok(IngestOutcome::Skipped { source });
    }

    let digest = digest_file(path)?;
    let text = extract_document_text(extractor, path)?;
    let chunks = split_text(&text, (*options).into())?;

    if chunks.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "no text chunks produced from {}",
            path.display()
        )));
    }

    let records = chunk_records(&digest, &source, chunks);
    let batch_size = options.batch_size.max(1);

    for batch in records.chunks(batch_size) {
        let embeddings = batch
            .iter()
            .map(|record| embedder.embed(&record.text))
            .collect::<Vec<_>>();
        store.add_chunks(batch, &embeddings).await?;
    }

    info!(source = %source, chunk_count = records.len(), "ingested pdf");

    Ok(IngestOutcome::Ingested {
        source,
        chunk_count: records.len(),
    })
}

#[derive(Debug, Clone)]
pub struct IngestedPdf {
    pub source: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone)]
pub struct FailedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub ingested: Vec<IngestedPdf>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedPdf>,
}

/// Ingests every PDF under `folder`, best effort.
///
/// Per-file failures land in the report instead of aborting the run; an
/// empty folder yields an empty report.
pub async fn ingest_folder(
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
    extractor: &dyn PdfExtractor,
    folder: &Path,
    options: &IngestionOptions,
) -> IngestionReport {
    let mut report = IngestionReport::default();

    for path in discover_pdf_files(folder) {
        match ingest_pdf(store, embedder, extractor, &path, options).await {
            Ok(IngestOutcome::Ingested {
                source,
                chunk_count,
            }) => report.ingested.push(IngestedPdf {
                source,
                chunk_count,
            }),
            Ok(IngestOutcome::Skipped { source }) => report.skipped.push(source),
            Err(error) => report.failed.push(FailedPdf {
                path,
                reason: error.to_string(),
            }),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedNgramEmbedder;
    use crate::extractor::{LopdfExtractor, PageText};
    use crate::stores::MemoryStore;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedExtractor(String);

    impl PdfExtractor for FixedExtractor {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<PageText>, IngestError> {
            Ok(vec![PageText {
                number: 1,
                text: self.0.clone(),
            }])
        }
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.pdf"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"text"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.pdf");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn chunk_ids_follow_digest_and_order() {
        let records = chunk_records(
            "cafe",
            "a.pdf",
            vec!["one".to_string(), "two".to_string(), "three".to_string()],
        );

        let ids = records
            .iter()
            .map(|record| record.chunk_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["cafe_0", "cafe_1", "cafe_2"]);
        assert!(records
            .iter()
            .all(|record| record.metadata.source == "a.pdf"));
    }

    #[tokio::test]
    async fn ingestion_writes_chunks_with_source_metadata(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF-1.4\n%fake")?;

        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();
        let extractor = FixedExtractor("alpha beta gamma delta".to_string());

        let outcome = ingest_pdf(
            &store,
            &embedder,
            &extractor,
            &path,
            &IngestionOptions::default(),
        )
        .await?;

        assert!(matches!(
            outcome,
            IngestOutcome::Ingested { chunk_count: 1, .. }
        ));

        let sources = store.list_sources().await?;
        assert!(sources.contains("report.pdf"));
        Ok(())
    }

    #[tokio::test]
    async fn reingestion_of_known_source_is_a_noop() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF-1.4\n%fake")?;

        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();
        let extractor = FixedExtractor("alpha beta gamma".to_string());
        let options = IngestionOptions::default();

        ingest_pdf(&store, &embedder, &extractor, &path, &options).await?;

        // Change the content; the filename dedup must still win.
        fs::write(&path, b"%PDF-1.4\n%other")?;
        let second = ingest_pdf(&store, &embedder, &extractor, &path, &options).await?;
        assert_eq!(
            second,
            IngestOutcome::Skipped {
                source: "report.pdf".to_string()
            }
        );

        let stats = store.source_stats("report.pdf").await?.unwrap();
        assert_eq!(stats.chunk_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn small_batches_cover_all_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("long.pdf");
        fs::write(&path, b"%PDF-1.4\n%fake")?;

        let words = (0..30).map(|n| format!("w{n}")).collect::<Vec<_>>().join(" ");
        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();
        let extractor = FixedExtractor(words);
        let options = IngestionOptions {
            chunk_max_tokens: 4,
            chunk_overlap_tokens: 0,
            batch_size: 3,
        };

        let outcome = ingest_pdf(&store, &embedder, &extractor, &path, &options).await?;
        let IngestOutcome::Ingested { chunk_count, .. } = outcome else {
            panic!("expected ingestion");
        };

        let stats = store.source_stats("long.pdf").await?.unwrap();
        assert_eq!(stats.chunk_count, chunk_count);
        assert!(stats.has_embeddings);
        Ok(())
    }

    #[tokio::test]
    async fn folder_report_collects_failures() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;

        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();

        let report = ingest_folder(
            &store,
            &embedder,
            &LopdfExtractor,
            dir.path(),
            &IngestionOptions::default(),
        )
        .await;

        assert!(report.ingested.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.failed[0].path.file_name().and_then(|name| name.to_str()),
            Some("unreadable.pdf")
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_folder_yields_empty_report() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();

        let report = ingest_folder(
            &store,
            &embedder,
            &LopdfExtractor,
            dir.path(),
            &IngestionOptions::default(),
        )
        .await;

        assert!(report.ingested.is_empty());
        assert!(report.skipped.is_empty());
        assert!(report.failed.is_empty());
        Ok(())
    }
}
