//! Index document assembly and atomic persistence.
//!
//! The writer owns the single shared output artifact: it merges preserved
//! fields from the previous document, sorts records for diffability, and
//! replaces the index in one atomic rename so a concurrently running
//! presentation layer never observes a partial document.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use mediadex_core::config::INDEX_FILE_NAME;
use mediadex_core::{Error, IndexDocument, IndexMetadata, MediaRecord, MediaStats};
use tracing::{debug, info, warn};

/// Writes the index document into an output directory.
pub struct IndexWriter {
    output_dir: PathBuf,
}

impl IndexWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path of the index document.
    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILE_NAME)
    }

    /// Load the previous document, if a parseable one exists.
    pub fn load_previous(&self) -> Option<IndexDocument> {
        let path = self.index_path();
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Ignoring unparseable previous index {}: {e}", path.display());
                None
            }
        }
    }

    /// Assemble and atomically persist the document.
    ///
    /// Records are sorted by relative path, enrichment fields are carried
    /// over from the previous document, and the JSON is written to a
    /// temporary file in the output directory before being renamed over the
    /// well-known path.
    pub fn write(
        &self,
        mut records: Vec<MediaRecord>,
        source_volume: &str,
    ) -> mediadex_core::Result<IndexDocument> {
        std::fs::create_dir_all(&self.output_dir)?;

        if let Some(previous) = self.load_previous() {
            carry_drive_links(&mut records, &previous);
        }

        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let stats = MediaStats::from_records(&records);
        let document = IndexDocument {
            metadata: IndexMetadata {
                generated_at: Utc::now(),
                source_volume: source_volume.to_string(),
                total_files: records.len() as u64,
                stats,
            },
            files: records,
        };

        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| Error::index(format!("serialization failed: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.output_dir)?;
        tmp.write_all(&json)?;
        tmp.persist(self.index_path())
            .map_err(|e| Error::index(format!("atomic replace failed: {e}")))?;

        info!(
            "Wrote index with {} files to {}",
            document.files.len(),
            self.index_path().display()
        );
        Ok(document)
    }
}

/// Preserve `googleDrive` enrichment from a previous document, keyed by
/// relative path. The scanner never populates this field itself.
fn carry_drive_links(records: &mut [MediaRecord], previous: &IndexDocument) {
    let known: HashMap<&str, &MediaRecord> = previous
        .files
        .iter()
        .filter(|r| r.google_drive.is_populated())
        .map(|r| (r.relative_path.as_str(), r))
        .collect();

    if known.is_empty() {
        return;
    }

    let mut carried = 0usize;
    for record in records.iter_mut() {
        if let Some(prior) = known.get(record.relative_path.as_str()) {
            record.google_drive = prior.google_drive.clone();
            carried += 1;
        }
    }
    debug!("Carried {carried} drive links from previous index");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_core::{DriveLink, MediaKind, MediaMetadata, Resolution, Thumbnails};
    use std::path::Path;

    fn record(rel: &str, kind: MediaKind) -> MediaRecord {
        MediaRecord {
            id: mediadex_core::media::record_id(Path::new(rel)),
            kind,
            relative_path: rel.to_string(),
            file_name: rel.rsplit('/').next().unwrap_or(rel).to_string(),
            metadata: MediaMetadata {
                creation_date: None,
                file_size: 1,
                resolution: Resolution::default(),
                duration: None,
                format: String::new(),
            },
            thumbnails: Thumbnails::default(),
            google_drive: DriveLink::default(),
        }
    }

    #[test]
    fn write_produces_sorted_parseable_document() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());

        let records = vec![
            record("z/last.mp4", MediaKind::Video),
            record("a/first.jpg", MediaKind::Image),
            record("m/middle.mp3", MediaKind::Audio),
        ];
        let doc = writer.write(records, "/mnt/media").unwrap();

        assert_eq!(doc.files[0].relative_path, "a/first.jpg");
        assert_eq!(doc.files[2].relative_path, "z/last.mp4");
        assert_eq!(doc.metadata.stats.images, 1);
        assert_eq!(doc.metadata.stats.videos, 1);
        assert_eq!(doc.metadata.stats.audio, 1);
        assert_eq!(doc.metadata.total_files, 3);

        let reloaded = writer.load_previous().unwrap();
        assert_eq!(reloaded.files.len(), 3);
        assert_eq!(reloaded.metadata.source_volume, "/mnt/media");
    }

    #[test]
    fn stats_match_record_counts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());
        let records = vec![
            record("a.jpg", MediaKind::Image),
            record("b.jpg", MediaKind::Image),
            record("c.mp4", MediaKind::Video),
        ];
        let doc = writer.write(records, "vol").unwrap();
        assert_eq!(
            doc.metadata.stats.total(),
            doc.files.len() as u64
        );
    }

    #[test]
    fn drive_links_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());

        // First run, then an out-of-scope enrichment step fills in a link.
        let mut enriched = record("a/first.jpg", MediaKind::Image);
        enriched.google_drive = DriveLink {
            url: "https://drive.example/d/123".into(),
            file_id: "123".into(),
        };
        writer
            .write(vec![enriched, record("b.mp4", MediaKind::Video)], "vol")
            .unwrap();

        // Second run starts from scratch; the link must be carried over.
        let doc = writer
            .write(
                vec![record("a/first.jpg", MediaKind::Image), record("b.mp4", MediaKind::Video)],
                "vol",
            )
            .unwrap();

        let first = doc
            .files
            .iter()
            .find(|r| r.relative_path == "a/first.jpg")
            .unwrap();
        assert_eq!(first.google_drive.url, "https://drive.example/d/123");
        assert_eq!(first.google_drive.file_id, "123");

        let second = doc
            .files
            .iter()
            .find(|r| r.relative_path == "b.mp4")
            .unwrap();
        assert!(!second.google_drive.is_populated());
    }

    #[test]
    fn unparseable_previous_index_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());
        std::fs::write(writer.index_path(), b"{ not json").unwrap();

        assert!(writer.load_previous().is_none());
        // Writing over garbage still succeeds.
        let doc = writer.write(vec![record("a.jpg", MediaKind::Image)], "vol").unwrap();
        assert_eq!(doc.files.len(), 1);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());
        writer.write(vec![record("a.jpg", MediaKind::Image)], "vol").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec![INDEX_FILE_NAME.to_string()]);
    }

    #[test]
    fn ids_unique_in_document() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(dir.path());
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("dir/{i}.jpg"), MediaKind::Image))
            .collect();
        let doc = writer.write(records, "vol").unwrap();

        let mut ids: Vec<_> = doc.files.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), doc.files.len());
    }
}
