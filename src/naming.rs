//! Where a book's audio and text live on disk, and how unit filenames are built.
//!
//! Discovery, companion-text lookup and recheck path reconstruction all go
//! through one [`UnitLayout`], so they always agree on the convention.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Result;

/// One audio/text pair, identified by chapter and section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUnit {
    pub book_id: String,
    pub chapter_id: String,
    pub section_id: String,
    pub audio_path: PathBuf,
}

impl AudioUnit {
    /// Build a unit from an audio path whose filename follows the
    /// `<prefix>_<book>_<chapter>_<section>.<ext>` convention.
    pub fn from_path(audio_path: &Path, book_id: &str) -> Option<Self> {
        let filename = audio_path.file_name()?.to_string_lossy();
        let (chapter_id, section_id) = parse_unit_ids(&filename)?;
        Some(Self {
            book_id: book_id.to_string(),
            chapter_id,
            section_id,
            audio_path: audio_path.to_path_buf(),
        })
    }

    pub fn filename(&self) -> String {
        self.audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Extract `(chapter_id, section_id)` from an audio filename.
///
/// The name is split on `_`; at least four parts are required. Part 2 is the
/// chapter, part 3 up to its first `.` is the section.
pub fn parse_unit_ids(filename: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = filename.split('_').collect();
    if parts.len() < 4 {
        return None;
    }

    let chapter_id = parts[2];
    let section_id = parts[3].split('.').next().unwrap_or_default();

    Some((chapter_id.to_string(), section_id.to_string()))
}

/// Maps unit identifiers to files, and enumerates a book's audio.
pub trait UnitLayout: Send + Sync {
    fn audio_path(&self, book_id: &str, chapter_id: &str, section_id: &str) -> PathBuf;

    /// Companion text for a unit. The file may not exist.
    fn text_path(&self, book_id: &str, chapter_id: &str, section_id: &str) -> PathBuf;

    /// Every audio file of the book, sorted by filename.
    fn list_audio_files(&self, book_id: &str) -> Result<Vec<PathBuf>>;
}

/// `<root>/<book>/audio/<prefix>_<book>_<chapter>_<section>.<ext>` next to
/// `<root>/<book>/txt/clean_text_<chapter>_<section>.txt`.
#[derive(Debug, Clone)]
pub struct BookLayout {
    root: PathBuf,
    audio_prefix: String,
    audio_extension: String,
}

impl BookLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            audio_prefix: "gutenberg".to_string(),
            audio_extension: "mp3".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.books_root)
            .with_prefix(&config.audio_prefix)
            .with_extension(&config.audio_extension)
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.audio_prefix = prefix.to_string();
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.audio_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn audio_dir(&self, book_id: &str) -> PathBuf {
        self.root.join(book_id).join("audio")
    }

    pub fn text_dir(&self, book_id: &str) -> PathBuf {
        self.root.join(book_id).join("txt")
    }

    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                ext.to_string_lossy()
                    .eq_ignore_ascii_case(&self.audio_extension)
            })
            .unwrap_or(false)
    }
}

impl UnitLayout for BookLayout {
    fn audio_path(&self, book_id: &str, chapter_id: &str, section_id: &str) -> PathBuf {
        self.audio_dir(book_id).join(format!(
            "{}_{}_{}_{}.{}",
            self.audio_prefix, book_id, chapter_id, section_id, self.audio_extension
        ))
    }

    fn text_path(&self, book_id: &str, chapter_id: &str, section_id: &str) -> PathBuf {
        self.text_dir(book_id)
            .join(format!("clean_text_{}_{}.txt", chapter_id, section_id))
    }

    fn list_audio_files(&self, book_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.audio_dir(book_id);
        if !dir.is_dir() {
            warn!("Audio directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("Failed to list {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && self.is_audio_file(path) {
                files.push(path.to_path_buf());
            }
        }

        debug!("Listed {} audio files in {}", files.len(), dir.display());
        Ok(files)
    }
}
