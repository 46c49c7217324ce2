//! Upload queue for the admin dashboard.
//!
//! Files are picked by path, glob pattern or directory. Each accepted file
//! becomes a queue entry with editable metadata; publishing validates the
//! whole batch before anything reaches the catalog.

use anyhow::{anyhow, bail, Context as _, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::access::{run_gated, Action, Outcome};
use crate::gallery::{Catalog, Category, Image, ImageStatus, Qualities};
use crate::notice::Notice;
use crate::session::SessionController;

/// Extensions accepted as images, with their MIME types
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("avif", "image/avif"),
];

fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn is_pattern(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub path: PathBuf,
    /// `img-` plus a sha256 prefix of the file contents
    pub id: String,
    pub size: u64,
    /// `data:<mime>;base64,...`
    pub preview: String,
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

impl PendingUpload {
    fn from_file(path: &Path, mime: &str) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            id: format!("img-{}", &sha256(&bytes)[..12]),
            size: bytes.len() as u64,
            preview: format!(
                "data:{};base64,{}",
                mime,
                base64::engine::general_purpose::STANDARD.encode(&bytes)
            ),
            title,
            description: String::new(),
            category: None,
            tags: Vec::new(),
        })
    }

    /// Why this entry cannot be published, if anything
    fn problem(&self) -> Option<String> {
        let name = self.path.display();
        match (self.title.trim().is_empty(), self.category.is_none()) {
            (true, true) => Some(format!("{}: title and category are required", name)),
            (true, false) => Some(format!("{}: title is required", name)),
            (false, true) => Some(format!("{}: category is required", name)),
            (false, false) => None,
        }
    }
}

/// Files accepted and skipped by one `add` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: usize,
    /// Non-image files and duplicates
    pub skipped: Vec<PathBuf>,
}

/// Result of publishing the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub notice: Notice,
    /// (id, title) of each published image; empty when the batch failed
    pub images: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct UploadQueue {
    entries: Vec<PendingUpload>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PendingUpload] {
        &self.entries
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a file, every image under a directory, or every match of a glob
    pub fn add(&mut self, source: &str) -> Result<AddReport> {
        let mut report = AddReport::default();
        if is_pattern(source) {
            let matches = glob::glob(source).context("Invalid glob pattern")?;
            for entry in matches {
                let path = entry.context("Failed to read glob entry")?;
                if path.is_file() {
                    self.add_file(&path, &mut report)?;
                }
            }
            return Ok(report);
        }

        let path = Path::new(source);
        if path.is_dir() {
            let mut files: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            files.sort();
            for file in files {
                self.add_file(&file, &mut report)?;
            }
        } else if path.is_file() {
            self.add_file(path, &mut report)?;
        } else {
            bail!("No such file or directory: {}", source);
        }
        Ok(report)
    }

    fn add_file(&mut self, path: &Path, report: &mut AddReport) -> Result<()> {
        let Some(mime) = mime_type(path) else {
            report.skipped.push(path.to_path_buf());
            return Ok(());
        };
        let upload = PendingUpload::from_file(path, mime)?;
        if self.entries.iter().any(|e| e.id == upload.id) {
            report.skipped.push(path.to_path_buf());
            return Ok(());
        }
        self.entries.push(upload);
        report.added += 1;
        Ok(())
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut PendingUpload> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or_else(|| anyhow!("No upload #{} (queue has {})", index + 1, len))
    }

    pub fn set_title(&mut self, index: usize, title: &str) -> Result<()> {
        self.entry_mut(index)?.title = title.to_string();
        Ok(())
    }

    pub fn set_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.entry_mut(index)?.description = description.to_string();
        Ok(())
    }

    pub fn set_category(&mut self, index: usize, category: &str) -> Result<()> {
        let category =
            Category::from_str(category).ok_or_else(|| anyhow!("Unknown category: {}", category))?;
        self.entry_mut(index)?.category = Some(category);
        Ok(())
    }

    /// Blank tags are ignored
    pub fn add_tag(&mut self, index: usize, tag: &str) -> Result<()> {
        let entry = self.entry_mut(index)?;
        let tag = tag.trim();
        if !tag.is_empty() {
            entry.tags.push(tag.to_string());
        }
        Ok(())
    }

    pub fn remove_tag(&mut self, index: usize, tag_index: usize) -> Result<String> {
        let entry = self.entry_mut(index)?;
        if tag_index >= entry.tags.len() {
            bail!("No tag #{} on upload #{}", tag_index + 1, index + 1);
        }
        Ok(entry.tags.remove(tag_index))
    }

    pub fn remove(&mut self, index: usize) -> Result<PendingUpload> {
        self.entry_mut(index)?;
        Ok(self.entries.remove(index))
    }

    /// Publish every queued entry to the front of the catalog, in queue order.
    /// Any invalid entry fails the whole batch and the queue is kept.
    pub fn publish(
        &mut self,
        session: &mut SessionController,
        catalog: &mut Catalog,
        now: DateTime<Utc>,
    ) -> Result<Outcome<Published>> {
        run_gated(session, &Action::UploadImages, |session| {
            if self.entries.is_empty() {
                return Ok(failed("No images selected"));
            }
            let problems: Vec<String> = self.entries.iter().filter_map(|e| e.problem()).collect();
            if !problems.is_empty() {
                return Ok(failed(&problems.join("; ")));
            }
            if let Some(dup) = self.entries.iter().find(|e| catalog.get(&e.id).is_some()) {
                return Ok(failed(&format!(
                    "{}: already in the gallery",
                    dup.path.display()
                )));
            }

            let uploaded_by = session
                .user()
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Admin".to_string());
            let mut images = Vec::with_capacity(self.entries.len());
            for entry in self.entries.iter().rev() {
                let Some(category) = entry.category else {
                    continue;
                };
                catalog.insert_front(Image {
                    id: entry.id.clone(),
                    title: entry.title.trim().to_string(),
                    description: entry.description.clone(),
                    category,
                    image_url: entry.preview.clone(),
                    uploaded_by: uploaded_by.clone(),
                    uploaded_at: now,
                    downloads: 0,
                    likes: 0,
                    qualities: Qualities::uniform(&entry.preview),
                    status: ImageStatus::Published,
                    tags: entry.tags.clone(),
                })?;
                images.push((entry.id.clone(), entry.title.trim().to_string()));
            }
            images.reverse();

            let count = self.entries.len();
            self.entries.clear();
            Ok(Published {
                notice: Notice::new(
                    "Upload successful",
                    format!("{} image(s) uploaded successfully", count),
                ),
                images,
            })
        })
    }
}

fn failed(description: &str) -> Published {
    Published {
        notice: Notice::destructive("Upload failed", description),
        images: Vec::new(),
    }
}
