// ABOUTME: File-system collaborator used to discover helper modules and read partials
// ABOUTME: Defines an async trait with a walkdir and tokio-backed local implementation

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::template::error::{Result, TemplateError};

/// Filters applied when enumerating a directory.
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    /// Extensions to keep, with the leading dot (e.g. `.yaml`).
    pub extensions: Vec<String>,
    pub recursive: bool,
}

impl DirectoryOptions {
    pub fn new(extensions: &[&str], recursive: bool) -> Self {
        Self {
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
            recursive,
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.') == ext)
    }
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List files under `path` that pass `options`, in a stable order.
    async fn read_directory(&self, path: &Path, options: &DirectoryOptions) -> Result<Vec<PathBuf>>;

    async fn read_file(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_directory(&self, path: &Path, options: &DirectoryOptions) -> Result<Vec<PathBuf>> {
        let root = path.to_path_buf();
        let options = options.clone();

        // walkdir is blocking; keep it off the async worker threads
        let files = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let max_depth = if options.recursive { usize::MAX } else { 1 };
            let mut files = Vec::new();
            for entry in WalkDir::new(&root)
                .max_depth(max_depth)
                .sort_by_file_name()
            {
                let entry = entry?;
                if entry.file_type().is_file() && options.matches(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Ok(files)
        })
        .await
        .map_err(|e| TemplateError::io(path, std::io::Error::other(e)))??;

        debug!("Found {} files under {}", files.len(), path.display());
        Ok(files)
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TemplateError::io(path, e))
    }
}
