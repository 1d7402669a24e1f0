// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builds throwaway site directories with pages, partials and helper modules

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use es6_templates::config::PathsConfig;
use es6_templates::{Config, Engine, EngineOptions};

/// A temporary site layout: `<root>/pages` for partials, `<root>/helpers` for modules.
pub struct TestSite {
    pub dir: TempDir,
    partials: Vec<PathBuf>,
    builtin_helpers: bool,
}

impl TestSite {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pages")).await.unwrap();
        fs::create_dir_all(dir.path().join("helpers")).await.unwrap();
        Self {
            dir,
            partials: Vec::new(),
            builtin_helpers: true,
        }
    }

    pub fn pages_path(&self) -> PathBuf {
        self.dir.path().join("pages")
    }

    pub fn helpers_path(&self) -> PathBuf {
        self.dir.path().join("helpers")
    }

    pub fn without_builtins(mut self) -> Self {
        self.builtin_helpers = false;
        self
    }

    /// Write a partial under `pages/` and register it for loading.
    pub async fn with_partial(mut self, relative: &str, content: &str) -> Self {
        let path = self.pages_path().join(relative);
        write_file(&path, content).await;
        self.partials.push(path);
        self
    }

    /// Register a partial path that does not exist on disk.
    pub fn with_missing_partial(mut self, relative: &str) -> Self {
        self.partials.push(self.pages_path().join(relative));
        self
    }

    pub async fn with_helper_module(self, relative: &str, content: &str) -> Self {
        write_file(&self.helpers_path().join(relative), content).await;
        self
    }

    pub fn options(&self) -> EngineOptions {
        let mut config = Config::default();
        config.engines.es6.paths = PathsConfig {
            helpers: self.helpers_path(),
        };
        config.engines.es6.builtin_helpers = self.builtin_helpers;

        EngineOptions::new(self.pages_path())
            .with_config(config)
            .with_additional_templates(self.partials.clone())
    }

    pub async fn engine(&self) -> Engine {
        let mut engine = Engine::new(self.options());
        engine.initialise().await.unwrap();
        engine
    }
}

pub async fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.unwrap();
    }
    fs::write(path, content).await.unwrap();
}
