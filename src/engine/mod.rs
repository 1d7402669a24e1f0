// ABOUTME: Engine facade that hosts construct, initialise, register templates on and render with
// ABOUTME: Owns the template store, helper registry and partial store for one engine instance

pub mod metadata;

use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::expr::EvalError;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::template::{HelperRegistry, Locals, PartialStore, RenderError, Renderer, Result};

pub use metadata::{EngineInfo, EngineMetadata, METADATA};

/// Construction input supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub config: Config,
    /// Base directory partial names are derived relative to.
    pub pages_path: PathBuf,
    /// Files loaded as partials during `initialise`.
    pub additional_templates: Vec<PathBuf>,
}

impl EngineOptions {
    pub fn new(pages_path: impl Into<PathBuf>) -> Self {
        Self {
            pages_path: pages_path.into(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_additional_templates<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.additional_templates = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-call options passed through by the host.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Log the partial-substituted body before compiling it.
    pub trace_body: bool,
}

/// What `initialise` loaded, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub helper_files: Vec<PathBuf>,
    pub partials: Vec<String>,
}

pub struct Engine {
    config: Config,
    pages_path: PathBuf,
    additional_templates: Vec<PathBuf>,
    templates: IndexMap<String, String>,
    partials: PartialStore,
    helpers: HelperRegistry,
    fs: Arc<dyn FileSystem>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_file_system(options, Arc::new(LocalFileSystem))
    }

    pub fn with_file_system(options: EngineOptions, fs: Arc<dyn FileSystem>) -> Self {
        debug!("Starting ES6 templates engine...");

        let helpers = if options.config.engines.es6.builtin_helpers {
            HelperRegistry::with_builtins()
        } else {
            HelperRegistry::new()
        };

        Self {
            config: options.config,
            pages_path: options.pages_path,
            additional_templates: options.additional_templates,
            templates: IndexMap::new(),
            partials: PartialStore::new(),
            helpers,
            fs,
        }
    }

    /// Load helper modules and partials.
    ///
    /// Must complete before the first `render`; both loads fail fast and any
    /// error is returned to the caller. Both loads go into fresh stores that are
    /// merged only once both succeed, so a failure leaves the engine untouched.
    pub async fn initialise(&mut self) -> Result<InitReport> {
        let helpers_path = self.config.helpers_path();
        let fs = Arc::clone(&self.fs);

        let mut staged_helpers = HelperRegistry::new();
        let mut staged_partials = PartialStore::new();
        let (helper_files, partials) = tokio::try_join!(
            staged_helpers.load(fs.as_ref(), &helpers_path),
            staged_partials.load(fs.as_ref(), &self.additional_templates, &self.pages_path),
        )?;

        self.helpers.merge(staged_helpers);
        self.partials.merge(staged_partials);

        debug!("helpers loaded {:?}", helper_files);
        debug!("partials loaded {:?}", partials);
        info!("ES6 templates initialised");

        Ok(InitReport {
            helper_files,
            partials,
        })
    }

    /// Register (or replace) a named template, returning the stored body.
    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) -> &str {
        let slot = self.templates.entry(name.into()).or_default();
        *slot = body.into();
        slot.as_str()
    }

    /// Render the template registered as `name`, or `body` when nothing is registered.
    pub fn render(
        &self,
        name: &str,
        body: Option<&str>,
        locals: &Locals,
        options: &RenderOptions,
    ) -> std::result::Result<String, RenderError> {
        let Some(source) = self.templates.get(name).map(String::as_str).or(body) else {
            return Err(RenderError::new(
                name,
                EvalError::UnknownTemplate(name.to_string()),
            ));
        };

        let renderer = self.core();
        let substituted = renderer.substitute_partials(source);
        if options.trace_body {
            debug!(template = name, body = %substituted, "Resolved template body");
        }
        renderer.render_source(name, &substituted, locals)
    }

    /// The renderer bound to this engine's helpers and partials.
    pub fn core(&self) -> Renderer<'_> {
        Renderer::new(&self.helpers, &self.partials)
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            engine: METADATA.handle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &IndexMap<String, String> {
        &self.templates
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    pub fn partials(&self) -> &PartialStore {
        &self.partials
    }

    pub fn partials_mut(&mut self) -> &mut PartialStore {
        &mut self.partials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::expr::Value;
    use crate::fs::DirectoryOptions;
    use crate::template::TemplateError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::path::Path;

    /// In-memory file system keyed by full path.
    #[derive(Default)]
    struct MemoryFs {
        files: BTreeMap<PathBuf, String>,
    }

    impl MemoryFs {
        fn with(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }
    }

    #[async_trait]
    impl FileSystem for MemoryFs {
        async fn read_directory(
            &self,
            path: &Path,
            options: &DirectoryOptions,
        ) -> Result<Vec<PathBuf>> {
            Ok(self
                .files
                .keys()
                .filter(|file| file.starts_with(path) && options.matches(file))
                .cloned()
                .collect())
        }

        async fn read_file(&self, path: &Path) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                TemplateError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
            })
        }
    }

    fn options(additional: &[&str]) -> EngineOptions {
        let mut config = Config::default();
        config.engines.es6.paths = PathsConfig {
            helpers: PathBuf::from("/app/helpers"),
        };
        EngineOptions::new("/app/pages")
            .with_config(config)
            .with_additional_templates(additional.iter().copied())
    }

    #[test]
    fn test_info_and_metadata() {
        let engine = Engine::new(EngineOptions::default());
        assert_eq!(engine.info(), EngineInfo { engine: "es6" });
        assert_eq!(METADATA.extensions, &[".js"]);
    }

    #[test]
    fn test_register_returns_stored_body() {
        let mut engine = Engine::new(EngineOptions::default());
        assert_eq!(engine.register("home", "v1"), "v1");
        assert_eq!(engine.register("home", "v2"), "v2");
        assert_eq!(engine.templates().len(), 1);
    }

    #[tokio::test]
    async fn test_initialise_loads_helpers_and_partials() {
        let fs = MemoryFs::default()
            .with("/app/helpers/format.yaml", "shout: \"s => upper(s) + '!'\"\n")
            .with("/app/pages/partials/header.js", "<h1>Site</h1>");
        let mut engine = Engine::with_file_system(
            options(&["/app/pages/partials/header.js"]),
            Arc::new(fs),
        );

        let report = engine.initialise().await.unwrap();
        assert_eq!(
            report.helper_files,
            vec![PathBuf::from("/app/helpers/format.yaml")]
        );
        assert_eq!(report.partials, vec!["partials_header".to_string()]);

        engine.register("page", "${partials_header}${shout(body)}");
        let locals = Locals::new().with("body", "hey");
        let output = engine
            .render("page", None, &locals, &RenderOptions::default())
            .unwrap();
        assert_eq!(output, "<h1>Site</h1>HEY!");
    }

    #[tokio::test]
    async fn test_initialise_propagates_partial_read_failure() {
        let fs = MemoryFs::default().with("/app/helpers/a.yaml", "x: \"1\"\n");
        let mut engine =
            Engine::with_file_system(options(&["/app/pages/missing.js"]), Arc::new(fs));
        let builtins = engine.helpers().len();

        let result = engine.initialise().await;
        assert!(matches!(result, Err(TemplateError::IoError { .. })));
        assert_eq!(engine.helpers().len(), builtins);
        assert!(!engine.helpers().contains("x"));
    }

    #[tokio::test]
    async fn test_initialise_keeps_partials_when_helpers_fail() {
        let fs = MemoryFs::default()
            .with("/app/helpers/bad.yaml", "x: \"(\"\n")
            .with("/app/pages/nav.js", "<nav/>");
        let mut engine =
            Engine::with_file_system(options(&["/app/pages/nav.js"]), Arc::new(fs));
        engine.partials_mut().insert("existing", "kept");

        let result = engine.initialise().await;
        assert!(matches!(result, Err(TemplateError::HelperModule { .. })));
        assert_eq!(engine.partials().len(), 1);
        assert!(!engine.partials().contains("nav"));
    }

    #[test]
    fn test_render_falls_back_to_body() {
        let engine = Engine::new(EngineOptions::default());
        let locals = Locals::new().with("n", Value::Number(2.0));
        let output = engine
            .render("inline", Some("${n * 21}"), &locals, &RenderOptions::default())
            .unwrap();
        assert_eq!(output, "42");
    }

    #[test]
    fn test_registered_template_wins_over_body() {
        let mut engine = Engine::new(EngineOptions::default());
        engine.register("page", "registered");
        let output = engine
            .render("page", Some("raw"), &Locals::new(), &RenderOptions::default())
            .unwrap();
        assert_eq!(output, "registered");
    }

    #[test]
    fn test_render_unknown_template() {
        let engine = Engine::new(EngineOptions::default());
        let err = engine
            .render("nowhere", None, &Locals::new(), &RenderOptions::default())
            .unwrap_err();
        assert_eq!(err.template_name, "nowhere");
        assert_eq!(err.cause, EvalError::UnknownTemplate("nowhere".to_string()));
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let mut config = Config::default();
        config.engines.es6.builtin_helpers = false;
        let engine = Engine::new(EngineOptions::default().with_config(config));
        assert!(engine.helpers().is_empty());
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
