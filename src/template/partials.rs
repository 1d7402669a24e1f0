// ABOUTME: Partial store holding reusable fragments keyed by path-derived names
// ABOUTME: Loads fragments from disk and substitutes `${name}` placeholders in one pass

use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::error::Result;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Default)]
pub struct PartialStore {
    partials: IndexMap<String, String>,
}

/// Derive a partial name: path relative to `base`, extension stripped, separators as `_`.
///
/// `pages/sub/dir/page.js` under `pages` becomes `sub_dir_page`. Paths outside
/// `base` keep their own normal components.
pub fn partial_name(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let stem = relative.with_extension("");

    stem.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}

impl PartialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let name = name.into();
        if self.partials.insert(name.clone(), content.into()).is_some() {
            debug!("Partial '{}' overridden", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.partials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(String::as_str)
    }

    /// Move every partial from `other` into this store; `other` wins on collision.
    pub fn merge(&mut self, other: PartialStore) {
        for (name, content) in other.partials {
            self.insert(name, content);
        }
    }

    /// Read every file in `paths` and store it under its derived name.
    ///
    /// A single unreadable file fails the whole load and leaves the store as it was.
    pub async fn load(
        &mut self,
        fs: &dyn FileSystem,
        paths: &[PathBuf],
        base: &Path,
    ) -> Result<Vec<String>> {
        let mut staged = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs.read_file(path).await?;
            staged.push((partial_name(path, base), content));
        }

        let names: Vec<String> = staged.iter().map(|(name, _)| name.clone()).collect();
        for (name, content) in staged {
            self.insert(name, content);
        }

        info!("Loaded {} partials", names.len());
        Ok(names)
    }

    /// Replace each `${name}` naming a partial with that partial's content.
    ///
    /// Every `${` in `body` is checked, including a `${nav}` nested inside a
    /// conditional expression. The scan runs once;
    /// inserted content is escaped so it renders as literal text and is never
    /// rescanned or evaluated. Escaped `\${name}` in `body` is left alone.
    pub fn substitute(&self, body: &str) -> String {
        if self.partials.is_empty() {
            return body.to_string();
        }

        let mut out = String::with_capacity(body.len());
        let mut rest = body;
        while let Some(pos) = rest.find(|c: char| c == '\\' || c == '$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with('\\') {
                let len = 1 + tail[1..].chars().next().map_or(0, char::len_utf8);
                out.push_str(&tail[..len]);
                rest = &tail[len..];
            } else if let Some((content, len)) = self.placeholder_at(tail) {
                escape_literal(content, &mut out);
                rest = &tail[len..];
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    /// The partial named by a `${name}` at the start of `text`, with the placeholder length.
    fn placeholder_at(&self, text: &str) -> Option<(&str, usize)> {
        let inner = text.strip_prefix("${")?;
        let end = inner.find('}')?;
        self.get(&inner[..end]).map(|content| (content, end + 3))
    }
}

/// Escape partial content so the expression parser reads it back as plain text,
/// whether it lands in the body, a nested template literal or a quoted string.
fn escape_literal(content: &str, out: &mut String) {
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '`' | '\'' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use crate::template::error::TemplateError;
    use tempfile::tempdir;

    #[test]
    fn test_partial_name_derivation() {
        let base = Path::new("/site/pages");
        assert_eq!(
            partial_name(Path::new("/site/pages/sub/dir/page.js"), base),
            "sub_dir_page"
        );
        assert_eq!(partial_name(Path::new("/site/pages/header.js"), base), "header");
        assert_eq!(partial_name(Path::new("/site/pages/footer"), base), "footer");
        assert_eq!(
            partial_name(Path::new("/other/shared/nav.js"), base),
            "other_shared_nav"
        );
    }

    #[test]
    fn test_substitute_partial() {
        let mut store = PartialStore::new();
        store.insert("name_partial", "World");
        assert_eq!(store.substitute("Hello ${name_partial}!"), "Hello World!");
    }

    #[test]
    fn test_substitute_leaves_other_placeholders() {
        let mut store = PartialStore::new();
        store.insert("header", "<h1>");
        assert_eq!(
            store.substitute("${header}${title} ${ header } ${x"),
            "<h1>${title} ${ header } ${x"
        );
    }

    #[test]
    fn test_substitute_is_not_recursive() {
        let mut store = PartialStore::new();
        store.insert("a", "[${b}]");
        store.insert("b", "B");
        assert_eq!(store.substitute("${a}"), r"[\${b}]");

        let mut reversed = PartialStore::new();
        reversed.insert("b", "B");
        reversed.insert("a", "[${b}]");
        assert_eq!(reversed.substitute("${a}${b}"), r"[\${b}]B");
    }

    #[test]
    fn test_substitute_inside_expression() {
        let mut store = PartialStore::new();
        store.insert("nav", "<nav/>");
        assert_eq!(
            store.substitute("${show ? `${nav}` : ''}"),
            "${show ? `<nav/>` : ''}"
        );
        assert_eq!(store.substitute("${show ? '${nav}' : ''}"), "${show ? '<nav/>' : ''}");
    }

    #[test]
    fn test_substitute_skips_escaped_placeholder() {
        let mut store = PartialStore::new();
        store.insert("nav", "<nav/>");
        assert_eq!(store.substitute(r"\${nav} ${nav}"), r"\${nav} <nav/>");
    }

    #[test]
    fn test_substituted_content_is_escaped() {
        let mut store = PartialStore::new();
        store.insert("snippet", r#"run `ls` in C:\tmp, cost $5, say "hi" ${x}"#);
        assert_eq!(
            store.substitute("${snippet}"),
            r#"run \`ls\` in C:\\tmp, cost $5, say \"hi\" \${x}"#
        );
    }

    #[tokio::test]
    async fn test_load_derives_names() {
        let dir = tempdir().unwrap();
        let pages = dir.path().join("pages");
        std::fs::create_dir_all(pages.join("partials")).unwrap();
        let header = pages.join("partials").join("header.js");
        std::fs::write(&header, "<header/>").unwrap();

        let mut store = PartialStore::new();
        let names = store
            .load(&LocalFileSystem, &[header], &pages)
            .await
            .unwrap();

        assert_eq!(names, vec!["partials_header".to_string()]);
        assert_eq!(store.get("partials_header"), Some("<header/>"));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_store_unchanged() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.js");
        std::fs::write(&good, "ok").unwrap();
        let missing = dir.path().join("missing.js");

        let mut store = PartialStore::new();
        let result = store
            .load(&LocalFileSystem, &[good, missing], dir.path())
            .await;

        assert!(matches!(result, Err(TemplateError::IoError { .. })));
        assert!(store.is_empty());
    }
}
