// ABOUTME: Integration tests for the engine facade lifecycle
// ABOUTME: Covers initialise, register and render against real files on disk

use es6_templates::{
    Engine, EvalError, Locals, RenderError, RenderOptions, TemplateError, Value, METADATA,
};
use serde_json::json;

mod common;
use common::TestSite;

fn render(engine: &Engine, name: &str, locals: &Locals) -> Result<String, RenderError> {
    engine.render(name, None, locals, &RenderOptions::default())
}

#[tokio::test]
async fn test_partial_substitution() {
    let site = TestSite::new()
        .await
        .with_partial("name_partial.js", "World")
        .await;
    let mut engine = site.engine().await;

    engine.register("hello", "Hello ${name_partial}!");
    assert_eq!(render(&engine, "hello", &Locals::new()).unwrap(), "Hello World!");
}

#[tokio::test]
async fn test_nested_partial_name_derivation() {
    let site = TestSite::new()
        .await
        .with_partial("sub/dir/page.js", "deep")
        .await;
    let mut engine = site.engine().await;

    assert_eq!(engine.partials().get("sub_dir_page"), Some("deep"));
    engine.register("t", "[${sub_dir_page}]");
    assert_eq!(render(&engine, "t", &Locals::new()).unwrap(), "[deep]");
}

#[tokio::test]
async fn test_partials_are_not_expanded_recursively() {
    let site = TestSite::new()
        .await
        .with_partial("a.js", "[${b}]")
        .await
        .with_partial("b.js", "B")
        .await;
    let mut engine = site.engine().await;

    engine.register("t", "${a}");
    assert_eq!(render(&engine, "t", &Locals::new()).unwrap(), "[${b}]");
    assert_eq!(engine.core().substitute_partials("${a}"), r"[\${b}]");
}

#[tokio::test]
async fn test_partial_content_is_not_evaluated() {
    let site = TestSite::new()
        .await
        .with_partial("a.js", r#"<${b}> `code` \n "q" 'q'"#)
        .await;
    let mut engine = site.engine().await;

    engine.register("t", "${a}");
    let locals = Locals::new().with("b", "local-b");
    assert_eq!(
        render(&engine, "t", &locals).unwrap(),
        r#"<${b}> `code` \n "q" 'q'"#
    );
}

#[tokio::test]
async fn test_conditional_partial_include() {
    let site = TestSite::new()
        .await
        .with_partial("nav.js", "<nav>'home'</nav>")
        .await;
    let mut engine = site.engine().await;

    engine.register("page", "${show ? `${nav}` : ''}<main/>");
    let shown = render(&engine, "page", &Locals::new().with("show", true)).unwrap();
    assert_eq!(shown, "<nav>'home'</nav><main/>");
    let hidden = render(&engine, "page", &Locals::new().with("show", false)).unwrap();
    assert_eq!(hidden, "<main/>");
}

#[tokio::test]
async fn test_helper_modules_are_callable() {
    let site = TestSite::new()
        .await
        .with_helper_module(
            "format.yaml",
            r#"
shout: "(text) => upper(text) + '!'"
site_name: "'Acme'"
"#,
        )
        .await
        .with_helper_module(
            "nested/links.yml",
            r#"link: "(href, label) => `<a href=\"${href}\">${label}</a>`""#,
        )
        .await;
    let mut engine = site.engine().await;

    engine.register("t", "${site_name}: ${shout('hi')} ${link('/x', 'X')}");
    assert_eq!(
        render(&engine, "t", &Locals::new()).unwrap(),
        "Acme: HI! <a href=\"/x\">X</a>"
    );
}

#[tokio::test]
async fn test_helper_collision_last_write_wins() {
    let site = TestSite::new()
        .await
        .without_builtins()
        .with_helper_module("a.yaml", "fmt: \"x => 'first ' + x\"\n")
        .await
        .with_helper_module("b.yaml", "fmt: \"x => 'second ' + x\"\n")
        .await;
    let mut engine = site.engine().await;

    assert_eq!(engine.helpers().len(), 1);
    engine.register("t", "${fmt(1)}");
    assert_eq!(render(&engine, "t", &Locals::new()).unwrap(), "second 1");
}

#[tokio::test]
async fn test_locals_override_helpers() {
    let site = TestSite::new()
        .await
        .with_helper_module("greet.yaml", "greet: \"() => 'hi'\"\n")
        .await;
    let mut engine = site.engine().await;
    engine.register("t", "${greet()}");

    assert_eq!(render(&engine, "t", &Locals::new()).unwrap(), "hi");

    let locals = Locals::new().with_fn("greet", |_| Ok(Value::from("yo")));
    assert_eq!(render(&engine, "t", &locals).unwrap(), "yo");
}

#[tokio::test]
async fn test_undefined_identifier_is_structured_error() {
    let site = TestSite::new().await;
    let mut engine = site.engine().await;
    engine.register("missing-page", "${missing}");

    let err = render(&engine, "missing-page", &Locals::new()).unwrap_err();
    assert_eq!(err.template_name, "missing-page");
    assert_eq!(err.engine_name, "web-es6-templates");
    assert_eq!(err.cause, EvalError::UndefinedVariable("missing".to_string()));
}

#[tokio::test]
async fn test_render_is_idempotent() {
    let site = TestSite::new()
        .await
        .with_partial("footer.js", "<footer>Acme</footer>")
        .await;
    let mut engine = site.engine().await;
    engine.register("page", "${title.toUpperCase()} ${year}${footer}");

    let locals = Locals::from(json!({"title": "docs", "year": 2024}));
    let first = render(&engine, "page", &locals).unwrap();
    let second = render(&engine, "page", &locals).unwrap();
    assert_eq!(first, "DOCS 2024<footer>Acme</footer>");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_helpers_directory_fails_initialise() {
    let site = TestSite::new().await;
    let mut options = site.options();
    options.config.engines.es6.paths.helpers = site.dir.path().join("no-such-dir");

    let mut engine = Engine::new(options);
    let result = engine.initialise().await;
    assert!(matches!(result, Err(TemplateError::WalkError(_))));
}

#[tokio::test]
async fn test_missing_partial_fails_initialise() {
    let site = TestSite::new()
        .await
        .with_partial("ok.js", "ok")
        .await
        .with_helper_module("site.yaml", "site_name: \"'Acme'\"\n")
        .await
        .with_missing_partial("gone.js");

    let mut engine = Engine::new(site.options());
    let builtins = engine.helpers().len();
    let result = engine.initialise().await;
    assert!(matches!(result, Err(TemplateError::IoError { .. })));
    assert!(engine.partials().is_empty());
    assert_eq!(engine.helpers().len(), builtins);
    assert!(!engine.helpers().contains("site_name"));
}

#[tokio::test]
async fn test_broken_helper_module_fails_initialise() {
    let site = TestSite::new()
        .await
        .with_helper_module("broken.yaml", "oops: \"(a, => a\"\n")
        .await;

    let mut engine = Engine::new(site.options());
    match engine.initialise().await {
        Err(TemplateError::HelperModule { path, .. }) => {
            assert!(path.ends_with("broken.yaml"));
        }
        other => panic!("expected helper module error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_engines_do_not_share_helpers() {
    let site = TestSite::new().await;
    let mut first = site.engine().await;
    let second = site.engine().await;

    first
        .helpers_mut()
        .register_fn("only_first", |_| Ok(Value::from(true)));
    assert!(first.helpers().contains("only_first"));
    assert!(!second.helpers().contains("only_first"));
}

#[test]
fn test_metadata() {
    assert_eq!(METADATA.handle, "es6");
    assert!(METADATA.extensions.contains(&".js"));
}
