use serde_json::json;
use std::fs;
use std::path::Path;
use stencil::error::Error;
use stencil::loader::{TemplateKey, TemplateStore};
use stencil::renderer::TemplateCache;
use tempfile::TempDir;

fn write_template(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn cache_over(root: &Path) -> TemplateCache {
    TemplateCache::new(TemplateStore::new(root)).unwrap()
}

#[test]
fn test_first_load_compiles_then_reuses() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/basic.j2", "Hello {{ name }}!");
    let cache = cache_over(temp_dir.path());
    let key = TemplateKey::new("forms", "basic");

    let first = cache.load_template(&key).unwrap();
    assert_eq!(first.render(&json!({"name": "world"})).unwrap(), "Hello world!");
    assert_eq!(cache.compilations(), 1);

    let second = cache.load_template(&key).unwrap();
    assert_eq!(second.render(&json!({"name": "again"})).unwrap(), "Hello again!");
    assert_eq!(cache.compilations(), 1);
}

#[test]
fn test_clear_cache_forces_recompilation() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/basic.j2", "Hello {{ name }}!");
    let cache = cache_over(temp_dir.path());
    let key = TemplateKey::new("forms", "basic");

    cache.load_template(&key).unwrap();
    assert_eq!(cache.compilations(), 1);

    cache.clear_cache();
    cache.load_template(&key).unwrap();
    assert_eq!(cache.compilations(), 2);
}

#[test]
fn test_changed_source_recompiles() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/basic.j2", "v1 {{ name }}");
    let cache = cache_over(temp_dir.path());
    let key = TemplateKey::new("forms", "basic");

    let template = cache.load_template(&key).unwrap();
    assert_eq!(template.render(&json!({"name": "x"})).unwrap(), "v1 x");

    write_template(temp_dir.path(), "forms/basic.j2", "v2! {{ name }}");
    let template = cache.load_template(&key).unwrap();
    assert_eq!(template.render(&json!({"name": "x"})).unwrap(), "v2! x");
    assert_eq!(cache.compilations(), 2);
}

#[test]
fn test_concurrent_first_loads_compile_once() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/basic.j2", "Hello {{ name }}!");
    let cache = cache_over(temp_dir.path());
    let key = TemplateKey::new("forms", "basic");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let template = cache.load_template(&key).unwrap();
                let rendered = template.render(&json!({"name": "world"})).unwrap();
                assert_eq!(rendered, "Hello world!");
            });
        }
    });

    assert_eq!(cache.compilations(), 1);
}

#[test]
fn test_template_exists_does_not_compile() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/basic.j2", "Hello!");
    let cache = cache_over(temp_dir.path());

    assert!(cache.template_exists(&TemplateKey::new("forms", "basic")));
    assert!(!cache.template_exists(&TemplateKey::new("forms", "missing")));
    assert_eq!(cache.compilations(), 0);
}

#[test]
fn test_common_category_fallback() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "common/index.j2", "shared {{ name }}");
    let cache = cache_over(temp_dir.path());

    let key = TemplateKey::new("forms", "index");
    assert!(cache.template_exists(&key));
    let template = cache.load_template(&key).unwrap();
    assert_eq!(template.render(&json!({"name": "x"})).unwrap(), "shared x");
}

#[test]
fn test_missing_template_names_category_and_name() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_over(temp_dir.path());

    match cache.load_template(&TemplateKey::new("forms", "missing")) {
        Err(Error::TemplateNotFound { category, name }) => {
            assert_eq!(category, "forms");
            assert_eq!(name, "missing");
        }
        other => panic!("Expected TemplateNotFound, got ok={}", other.is_ok()),
    }
}

#[test]
fn test_syntax_error_does_not_poison_other_keys() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/bad.j2", "{% for broken %}");
    write_template(temp_dir.path(), "forms/good.j2", "fine {{ name }}");
    let cache = cache_over(temp_dir.path());

    match cache.load_template(&TemplateKey::new("forms", "bad")) {
        Err(Error::TemplateSyntax { category, name, .. }) => {
            assert_eq!(category, "forms");
            assert_eq!(name, "bad");
        }
        other => panic!("Expected TemplateSyntax, got ok={}", other.is_ok()),
    }

    let good = cache.load_template(&TemplateKey::new("forms", "good")).unwrap();
    assert_eq!(good.render(&json!({"name": "x"})).unwrap(), "fine x");
}

#[test]
fn test_registered_helper_applies_to_later_compilations() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "forms/shouty.j2", "{{ name | shout }}");
    let cache = cache_over(temp_dir.path());

    cache.register_helper("shout", |v| v.to_uppercase());
    let template = cache.load_template(&TemplateKey::new("forms", "shouty")).unwrap();
    assert_eq!(template.render(&json!({"name": "quiet"})).unwrap(), "QUIET");

    // Re-registration overwrites the prior binding.
    cache.register_helper("shout", |v| format!("{}!!", v));
    cache.clear_cache();
    let template = cache.load_template(&TemplateKey::new("forms", "shouty")).unwrap();
    assert_eq!(template.render(&json!({"name": "quiet"})).unwrap(), "quiet!!");
}

#[test]
fn test_default_case_helpers() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "forms/cases.j2",
        "{{ name | pascal_case }} {{ name | camel_case }} {{ name | kebab_case }}",
    );
    let cache = cache_over(temp_dir.path());

    let template = cache.load_template(&TemplateKey::new("forms", "cases")).unwrap();
    let rendered = template.render(&json!({"name": "customer_order"})).unwrap();
    assert_eq!(rendered, "CustomerOrder customerOrder customer-order");
}

#[test]
fn test_partials_survive_clear_cache() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "partials/greeting.j2", "Hi {{ name }}");
    write_template(
        temp_dir.path(),
        "forms/welcome.j2",
        "{% include \"partials/greeting\" %}!",
    );
    let cache = cache_over(temp_dir.path());
    let key = TemplateKey::new("forms", "welcome");

    let template = cache.load_template(&key).unwrap();
    assert_eq!(template.render(&json!({"name": "Ada"})).unwrap(), "Hi Ada!");

    cache.clear_cache();
    let template = cache.load_template(&key).unwrap();
    assert_eq!(template.render(&json!({"name": "Ada"})).unwrap(), "Hi Ada!");
}

#[test]
fn test_register_partial_at_runtime() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "forms/framed.j2",
        "[{% include \"partials/frame\" %}]",
    );
    let cache = cache_over(temp_dir.path());

    cache.register_partial("frame", "<{{ name }}>").unwrap();
    let template = cache.load_template(&TemplateKey::new("forms", "framed")).unwrap();
    assert_eq!(template.render(&json!({"name": "x"})).unwrap(), "[<x>]");
}
