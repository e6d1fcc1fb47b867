//! Template compilation and caching on top of MiniJinja.
//!
//! The cache compiles a template the first time it is requested, keyed by
//! (category, name) together with its on-disk fingerprint, and reuses the
//! compiled form until the source changes. Registered helpers and partials
//! are shared by every compilation that follows their registration.

use crate::error::{Error, Result};
use crate::loader::{Fingerprint, TemplateKey, TemplateStore, PARTIALS_DIR};
use cruet::Inflector;
use log::debug;
use minijinja::Environment;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Compiled-template cache with a shared rendering environment.
///
/// Interior state sits behind one mutex: concurrent first requests for
/// the same key serialize on it, so exactly one compilation happens and
/// every caller observes the same compiled template.
pub struct TemplateCache {
    inner: Arc<Mutex<CacheInner>>,
}

struct CacheInner {
    store: TemplateStore,
    env: Environment<'static>,
    fingerprints: HashMap<TemplateKey, Fingerprint>,
    partials: HashMap<String, String>,
    compilations: u64,
}

impl TemplateCache {
    /// Creates a cache over a templates directory, installing the default
    /// helpers and every partial found under `partials/`.
    pub fn new(store: TemplateStore) -> Result<Self> {
        let mut env = Environment::new();
        register_default_helpers(&mut env);

        let mut inner = CacheInner {
            store,
            env,
            fingerprints: HashMap::new(),
            partials: HashMap::new(),
            compilations: 0,
        };
        for (name, source) in inner.store.partials()? {
            inner.add_partial(&name, &source)?;
        }

        Ok(Self { inner: Arc::new(Mutex::new(inner)) })
    }

    /// Returns the compiled template for a key, compiling it on first
    /// request or when the source fingerprint changed on disk.
    pub fn load_template(&self, key: &TemplateKey) -> Result<CompiledTemplate> {
        let mut inner = self.inner.lock().expect("template cache lock poisoned");
        inner.ensure_compiled(key)?;
        Ok(CompiledTemplate { cache: Arc::clone(&self.inner), key: key.clone() })
    }

    /// Existence check without forcing compilation.
    pub fn template_exists(&self, key: &TemplateKey) -> bool {
        let inner = self.inner.lock().expect("template cache lock poisoned");
        inner.store.exists(key)
    }

    /// Registers a string helper usable as a filter in every compilation
    /// from now on. Re-registering a name overwrites the prior binding.
    pub fn register_helper<F>(&self, name: &str, helper: F)
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("template cache lock poisoned");
        inner.env.add_filter(name.to_string(), helper);
    }

    /// Registers a partial reachable as `partials/<name>` from any
    /// template. Re-registering a name overwrites the prior binding.
    pub fn register_partial(&self, name: &str, source: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("template cache lock poisoned");
        inner.add_partial(name, source)
    }

    /// Evicts every compiled template and fingerprint. Helpers and
    /// partials are untouched.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.lock().expect("template cache lock poisoned");
        inner.env.clear_templates();
        inner.fingerprints.clear();

        // Partials were validated when first registered; re-adding the
        // same sources cannot fail.
        let partials: Vec<(String, String)> = inner
            .partials
            .iter()
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect();
        for (name, source) in partials {
            if let Err(e) = inner.add_partial(&name, &source) {
                log::error!("partial '{}' could not be restored: {}", name, e);
            }
        }
        debug!("template cache cleared");
    }

    /// Number of compilations performed since construction.
    pub fn compilations(&self) -> u64 {
        let inner = self.inner.lock().expect("template cache lock poisoned");
        inner.compilations
    }

    /// Loads the optional data-model schema for a category.
    pub fn load_schema(&self, category: &str) -> Result<Option<serde_json::Value>> {
        let inner = self.inner.lock().expect("template cache lock poisoned");
        inner.store.load_schema(category)
    }
}

impl CacheInner {
    fn ensure_compiled(&mut self, key: &TemplateKey) -> Result<()> {
        let current = self.store.fingerprint(key)?;
        if self.fingerprints.get(key) == Some(&current) {
            return Ok(());
        }

        let (source, fingerprint) = self.store.read(key)?;
        self.env
            .add_template_owned(key.cache_id(), source)
            .map_err(|e| Error::TemplateSyntax {
                category: key.category.clone(),
                name: key.name.clone(),
                reason: e.to_string(),
            })?;
        self.compilations += 1;
        self.fingerprints.insert(key.clone(), fingerprint);
        debug!("compiled template '{}'", key);
        Ok(())
    }

    fn add_partial(&mut self, name: &str, source: &str) -> Result<()> {
        self.env
            .add_template_owned(format!("{}/{}", PARTIALS_DIR, name), source.to_string())
            .map_err(|e| Error::TemplateSyntax {
                category: PARTIALS_DIR.to_string(),
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.partials.insert(name.to_string(), source.to_string());
        Ok(())
    }
}

/// Handle to a compiled template held by the cache.
pub struct CompiledTemplate {
    cache: Arc<Mutex<CacheInner>>,
    key: TemplateKey,
}

impl CompiledTemplate {
    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// Renders the template against a JSON context.
    pub fn render(&self, context: &serde_json::Value) -> Result<String> {
        let inner = self.cache.lock().expect("template cache lock poisoned");
        let template =
            inner.env.get_template(&self.key.cache_id()).map_err(Error::Minijinja)?;
        template.render(context).map_err(Error::Minijinja)
    }
}

fn register_default_helpers(env: &mut Environment<'static>) {
    env.add_filter("pascal_case", |v: String| v.to_pascal_case());
    env.add_filter("camel_case", |v: String| v.to_camel_case());
    env.add_filter("snake_case", |v: String| v.to_snake_case());
    env.add_filter("kebab_case", |v: String| v.to_kebab_case());
    env.add_filter("title_case", |v: String| v.to_title_case());
    env.add_filter("plural", |v: String| v.to_plural());
    env.add_filter("singular", |v: String| v.to_singular());
    env.add_filter("capitalize_first", |v: String| {
        let mut chars = v.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    });
    env.add_filter("lowercase_first", |v: String| {
        let mut chars = v.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    });
}
