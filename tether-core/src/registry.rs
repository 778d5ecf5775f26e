//! Named host operations the interpreter may invoke with the `j` command.
//!
//! The payload is `name` optionally followed by whitespace and an argument
//! string. Only registered names run; there is no general evaluation.

use crate::error::ScriptError;
use crate::renderer::Renderer;

use std::collections::BTreeMap;

pub type ScriptHandler = Box<dyn Fn(&str, &mut dyn Renderer) -> anyhow::Result<()> + Send + Sync>;

pub struct ScriptRegistry {
    handlers: BTreeMap<String, ScriptHandler>,
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("operations", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ScriptRegistry {
    /// A registry with no operations at all.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        // ── Screen clear ──
        registry.register("clear", |_, renderer| {
            renderer.set_page("");
            renderer.set_cursor("");
            Ok(())
        });

        // ── Echo ──
        registry.register("echo", |args, renderer| {
            renderer.append_escaped(args);
            Ok(())
        });

        registry
    }

    /// Register (or replace) an operation.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&str, &mut dyn Renderer) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the operation named by `script` against the renderer.
    pub fn invoke(&self, script: &str, renderer: &mut dyn Renderer) -> Result<(), ScriptError> {
        let (name, args) = parse_invocation(script).ok_or(ScriptError::Empty)?;
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ScriptError::Unknown(name.to_string()))?;

        handler(args, renderer).map_err(|source| ScriptError::Failed {
            name: name.to_string(),
            source,
        })
    }
}

/// Split a script payload into operation name and argument string.
pub fn parse_invocation(script: &str) -> Option<(&str, &str)> {
    let trimmed = script.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((name, args)) => Some((name, args.trim_start())),
        None => Some((trimmed.trim_end(), "")),
    }
}
