//! Tool registry.

use super::{InputSchema, RegistryError, ToolHandler};
use crate::model::ToolDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, schema-described tool.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// The model-facing view of this tool.
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
        }
    }
}

impl PartialEq for ToolSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.input_schema == other.input_schema
            && Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Mapping from tool name to spec.
///
/// Built once at startup, then shared behind an `Arc`; there is no way to
/// mutate a registry through a shared reference, so concurrent exchanges
/// read it without locking. Specs are listed in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
        self.index.insert(spec.name.clone(), self.tools.len());
        self.descriptors.push(spec.descriptor());
        self.tools.push(spec);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<&ToolSpec, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// All specs in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Model-facing descriptors, in the same order as [`specs`](Self::specs).
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{BoxError, Param, ParamType, ToolArguments};
    use serde_json::{Value, json};

    async fn echo(args: ToolArguments) -> Result<Value, BoxError> {
        Ok(Value::Object(args.0))
    }

    fn spec(name: &str) -> ToolSpec {
        ToolSpec::new(
            name,
            format!("{name} tool"),
            InputSchema::new().param(Param::optional("n", ParamType::Integer)),
            echo,
        )
    }

    #[test]
    fn resolve_returns_registered_spec() {
        let mut registry = ToolRegistry::new();
        let original = spec("get_top_players_by_form");
        registry.register(original.clone()).unwrap();

        let resolved = registry.resolve("get_top_players_by_form").unwrap();
        assert_eq!(resolved, &original);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("a")).unwrap();
        let err = registry.register(spec("a")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("a".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_names_fail() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.resolve("nope").unwrap_err(),
            RegistryError::UnknownTool("nope".into())
        );
    }

    #[test]
    fn listing_is_stable_and_ordered() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(spec(name)).unwrap();
        }
        let names: Vec<&str> = registry.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let first = registry.descriptors().to_vec();
        let second = registry.descriptors().to_vec();
        assert_eq!(first, second);
        assert_eq!(first[1].name, "alpha");
        assert_eq!(first[1].input_schema["properties"]["n"]["type"], json!("integer"));
    }
}
