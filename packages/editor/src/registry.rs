//! # Component Registry
//!
//! Maps a component type name to its palette metadata, a default-props
//! factory and an optional renderer. Adding a block type means registering a
//! new definition; nothing dispatches on type names outside this table.
//!
//! Definitions are registered at startup. Iteration and
//! [`ComponentRegistry::list_by_category`] follow registration order.

use crate::document::{Component, Props, TypeName};
use indexmap::IndexMap;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Factory producing a fresh property bag for a new component
pub type PropsFactory = Arc<dyn Fn() -> Props + Send + Sync>;

/// Renders one component into the host's output format
pub type RenderFn = Arc<dyn Fn(&Component) -> RenderedOutput + Send + Sync>;

/// Opaque output of a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput(pub String);

impl fmt::Display for RenderedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry entry for one component type
#[derive(Clone)]
pub struct ComponentTypeDefinition {
    pub type_name: TypeName,
    pub label: String,
    pub category: String,
    default_props: PropsFactory,
    renderer: Option<RenderFn>,
}

impl ComponentTypeDefinition {
    pub fn new(
        type_name: impl Into<TypeName>,
        label: impl Into<String>,
        category: impl Into<String>,
        default_props: impl Fn() -> Props + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            label: label.into(),
            category: category.into(),
            default_props: Arc::new(default_props),
            renderer: None,
        }
    }

    /// Attach a renderer
    pub fn with_renderer(
        mut self,
        renderer: impl Fn(&Component) -> RenderedOutput + Send + Sync + 'static,
    ) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn default_props(&self) -> Props {
        (self.default_props)()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }
}

impl fmt::Debug for ComponentTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTypeDefinition")
            .field("type_name", &self.type_name)
            .field("label", &self.label)
            .field("category", &self.category)
            .field("has_renderer", &self.renderer.is_some())
            .finish()
    }
}

/// Type name → definition table
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    definitions: IndexMap<TypeName, ComponentTypeDefinition>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the funnel palette
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for definition in builtin_definitions() {
            registry.register(definition);
        }
        registry
    }

    /// Add or replace a definition; a replaced type keeps its position
    pub fn register(&mut self, definition: ComponentTypeDefinition) {
        if self.definitions.contains_key(&definition.type_name) {
            tracing::debug!(type_name = %definition.type_name, "Replacing component definition");
        }
        self.definitions
            .insert(definition.type_name.clone(), definition);
    }

    pub fn definition(&self, type_name: &str) -> Option<&ComponentTypeDefinition> {
        self.definitions.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    /// Definitions in a category, in registration order
    pub fn list_by_category(&self, category: &str) -> Vec<&ComponentTypeDefinition> {
        self.definitions
            .values()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Distinct categories in order of first registration
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for definition in self.definitions.values() {
            if !categories.contains(&definition.category.as_str()) {
                categories.push(&definition.category);
            }
        }
        categories
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentTypeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Call the registered factory; `None` for unknown types
    pub fn create_default_props(&self, type_name: &str) -> Option<Props> {
        self.definition(type_name).map(ComponentTypeDefinition::default_props)
    }

    /// Dispatch to the renderer registered for the component's type
    pub fn render(&self, component: &Component) -> Option<RenderedOutput> {
        let renderer = self.definition(&component.type_name)?.renderer.as_ref()?;
        Some(renderer(component))
    }
}

fn props(pairs: &[(&str, serde_json::Value)]) -> Props {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn text_line(
    tag: &'static str,
    key: &'static str,
) -> impl Fn(&Component) -> RenderedOutput + Send + Sync + 'static {
    move |component| {
        RenderedOutput(format!(
            "[{}] {}",
            tag,
            component.prop_str(key).unwrap_or_default()
        ))
    }
}

/// The funnel palette: content, media, form, layout and offer blocks
fn builtin_definitions() -> Vec<ComponentTypeDefinition> {
    vec![
        ComponentTypeDefinition::new("heading", "Heading", "content", || {
            props(&[
                ("text", json!("Your headline")),
                ("level", json!(1)),
                ("align", json!("center")),
            ])
        })
        .with_renderer(text_line("h", "text")),
        ComponentTypeDefinition::new("text", "Text", "content", || {
            props(&[
                ("text", json!("Write something persuasive.")),
                ("align", json!("left")),
            ])
        })
        .with_renderer(text_line("p", "text")),
        ComponentTypeDefinition::new("image", "Image", "media", || {
            props(&[
                ("src", json!("")),
                ("alt", json!("")),
                ("width", json!("100%")),
            ])
        })
        .with_renderer(|c| {
            RenderedOutput(format!(
                "[img] {}",
                c.prop_str("alt").filter(|a| !a.is_empty()).unwrap_or("(no alt)")
            ))
        }),
        ComponentTypeDefinition::new("video", "Video", "media", || {
            props(&[("url", json!("")), ("autoplay", json!(false))])
        })
        .with_renderer(text_line("video", "url")),
        ComponentTypeDefinition::new("button", "Button", "form", || {
            props(&[
                ("label", json!("Continue")),
                ("action", json!("next-step")),
                ("variant", json!("primary")),
            ])
        })
        .with_renderer(text_line("button", "label")),
        ComponentTypeDefinition::new("options", "Options", "form", || {
            props(&[
                ("question", json!("Pick one")),
                ("options", json!(["Option A", "Option B"])),
                ("multiple", json!(false)),
            ])
        })
        .with_renderer(|c| {
            let count = c
                .props
                .get("options")
                .and_then(|v| v.as_array())
                .map_or(0, Vec::len);
            RenderedOutput(format!(
                "[options] {} ({} choices)",
                c.prop_str("question").unwrap_or_default(),
                count
            ))
        }),
        ComponentTypeDefinition::new("input", "Input", "form", || {
            props(&[
                ("label", json!("Your email")),
                ("placeholder", json!("name@example.com")),
                ("inputType", json!("email")),
                ("required", json!(true)),
            ])
        })
        .with_renderer(text_line("input", "label")),
        ComponentTypeDefinition::new("spacer", "Spacer", "layout", || {
            props(&[("height", json!(24))])
        })
        .with_renderer(|c| {
            RenderedOutput(format!(
                "[spacer] {}px",
                c.props.get("height").and_then(|v| v.as_i64()).unwrap_or(0)
            ))
        }),
        ComponentTypeDefinition::new("divider", "Divider", "layout", || {
            props(&[("style", json!("solid"))])
        })
        .with_renderer(|_| RenderedOutput("[divider]".to_string())),
        ComponentTypeDefinition::new("testimonial", "Testimonial", "offer", || {
            props(&[
                ("quote", json!("This changed everything.")),
                ("author", json!("Happy customer")),
            ])
        })
        .with_renderer(text_line("quote", "quote")),
        ComponentTypeDefinition::new("price", "Price", "offer", || {
            props(&[
                ("amount", json!("29.00")),
                ("currency", json!("USD")),
                ("period", json!("month")),
            ])
        })
        .with_renderer(|c| {
            RenderedOutput(format!(
                "[price] {} {}",
                c.prop_str("amount").unwrap_or_default(),
                c.prop_str("currency").unwrap_or_default()
            ))
        }),
        ComponentTypeDefinition::new("timer", "Countdown", "offer", || {
            props(&[("minutes", json!(15)), ("label", json!("Offer ends in"))])
        })
        .with_renderer(text_line("timer", "label")),
    ]
}
