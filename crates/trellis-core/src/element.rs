//! Element descriptions: immutable descriptions of what to render

use crate::hooks::RenderCx;
use crate::outcome::RenderResult;
use crate::{Props, Value};
use std::fmt;

/// Render function of a component
pub type RenderFn = fn(&mut RenderCx<'_>, &Props, &[Element]) -> RenderResult;

/// A named component
///
/// The name is the component's type identity: two elements describe the same
/// component type when their names are equal.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
}

impl Component {
    /// Create a component from its name and render function
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    /// Get the component name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the render function
    pub fn render_fn(&self) -> RenderFn {
        self.render
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// Visibility mode of an offscreen container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OffscreenMode {
    #[default]
    Visible,
    Hidden,
}

/// The type tag of an element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// A host element, e.g. `div`
    Host(String),
    /// A function component
    Component(Component),
    /// Container whose subtree can be hidden without unmounting it
    Offscreen(OffscreenMode),
    /// Boundary that shows `fallback` while a descendant is suspended
    Suspense { fallback: Vec<Element> },
    /// Renders its children into another host container
    Portal(String),
    /// Hydration-scope boundary
    Island,
}

impl ElementKind {
    /// Whether two kinds describe the same node type
    ///
    /// Marker kinds match regardless of their payload, so an offscreen
    /// container switching modes keeps its node.
    pub fn same_type(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Component(a), ElementKind::Component(b)) => a == b,
            (ElementKind::Offscreen(_), ElementKind::Offscreen(_)) => true,
            (ElementKind::Suspense { .. }, ElementKind::Suspense { .. }) => true,
            (ElementKind::Portal(a), ElementKind::Portal(b)) => a == b,
            (ElementKind::Island, ElementKind::Island) => true,
            _ => false,
        }
    }
}

/// An immutable description of a node to render
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Type tag
    pub kind: ElementKind,
    /// Optional identity within the sibling list
    pub key: Option<String>,
    /// Property map
    pub props: Props,
    /// Ordered child descriptions
    pub children: Vec<Element>,
}

impl Element {
    fn with_kind(kind: ElementKind) -> Self {
        Self {
            kind,
            key: None,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Describe a host element
    pub fn host(tag: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Host(tag.into()))
    }

    /// Describe a component
    pub fn component(component: Component) -> Self {
        Self::with_kind(ElementKind::Component(component))
    }

    /// Describe an offscreen container
    pub fn offscreen(mode: OffscreenMode) -> Self {
        Self::with_kind(ElementKind::Offscreen(mode))
    }

    /// Describe a suspense boundary with its fallback content
    pub fn suspense(fallback: Vec<Element>) -> Self {
        Self::with_kind(ElementKind::Suspense { fallback })
    }

    /// Describe a portal into a host container
    pub fn portal(container: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Portal(container.into()))
    }

    /// Describe an island boundary
    pub fn island() -> Self {
        Self::with_kind(ElementKind::Island)
    }

    /// Set the key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a property
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Append a child
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether the node for `other` can be reused for this description
    pub fn matches(&self, kind: &ElementKind, key: Option<&str>) -> bool {
        self.kind.same_type(kind) && self.key.as_deref() == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::RenderCx;

    fn empty(_: &mut RenderCx<'_>, _: &Props, _: &[Element]) -> RenderResult {
        Ok(Vec::new())
    }

    #[test]
    fn test_builder() {
        let el = Element::host("ul")
            .prop("class", "list")
            .child(Element::host("li").key("a"))
            .child(Element::host("li").key("b"));
        assert_eq!(el.children.len(), 2);
        assert_eq!(el.props.get("class"), Some(&Value::from("list")));
        assert_eq!(el.children[1].key.as_deref(), Some("b"));
    }

    #[test]
    fn test_same_type() {
        let a = Component::new("A", empty);
        let b = Component::new("B", empty);
        assert!(ElementKind::Component(a).same_type(&ElementKind::Component(a)));
        assert!(!ElementKind::Component(a).same_type(&ElementKind::Component(b)));
        assert!(ElementKind::Host("div".into()).same_type(&ElementKind::Host("div".into())));
        assert!(!ElementKind::Host("div".into()).same_type(&ElementKind::Host("p".into())));
        assert!(ElementKind::Offscreen(OffscreenMode::Hidden)
            .same_type(&ElementKind::Offscreen(OffscreenMode::Visible)));
    }

    #[test]
    fn test_key_participates_in_match() {
        let el = Element::host("li").key("a");
        assert!(el.matches(&ElementKind::Host("li".into()), Some("a")));
        assert!(!el.matches(&ElementKind::Host("li".into()), Some("b")));
        assert!(!el.matches(&ElementKind::Host("li".into()), None));
    }
}
