//! Comment tree model: tagged elements and located text runs.
//!
//! A [`CommentTree`] is the immutable snapshot of one documentation comment.
//! It is an ordered forest of [`CommentNode`]s: either an [`Element`]
//! (`<summary>`, `<param name="x">`, ...) or a [`TextRun`] whose text is
//! byte-identical to the buffer slice at its span.
//!
//! Text runs never span a line break: the host (or the markup adapter) splits
//! text at newlines so each `"\n"` is a run of its own and the exterior line
//! prefix (`/// `) between lines belongs to no node at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::{BufferId, Generation, TextSpan};

// ============================================================================
// Tag Kinds
// ============================================================================

/// Closed set of documentation tags the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Summary,
    Remarks,
    Returns,
    Param,
    TypeParam,
    Value,
    Exception,
    Example,
    Para,
    Code,
    C,
    See,
    SeeAlso,
    ParamRef,
    TypeParamRef,
    List,
    ListHeader,
    Item,
    Term,
    Description,
    InheritDoc,
    Include,
    /// Any tag not in the table; the raw name is kept on the element.
    Unknown,
}

/// The single name <-> kind lookup table.
const TAG_TABLE: &[(&str, TagKind)] = &[
    ("summary", TagKind::Summary),
    ("remarks", TagKind::Remarks),
    ("returns", TagKind::Returns),
    ("param", TagKind::Param),
    ("typeparam", TagKind::TypeParam),
    ("value", TagKind::Value),
    ("exception", TagKind::Exception),
    ("example", TagKind::Example),
    ("para", TagKind::Para),
    ("code", TagKind::Code),
    ("c", TagKind::C),
    ("see", TagKind::See),
    ("seealso", TagKind::SeeAlso),
    ("paramref", TagKind::ParamRef),
    ("typeparamref", TagKind::TypeParamRef),
    ("list", TagKind::List),
    ("listheader", TagKind::ListHeader),
    ("item", TagKind::Item),
    ("term", TagKind::Term),
    ("description", TagKind::Description),
    ("inheritdoc", TagKind::InheritDoc),
    ("include", TagKind::Include),
];

impl TagKind {
    /// Look up a tag by its markup name. Names are matched exactly.
    pub fn from_name(name: &str) -> TagKind {
        TAG_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
            .unwrap_or(TagKind::Unknown)
    }

    /// Canonical markup name (`"unknown"` for [`TagKind::Unknown`]).
    pub fn name(self) -> &'static str {
        TAG_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// Inline tags flow inside sentences rather than forming blocks.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            TagKind::C | TagKind::See | TagKind::ParamRef | TagKind::TypeParamRef
        )
    }

    /// Tags whose content is code or a literal and never prose.
    pub fn is_literal(self) -> bool {
        matches!(self, TagKind::C | TagKind::Code)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A tagged element with ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Tag kind from the lookup table.
    pub tag: TagKind,
    /// Raw tag name as written (differs from `tag.name()` only for unknown tags).
    pub name: String,
    /// Attributes in source order.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Children in source order.
    #[serde(default)]
    pub children: Vec<CommentNode>,
    /// Written as `<tag/>`.
    #[serde(default)]
    pub self_closing: bool,
    /// Whole markup extent, open tag to close tag. `None` for freshly built nodes.
    #[serde(default)]
    pub span: Option<TextSpan>,
    /// Content extent between the open and close tags.
    #[serde(default)]
    pub inner: Option<TextSpan>,
}

impl Element {
    /// Create an empty element for a known tag.
    pub fn new(tag: TagKind) -> Self {
        Element {
            tag,
            name: tag.name().to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            span: None,
            inner: None,
        }
    }

    /// Create an element from a raw tag name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Element {
            tag: TagKind::from_name(&name),
            name,
            ..Element::new(TagKind::Unknown)
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a child node.
    pub fn with_child(mut self, child: CommentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Add an unlocated text child.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(CommentNode::Text(TextRun::fresh(text)))
    }

    /// Mark as self-closing.
    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Value of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A run of text located in the source buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// `None` only for freshly built runs that have not been laid out yet.
    #[serde(default)]
    pub span: Option<TextSpan>,
}

impl TextRun {
    /// A located run.
    pub fn new(text: impl Into<String>, span: TextSpan) -> Self {
        TextRun {
            text: text.into(),
            span: Some(span),
        }
    }

    /// An unlocated run, used when building replacement nodes.
    pub fn fresh(text: impl Into<String>) -> Self {
        TextRun {
            text: text.into(),
            span: None,
        }
    }

    /// A run that is exactly one line break.
    pub fn is_newline(&self) -> bool {
        self.text == "\n"
    }

    /// Empty or only whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// A node of the comment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommentNode {
    Element(Element),
    Text(TextRun),
}

impl CommentNode {
    /// Shorthand for an unlocated text node.
    pub fn text(text: impl Into<String>) -> Self {
        CommentNode::Text(TextRun::fresh(text))
    }

    /// Source extent of the node, when located.
    pub fn span(&self) -> Option<TextSpan> {
        match self {
            CommentNode::Element(e) => e.span,
            CommentNode::Text(t) => t.span,
        }
    }

    /// Children of an element; empty for text.
    pub fn children(&self) -> &[CommentNode] {
        match self {
            CommentNode::Element(e) => &e.children,
            CommentNode::Text(_) => &[],
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            CommentNode::Element(e) => Some(e),
            CommentNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            CommentNode::Text(t) => Some(t),
            CommentNode::Element(_) => None,
        }
    }
}

impl From<Element> for CommentNode {
    fn from(element: Element) -> Self {
        CommentNode::Element(element)
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Child-index path from the tree root to a node.
///
/// `[1, 0]` is the first child of the second top-level node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        NodePath(indices)
    }

    /// Path of the parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            return None;
        }
        Some(NodePath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Index within the parent; `None` for the root.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &NodePath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Immutable snapshot of one documentation comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentTree {
    /// Buffer all spans refer to.
    pub buffer: BufferId,
    /// Snapshot generation; bumped by every rewrite.
    pub generation: Generation,
    /// Exterior trivia written at the start of every comment line (e.g. `"    /// "`).
    #[serde(default)]
    pub line_prefix: String,
    /// Top-level nodes in source order.
    pub nodes: Vec<CommentNode>,
}

impl CommentTree {
    /// Create a generation-0 tree.
    pub fn new(buffer: BufferId, line_prefix: impl Into<String>, nodes: Vec<CommentNode>) -> Self {
        CommentTree {
            buffer,
            generation: Generation::default(),
            line_prefix: line_prefix.into(),
            nodes,
        }
    }

    /// Node at `path`, or `None` if the path does not resolve.
    pub fn node_at(&self, path: &NodePath) -> Option<&CommentNode> {
        let (first, rest) = path.0.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    /// Element at `path`, or `None` if the path is missing or names a text run.
    pub fn element_at(&self, path: &NodePath) -> Option<&Element> {
        self.node_at(path).and_then(CommentNode::as_element)
    }

    /// Children of the node at `path`; the root path yields the top-level nodes.
    pub fn children_at(&self, path: &NodePath) -> Option<&[CommentNode]> {
        if path.0.is_empty() {
            return Some(&self.nodes);
        }
        match self.node_at(path)? {
            CommentNode::Element(e) => Some(&e.children),
            CommentNode::Text(_) => None,
        }
    }

    /// Source span of the node at `path`.
    pub fn span_of(&self, path: &NodePath) -> Option<TextSpan> {
        self.node_at(path).and_then(CommentNode::span)
    }
}

// ============================================================================
// Tests
// ============================================================================
