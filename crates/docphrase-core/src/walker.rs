//! Comment tree walker: located text tokens, element lookup and text views.
//!
//! The walker is the only place that knows how a [`CommentTree`] is laid out.
//! Everything above it (matcher, evaluator, rewrite builder) consumes either
//! [`TextToken`]s, which are individual located runs, or a [`TextView`], which
//! is the logical plain text of an element with a map back to buffer spans.

use crate::markup::render_node;
use crate::span::TextSpan;
use crate::tree::{CommentNode, CommentTree, Element, NodePath, TagKind};

// ============================================================================
// Text Tokens
// ============================================================================

/// Walk options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Elements with these tags are skipped together with their content.
    pub exclude: Vec<TagKind>,
    /// Yield whitespace-only runs (including `"\n"` runs).
    pub include_whitespace: bool,
}

impl WalkOptions {
    /// Skip the given tags.
    pub fn excluding(tags: &[TagKind]) -> Self {
        WalkOptions {
            exclude: tags.to_vec(),
            include_whitespace: false,
        }
    }

    /// Prose only: skips `<code>` and `<c>`.
    pub fn prose() -> Self {
        WalkOptions::excluding(&[TagKind::Code, TagKind::C])
    }
}

/// What produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A text run.
    Text,
    /// A self-closing element; the token is empty and sits at the element start.
    SelfClosing,
}

/// A located piece of comment text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToken<'a> {
    pub text: &'a str,
    pub span: TextSpan,
    /// Enclosing tags, outermost first.
    pub ancestry: Vec<TagKind>,
    /// Path of the run (or self-closing element) that produced the token.
    pub path: NodePath,
    pub kind: TokenKind,
}

impl TextToken<'_> {
    /// Innermost enclosing tag.
    pub fn parent_tag(&self) -> Option<TagKind> {
        self.ancestry.last().copied()
    }

    /// True if any enclosing element has `tag`.
    pub fn is_inside(&self, tag: TagKind) -> bool {
        self.ancestry.contains(&tag)
    }
}

#[derive(Debug, Clone)]
struct Frame<'a> {
    nodes: &'a [CommentNode],
    next: usize,
    path: NodePath,
}

/// Lazy iterator over the text tokens of a tree (or a subtree).
///
/// Cloning restarts nothing: a clone continues from the same position, so
/// clone before iterating to walk the same tokens twice.
#[derive(Debug, Clone)]
pub struct TextTokens<'a> {
    options: WalkOptions,
    stack: Vec<Frame<'a>>,
    ancestry: Vec<TagKind>,
}

impl<'a> TextTokens<'a> {
    fn new(nodes: &'a [CommentNode], path: NodePath, ancestry: Vec<TagKind>, options: WalkOptions) -> Self {
        TextTokens {
            options,
            stack: vec![Frame {
                nodes,
                next: 0,
                path,
            }],
            ancestry,
        }
    }
}

impl<'a> Iterator for TextTokens<'a> {
    type Item = TextToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len();
            let frame = self.stack.last_mut()?;
            if frame.next >= frame.nodes.len() {
                self.stack.pop();
                if depth > 1 {
                    self.ancestry.pop();
                }
                continue;
            }
            let index = frame.next;
            frame.next += 1;
            let nodes = frame.nodes;
            let path = frame.path.child(index);

            match &nodes[index] {
                CommentNode::Text(run) => {
                    if !self.options.include_whitespace && run.is_whitespace() {
                        continue;
                    }
                    let Some(span) = run.span else { continue };
                    return Some(TextToken {
                        text: &run.text,
                        span,
                        ancestry: self.ancestry.clone(),
                        path,
                        kind: TokenKind::Text,
                    });
                }
                CommentNode::Element(element) => {
                    if self.options.exclude.contains(&element.tag) {
                        continue;
                    }
                    if element.self_closing {
                        let Some(span) = element.span else { continue };
                        return Some(TextToken {
                            text: "",
                            span: span.sub(0, 0),
                            ancestry: self.ancestry.clone(),
                            path,
                            kind: TokenKind::SelfClosing,
                        });
                    }
                    self.ancestry.push(element.tag);
                    self.stack.push(Frame {
                        nodes: &element.children,
                        next: 0,
                        path,
                    });
                }
            }
        }
    }
}

/// Tokens of the whole tree.
pub fn text_tokens(tree: &CommentTree, options: WalkOptions) -> TextTokens<'_> {
    TextTokens::new(&tree.nodes, NodePath::root(), Vec::new(), options)
}

/// Tokens inside the element at `path`; ancestry starts with the element's own
/// ancestors, so tokens look the same as when walking the whole tree.
pub fn element_tokens<'a>(
    tree: &'a CommentTree,
    path: &NodePath,
    options: WalkOptions,
) -> Option<TextTokens<'a>> {
    let element = tree.element_at(path)?;
    let mut ancestry = ancestor_tags(tree, path);
    ancestry.push(element.tag);
    Some(TextTokens::new(&element.children, path.clone(), ancestry, options))
}

fn ancestor_tags(tree: &CommentTree, path: &NodePath) -> Vec<TagKind> {
    let mut tags = Vec::new();
    let mut nodes: &[CommentNode] = &tree.nodes;
    for index in path.0.iter().take(path.0.len().saturating_sub(1)) {
        match nodes.get(*index) {
            Some(CommentNode::Element(e)) => {
                tags.push(e.tag);
                nodes = &e.children;
            }
            _ => break,
        }
    }
    tags
}

// ============================================================================
// Element Lookup
// ============================================================================

/// All elements with `tag`, in document order.
pub fn elements_by_tag(tree: &CommentTree, tag: TagKind) -> Vec<(NodePath, &Element)> {
    fn visit<'a>(nodes: &'a [CommentNode], path: &NodePath, tag: TagKind, out: &mut Vec<(NodePath, &'a Element)>) {
        for (index, node) in nodes.iter().enumerate() {
            if let CommentNode::Element(element) = node {
                let child = path.child(index);
                if element.tag == tag {
                    out.push((child.clone(), element));
                }
                visit(&element.children, &child, tag, out);
            }
        }
    }

    let mut out = Vec::new();
    visit(&tree.nodes, &NodePath::root(), tag, &mut out);
    out
}

/// First element with `tag` in document order.
pub fn first_element(tree: &CommentTree, tag: TagKind) -> Option<(NodePath, &Element)> {
    elements_by_tag(tree, tag).into_iter().next()
}

/// Last element with `tag` in document order.
pub fn last_element(tree: &CommentTree, tag: TagKind) -> Option<(NodePath, &Element)> {
    elements_by_tag(tree, tag).into_iter().last()
}

/// Node at `path`.
pub fn node_at<'a>(tree: &'a CommentTree, path: &NodePath) -> Option<&'a CommentNode> {
    tree.node_at(path)
}

/// `<param name="...">` (or `<typeparam>`) element documenting `name`.
pub fn named_element<'a>(tree: &'a CommentTree, tag: TagKind, name: &str) -> Option<(NodePath, &'a Element)> {
    elements_by_tag(tree, tag)
        .into_iter()
        .find(|(_, e)| e.attribute("name") == Some(name))
}

// ============================================================================
// Text Extraction
// ============================================================================

/// Content of a node with inline markup kept as written, boundary whitespace trimmed.
pub fn trimmed_text(node: &CommentNode) -> String {
    let raw = match node {
        CommentNode::Text(run) => run.text.clone(),
        CommentNode::Element(element) => element
            .children
            .iter()
            .map(|child| render_node(child, ""))
            .collect(),
    };
    raw.trim().to_string()
}

/// Content of a node without markup, references replaced by their target and
/// whitespace (line breaks included) collapsed to single spaces.
pub fn plain_text(node: &CommentNode) -> String {
    let view = match node {
        CommentNode::Text(run) => return collapse_whitespace(&run.text),
        CommentNode::Element(element) => TextView::of_element(element, NodePath::root()),
    };
    collapse_whitespace(view.text())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display text of a reference element such as `<see cref="T:System.String"/>`.
pub fn reference_target(element: &Element) -> String {
    let target = element
        .attribute("cref")
        .or_else(|| element.attribute("name"))
        .or_else(|| element.attribute("langword"))
        .or_else(|| element.attribute("href"))
        .unwrap_or("");
    match target.split_once(':') {
        Some((prefix, rest)) if prefix.len() == 1 => rest.to_string(),
        _ => target.to_string(),
    }
}

fn inline_plain(element: &Element) -> String {
    if element.self_closing || element.children.is_empty() {
        return reference_target(element);
    }
    let mut out = String::new();
    for child in &element.children {
        match child {
            CommentNode::Text(run) if run.is_newline() => out.push(' '),
            CommentNode::Text(run) => out.push_str(&run.text),
            CommentNode::Element(e) => out.push_str(&inline_plain(e)),
        }
    }
    out
}

// ============================================================================
// Text View
// ============================================================================

/// Where a piece of logical text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSource {
    /// A located text run; logical bytes map one to one onto the span.
    Run { span: TextSpan, path: NodePath },
    /// A `"\n"` run (or block boundary) shown as a single space.
    Break { span: Option<TextSpan>, path: NodePath },
    /// An inline element shown as its plain text; not addressable inside.
    Opaque { span: Option<TextSpan>, path: NodePath },
}

/// A slice of the logical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub len: usize,
    pub source: SegmentSource,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Plain text of an element as one logical string, mapped back to the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextView {
    text: String,
    segments: Vec<Segment>,
}

impl TextView {
    /// View of an element located at `path`.
    pub fn of_element(element: &Element, path: NodePath) -> Self {
        let mut view = TextView::default();
        view.push_children(&element.children, &path);
        view.finish();
        view
    }

    fn push_children(&mut self, nodes: &[CommentNode], path: &NodePath) {
        for (index, node) in nodes.iter().enumerate() {
            let child = path.child(index);
            match node {
                CommentNode::Text(run) if run.is_newline() => self.push_break(run.span, child),
                CommentNode::Text(run) => match run.span {
                    Some(span) => self.push(&run.text, SegmentSource::Run { span, path: child }),
                    None => self.push(&run.text, SegmentSource::Opaque { span: None, path: child }),
                },
                CommentNode::Element(element) if element.tag.is_inline() || element.self_closing => {
                    let text = inline_plain(element);
                    self.push(
                        &text,
                        SegmentSource::Opaque {
                            span: element.span,
                            path: child,
                        },
                    );
                }
                CommentNode::Element(element) => {
                    self.push_break(None, child.clone());
                    self.push_children(&element.children, &child);
                    self.push_break(None, child);
                }
            }
        }
    }

    fn push(&mut self, text: &str, source: SegmentSource) {
        if text.is_empty() {
            return;
        }
        self.segments.push(Segment {
            start: self.text.len(),
            len: text.len(),
            source,
        });
        self.text.push_str(text);
    }

    fn push_break(&mut self, span: Option<TextSpan>, path: NodePath) {
        if self.text.is_empty() || self.text.ends_with(char::is_whitespace) {
            return;
        }
        self.push(" ", SegmentSource::Break { span, path });
    }

    /// Drop separators that no text follows.
    fn finish(&mut self) {
        while let Some(last) = self.segments.last() {
            if !matches!(last.source, SegmentSource::Break { .. }) {
                break;
            }
            self.text.truncate(last.start);
            self.segments.pop();
        }
    }

    /// The logical text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment containing logical offset `offset`.
    pub fn segment_at(&self, offset: usize) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| s.start <= offset && offset < s.end())
    }

    /// Buffer span of the logical range `[start, start + len)`.
    ///
    /// Returns `None` unless the range lies inside one run.
    pub fn span_of(&self, start: usize, len: usize) -> Option<TextSpan> {
        self.segments.iter().find_map(|s| match &s.source {
            SegmentSource::Run { span, .. }
                if s.start <= start && start + len <= s.end() =>
            {
                Some(span.sub(start - s.start, len))
            }
            _ => None,
        })
    }

    /// Node path of the run containing logical offset `offset`.
    pub fn path_at(&self, offset: usize) -> Option<&NodePath> {
        self.segment_at(offset).map(|s| match &s.source {
            SegmentSource::Run { path, .. }
            | SegmentSource::Break { path, .. }
            | SegmentSource::Opaque { path, .. } => path,
        })
    }

    /// Logical offset of the first non-whitespace character.
    pub fn content_start(&self) -> usize {
        self.text.len() - self.text.trim_start().len()
    }

    /// Logical offset just past the last non-whitespace character.
    pub fn content_end(&self) -> usize {
        self.text.trim_end().len()
    }

    /// Logical byte ranges of whitespace-separated words.
    pub fn words(&self) -> Vec<(usize, &str)> {
        let mut words = Vec::new();
        let mut start = None;
        for (i, c) in self.text.char_indices() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    words.push((s, &self.text[s..i]));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            words.push((s, &self.text[s..]));
        }
        words
    }
}

// ============================================================================
// Tests
// ============================================================================
