//! Reference markup adapter for `///` XML documentation comments.
//!
//! [`parse_doc_comment`] turns the raw comment text of one declaration into a
//! located [`CommentTree`]; [`render_node`] and [`layout_node`] go the other
//! way for nodes built by rewrites.
//!
//! The exterior trivia of each line (indentation, `///` and one optional
//! space) is stripped before parsing and belongs to no node. Entities such as
//! `&lt;` are kept verbatim so every text run equals its buffer slice.

use thiserror::Error;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use crate::span::{BufferId, Generation, TextSpan};
use crate::tree::{Attribute, CommentNode, CommentTree, Element, TextRun};

/// Errors from parsing documentation comment markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unclosed <{name}> at byte {offset}")]
    UnclosedTag { name: String, offset: usize },

    #[error("unexpected </{name}> at byte {offset}")]
    UnexpectedClose { name: String, offset: usize },

    #[error("invalid tag at byte {offset}")]
    InvalidTag { offset: usize },

    #[error("line {line} is not a /// comment line")]
    MissingPrefix { line: usize },
}

impl MarkupError {
    /// Buffer offset of the problem, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            MarkupError::UnclosedTag { offset, .. }
            | MarkupError::UnexpectedClose { offset, .. }
            | MarkupError::InvalidTag { offset } => Some(*offset),
            MarkupError::MissingPrefix { .. } => None,
        }
    }
}

// ============================================================================
// Trivia
// ============================================================================

/// Comment content with exterior trivia removed, mapped back to the buffer.
struct Content {
    text: String,
    /// Buffer offset of every content byte, plus one entry for the end.
    offsets: Vec<usize>,
    line_prefix: String,
}

impl Content {
    fn offset(&self, index: usize) -> usize {
        self.offsets[index.min(self.offsets.len() - 1)]
    }
}

/// Length of the exterior prefix of `line`, or `None` if it is not a `///` line.
fn exterior_len(line: &str) -> Option<usize> {
    let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
    let rest = line[indent..].strip_prefix("///")?;
    let space = usize::from(rest.starts_with(' '));
    Some(indent + 3 + space)
}

fn strip_trivia(source: &str, base_offset: usize) -> Result<Content, MarkupError> {
    let mut text = String::with_capacity(source.len());
    let mut offsets = Vec::with_capacity(source.len() + 1);
    let mut prefixes = Vec::new();
    let mut line_start = 0;

    for (number, line) in source.split_inclusive('\n').enumerate() {
        let body = line.strip_suffix('\n').unwrap_or(line);
        if body.trim().is_empty() && number > 0 && line_start + line.len() == source.len() {
            // Trailing indentation before the declaration.
            break;
        }
        let skip = exterior_len(body).ok_or(MarkupError::MissingPrefix { line: number + 1 })?;
        prefixes.push(&line[..skip]);
        text.push_str(&line[skip..]);
        offsets.extend((skip..line.len()).map(|i| base_offset + line_start + i));
        line_start += line.len();
    }
    offsets.push(base_offset + line_start);

    let line_prefix = prefixes
        .get(1)
        .or_else(|| prefixes.first())
        .map(|p| p.to_string())
        .unwrap_or_else(|| "/// ".to_string());
    Ok(Content {
        text,
        offsets,
        line_prefix,
    })
}

// ============================================================================
// Tag Syntax (winnow)
// ============================================================================

#[derive(Debug)]
enum Tag {
    Open {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
}

fn tag_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')).parse_next(input)
}

fn quoted(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., |c: char| c == '"'), '"'),
        delimited('\'', take_till(0.., |c: char| c == '\''), '\''),
    ))
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn attribute(input: &mut &str) -> ModalResult<Attribute> {
    let name = tag_name.parse_next(input)?;
    let _ = (multispace0, '=', multispace0).parse_next(input)?;
    let value = quoted.parse_next(input)?;
    Ok(Attribute {
        name: name.to_string(),
        value,
    })
}

fn open_tag(input: &mut &str) -> ModalResult<Tag> {
    let _ = '<'.parse_next(input)?;
    let name = tag_name.parse_next(input)?;
    let attributes: Vec<Attribute> = repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let self_closing = alt(("/>".value(true), ">".value(false))).parse_next(input)?;
    Ok(Tag::Open {
        name: name.to_string(),
        attributes,
        self_closing,
    })
}

fn close_tag(input: &mut &str) -> ModalResult<Tag> {
    let name = delimited(("</", multispace0), tag_name, (multispace0, '>')).parse_next(input)?;
    Ok(Tag::Close {
        name: name.to_string(),
    })
}

/// Parse one tag at the start of `rest`, returning it and its byte length.
fn parse_tag(rest: &str) -> Option<(Tag, usize)> {
    let mut input = rest;
    let tag = alt((close_tag, open_tag)).parse_next(&mut input).ok()?;
    Some((tag, rest.len() - input.len()))
}

// ============================================================================
// Parsing
// ============================================================================

struct OpenElement {
    element: Element,
    start: usize,
    inner_start: usize,
}

/// Parse a `///` documentation comment into a generation-0 tree.
///
/// `source` is the comment text as it appears in the buffer, starting at
/// `base_offset`. Lines must each start with optional indentation and `///`.
pub fn parse_doc_comment(source: &str, base_offset: usize, buffer: BufferId) -> Result<CommentTree, MarkupError> {
    let content = strip_trivia(source, base_offset)?;
    let generation = Generation::default();
    let text = content.text.as_str();
    let span = |start: usize, end: usize| {
        let from = content.offset(start);
        let to = if end > start { content.offset(end - 1) + 1 } else { from };
        TextSpan::from_range(buffer, generation, from, to)
    };

    let mut roots: Vec<CommentNode> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut pos = 0;

    fn push(node: CommentNode, roots: &mut Vec<CommentNode>, stack: &mut [OpenElement]) {
        match stack.last_mut() {
            Some(open) => open.element.children.push(node),
            None => roots.push(node),
        }
    }

    while pos < text.len() {
        let rest = &text[pos..];
        if rest.starts_with('\n') {
            push(CommentNode::Text(TextRun::new("\n", span(pos, pos + 1))), &mut roots, &mut stack);
            pos += 1;
            continue;
        }
        if rest.starts_with('<') {
            let (tag, len) = parse_tag(rest).ok_or(MarkupError::InvalidTag {
                offset: content.offset(pos),
            })?;
            match tag {
                Tag::Open {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let mut element = Element::named(name);
                    element.attributes = attributes;
                    if self_closing {
                        element.self_closing = true;
                        element.span = Some(span(pos, pos + len));
                        push(CommentNode::Element(element), &mut roots, &mut stack);
                    } else {
                        stack.push(OpenElement {
                            element,
                            start: pos,
                            inner_start: pos + len,
                        });
                    }
                }
                Tag::Close { name } => {
                    let open = match stack.pop() {
                        Some(open) if open.element.name == name => open,
                        _ => {
                            return Err(MarkupError::UnexpectedClose {
                                name,
                                offset: content.offset(pos),
                            })
                        }
                    };
                    let mut element = open.element;
                    element.span = Some(span(open.start, pos + len));
                    let inner_from = content.offset(open.inner_start);
                    let inner_to = content.offset(pos);
                    element.inner = Some(TextSpan::from_range(buffer, generation, inner_from, inner_to));
                    push(CommentNode::Element(element), &mut roots, &mut stack);
                }
            }
            pos += len;
            continue;
        }
        let len = rest.find(['<', '\n']).unwrap_or(rest.len());
        push(
            CommentNode::Text(TextRun::new(&rest[..len], span(pos, pos + len))),
            &mut roots,
            &mut stack,
        );
        pos += len;
    }

    if let Some(open) = stack.pop() {
        return Err(MarkupError::UnclosedTag {
            name: open.element.name,
            offset: content.offset(open.start),
        });
    }

    // A trailing "\n" after the last line belongs to the declaration, not the comment.
    if matches!(roots.last(), Some(CommentNode::Text(run)) if run.is_newline()) {
        roots.pop();
    }

    Ok(CommentTree {
        buffer,
        generation,
        line_prefix: content.line_prefix,
        nodes: roots,
    })
}

// ============================================================================
// Rendering and Layout
// ============================================================================

fn render_open(element: &Element) -> String {
    let mut out = format!("<{}", element.name);
    for attr in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
    }
    out.push_str(if element.self_closing { "/>" } else { ">" });
    out
}

fn render_close(element: &Element) -> String {
    format!("</{}>", element.name)
}

/// Render a node as buffer text, writing `line_prefix` after every newline.
pub fn render_node(node: &CommentNode, line_prefix: &str) -> String {
    match node {
        CommentNode::Text(run) => run.text.replace('\n', &format!("\n{}", line_prefix)),
        CommentNode::Element(element) => {
            let mut out = render_open(element);
            if !element.self_closing {
                for child in &element.children {
                    out.push_str(&render_node(child, line_prefix));
                }
                out.push_str(&render_close(element));
            }
            out
        }
    }
}

/// Split text runs at newlines so every `"\n"` is a run of its own.
fn split_runs(nodes: Vec<CommentNode>) -> Vec<CommentNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            CommentNode::Text(run) if run.text.contains('\n') && !run.is_newline() => {
                let mut first = true;
                for piece in run.text.split('\n') {
                    if !first {
                        out.push(CommentNode::text("\n"));
                    }
                    first = false;
                    if !piece.is_empty() {
                        out.push(CommentNode::text(piece));
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Assign spans to a node rendered at buffer offset `start`.
///
/// The spans match the bytes [`render_node`] produces for the same node and
/// prefix. Text inside elements is split at newlines on the way.
pub fn layout_node(
    node: CommentNode,
    start: usize,
    buffer: BufferId,
    generation: Generation,
    line_prefix: &str,
) -> CommentNode {
    let mut cursor = start;
    layout_at(node, &mut cursor, buffer, generation, line_prefix)
}

fn layout_at(
    node: CommentNode,
    cursor: &mut usize,
    buffer: BufferId,
    generation: Generation,
    line_prefix: &str,
) -> CommentNode {
    match node {
        CommentNode::Text(run) => {
            let start = *cursor;
            let rendered = render_node(&CommentNode::Text(run.clone()), line_prefix);
            *cursor += rendered.len();
            let len = if run.is_newline() { 1 } else { run.text.len() };
            CommentNode::Text(TextRun::new(run.text, TextSpan::new(buffer, generation, start, len)))
        }
        CommentNode::Element(mut element) => {
            let start = *cursor;
            *cursor += render_open(&element).len();
            if element.self_closing {
                element.children.clear();
                element.inner = None;
            } else {
                let inner_start = *cursor;
                let children = split_runs(std::mem::take(&mut element.children));
                element.children = children
                    .into_iter()
                    .map(|child| layout_at(child, cursor, buffer, generation, line_prefix))
                    .collect();
                element.inner = Some(TextSpan::from_range(buffer, generation, inner_start, *cursor));
                *cursor += render_close(&element).len();
            }
            element.span = Some(TextSpan::from_range(buffer, generation, start, *cursor));
            CommentNode::Element(element)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
