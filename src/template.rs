//! String templates rendered against the release context.
//!
//! Supported syntax: `{{variable}}` placeholders and
//! `{{#if variable}}...{{else}}...{{/if}}` blocks, where a variable is true
//! when its value is non-empty. Templates are parsed once, when the
//! configuration is compiled; rendering is a pure function of the template
//! and the context.

use crate::context::ReleaseContext;
use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Placeholder names known to the expander
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Version,
    /// Prerelease qualifier, empty on the stable channel
    Channel,
    Major,
    Minor,
    Patch,
    Tag,
    Notes,
    Branch,
}

impl FromStr for Variable {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "version" => Ok(Variable::Version),
            "channel" => Ok(Variable::Channel),
            "major" => Ok(Variable::Major),
            "minor" => Ok(Variable::Minor),
            "patch" => Ok(Variable::Patch),
            "tag" => Ok(Variable::Tag),
            "notes" => Ok(Variable::Notes),
            "branch" => Ok(Variable::Branch),
            other => Err(ReleaseError::config(format!(
                "unknown placeholder '{{{{{}}}}}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(Variable),
    If {
        condition: Variable,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Var(&'a str),
    If(&'a str),
    Else,
    EndIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Else,
    EndIf,
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| ReleaseError::config("unclosed '{{' in template"))?;
        let inner = after[..end].trim();

        let token = if let Some(condition) = inner.strip_prefix("#if") {
            Token::If(condition.trim())
        } else if inner == "else" {
            Token::Else
        } else if inner == "/if" {
            Token::EndIf
        } else {
            Token::Var(inner)
        };
        tokens.push(token);
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn parse_block(tokens: &[Token<'_>], pos: &mut usize) -> Result<(Vec<Node>, Option<Terminator>)> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        match *token {
            Token::Text(text) => nodes.push(Node::Text(text.to_string())),
            Token::Var(name) => nodes.push(Node::Var(name.parse()?)),
            Token::Else => return Ok((nodes, Some(Terminator::Else))),
            Token::EndIf => return Ok((nodes, Some(Terminator::EndIf))),
            Token::If(name) => {
                if name.is_empty() {
                    return Err(ReleaseError::config("'{{#if}}' without a condition"));
                }
                let condition: Variable = name.parse()?;
                let (then, terminator) = parse_block(tokens, pos)?;
                let otherwise = match terminator {
                    Some(Terminator::EndIf) => Vec::new(),
                    Some(Terminator::Else) => match parse_block(tokens, pos)? {
                        (otherwise, Some(Terminator::EndIf)) => otherwise,
                        (_, Some(Terminator::Else)) => {
                            return Err(ReleaseError::config("duplicate '{{else}}' in '{{#if}}'"))
                        }
                        (_, None) => return Err(ReleaseError::config("'{{#if}}' is never closed")),
                    },
                    None => return Err(ReleaseError::config("'{{#if}}' is never closed")),
                };
                nodes.push(Node::If {
                    condition,
                    then,
                    otherwise,
                });
            }
        }
    }

    Ok((nodes, None))
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template. Unknown placeholders and unbalanced blocks are
    /// configuration errors.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source).map_err(|e| with_source(e, source))?;
        let mut pos = 0;
        let (nodes, terminator) = parse_block(&tokens, &mut pos).map_err(|e| with_source(e, source))?;

        match terminator {
            None => Ok(Template {
                source: source.to_string(),
                nodes,
            }),
            Some(Terminator::Else) => Err(with_source(
                ReleaseError::config("'{{else}}' outside of '{{#if}}'"),
                source,
            )),
            Some(Terminator::EndIf) => Err(with_source(
                ReleaseError::config("'{{/if}}' without matching '{{#if}}'"),
                source,
            )),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &ReleaseContext) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, ctx, &mut out);
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn with_source(err: ReleaseError, source: &str) -> ReleaseError {
    match err {
        ReleaseError::Config(msg) => ReleaseError::config(format!("template '{}': {}", source, msg)),
        other => other,
    }
}

fn render_nodes(nodes: &[Node], ctx: &ReleaseContext, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(variable) => out.push_str(&ctx.value(*variable)),
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                if ctx.value(*condition).is_empty() {
                    render_nodes(otherwise, ctx, out);
                } else {
                    render_nodes(then, ctx, out);
                }
            }
        }
    }
}

/// Parse an ordered list of templates
pub fn parse_all(sources: &[String]) -> Result<Vec<Template>> {
    sources.iter().map(|s| Template::parse(s)).collect()
}

/// Render each template independently, preserving order
pub fn render_all(templates: &[Template], ctx: &ReleaseContext) -> Vec<String> {
    templates.iter().map(|t| t.render(ctx)).collect()
}
