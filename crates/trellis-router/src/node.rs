//! Compressed prefix-tree node implementation.
//!
//! This module provides the core radix tree (compressed trie) data structure
//! used for path matching. Static path bytes are stored in compressed runs
//! that may cover partial segments or span several segments; parameter and
//! wildcard segments hang off dedicated child slots.

use crate::error::RouteError;
use crate::method_map::MethodMap;
use crate::params::Params;

/// Type of path position a node matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// A literal byte run (e.g. "/users/", "rs").
    Static,
    /// A named parameter matching one non-empty, non-slash segment.
    Param(String),
    /// A named catch-all matching the remainder of the path.
    Wildcard(String),
}

/// One token of a parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A literal byte run, slashes included.
    Literal(String),
    /// `:name`: one segment, bound under `name`.
    Param(String),
    /// `*name`: the path remainder, bound under `name`. Always terminal.
    Wildcard(String),
}

/// Parses a route pattern into tokens, validating its shape.
///
/// Structural problems (missing leading slash, empty names, a non-terminal
/// wildcard) are configuration errors raised here, at registration time.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Token>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    let segments: Vec<&str> = pattern.split('/').skip(1).collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();

    for (i, segment) in segments.iter().enumerate() {
        literal.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteError::EmptyParamName {
                    pattern: pattern.to_string(),
                });
            }
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
            tokens.push(Token::Param(name.to_string()));
        } else if let Some(name) = segment.strip_prefix('*') {
            if name.is_empty() {
                return Err(RouteError::EmptyWildcardName {
                    pattern: pattern.to_string(),
                });
            }
            if i + 1 != segments.len() {
                return Err(RouteError::WildcardNotTerminal {
                    pattern: pattern.to_string(),
                });
            }
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
            tokens.push(Token::Wildcard(name.to_string()));
        } else {
            literal.push_str(segment);
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

/// Length of the longest common prefix of `a` and `b`, in bytes,
/// backed off to a character boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    // Identical prefixes share boundaries, so checking one side is enough.
    while !a.is_char_boundary(len) {
        len -= 1;
    }
    len
}

/// Percent-decodes a bound parameter segment.
///
/// Segments that do not decode to valid UTF-8 are bound verbatim.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned)
}

/// A node in the compressed prefix tree.
///
/// Each static node owns a literal byte run; splitting on insertion keeps
/// sibling runs disjoint in their first byte, so lookup examines at most one
/// static child before falling back to the parameter and wildcard children.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    /// The literal byte run this node matches (empty for param/wildcard nodes).
    prefix: String,

    /// What kind of path position this node matches.
    kind: SegmentKind,

    /// Per-method values, set only for explicitly registered (method, path) pairs.
    methods: Option<MethodMap<T>>,

    /// Static continuations, disjoint in their first byte.
    static_children: Vec<Node<T>>,

    /// Parameter child (at most one per node).
    param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node, always terminal).
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    /// Creates the root node of a tree.
    pub(crate) fn root() -> Self {
        Self::new_static(String::new())
    }

    fn new_static(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            kind: SegmentKind::Static,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    fn new_param(name: &str) -> Self {
        Self {
            prefix: String::new(),
            kind: SegmentKind::Param(name.to_string()),
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    fn new_wildcard(name: &str) -> Self {
        Self {
            prefix: String::new(),
            kind: SegmentKind::Wildcard(name.to_string()),
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Inserts the remaining `tokens` of a pattern below this node.
    ///
    /// At the terminal node the per-method values are merged in,
    /// last registration winning.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        tokens: &[Token],
        methods: MethodMap<T>,
    ) -> Result<(), RouteError> {
        let Some(token) = tokens.first() else {
            match &mut self.methods {
                Some(existing) => existing.merge(methods),
                None => self.methods = Some(methods),
            }
            return Ok(());
        };

        match token {
            Token::Literal(lit) => self.insert_literal(pattern, lit, &tokens[1..], methods),
            Token::Param(name) => {
                if let Some(child) = &mut self.param_child {
                    if let SegmentKind::Param(existing) = &child.kind {
                        if existing != name {
                            return Err(RouteError::ParamNameConflict {
                                pattern: pattern.to_string(),
                                existing: existing.clone(),
                                conflicting: name.clone(),
                            });
                        }
                    }
                    child.insert(pattern, &tokens[1..], methods)
                } else {
                    let mut child = Node::new_param(name);
                    child.insert(pattern, &tokens[1..], methods)?;
                    self.param_child = Some(Box::new(child));
                    Ok(())
                }
            }
            Token::Wildcard(name) => {
                if let Some(child) = &mut self.wildcard_child {
                    if let SegmentKind::Wildcard(existing) = &child.kind {
                        if existing != name {
                            return Err(RouteError::WildcardNameConflict {
                                pattern: pattern.to_string(),
                                existing: existing.clone(),
                                conflicting: name.clone(),
                            });
                        }
                    }
                    child.insert(pattern, &tokens[1..], methods)
                } else {
                    let mut child = Node::new_wildcard(name);
                    child.insert(pattern, &tokens[1..], methods)?;
                    self.wildcard_child = Some(Box::new(child));
                    Ok(())
                }
            }
        }
    }

    /// Inserts a literal run, splitting this node when the run diverges
    /// partway through the node's own prefix.
    fn insert_literal(
        &mut self,
        pattern: &str,
        lit: &str,
        rest: &[Token],
        methods: MethodMap<T>,
    ) -> Result<(), RouteError> {
        let common = common_prefix_len(&self.prefix, lit);

        if common < self.prefix.len() {
            // Split: demote this node's remainder into a child holding
            // everything the node used to own.
            let demoted = Node {
                prefix: self.prefix[common..].to_string(),
                kind: SegmentKind::Static,
                methods: self.methods.take(),
                static_children: std::mem::take(&mut self.static_children),
                param_child: self.param_child.take(),
                wildcard_child: self.wildcard_child.take(),
            };
            self.prefix.truncate(common);
            self.static_children.push(demoted);
        }

        let remainder = &lit[common..];
        if remainder.is_empty() {
            return self.insert(pattern, rest, methods);
        }

        let first = remainder.as_bytes()[0];
        if let Some(child) = self
            .static_children
            .iter_mut()
            .find(|c| c.prefix.as_bytes().first() == Some(&first))
        {
            return child.insert_literal(pattern, remainder, rest, methods);
        }

        let mut child = Node::new_static(remainder);
        child.insert(pattern, rest, methods)?;
        self.static_children.push(child);
        Ok(())
    }

    /// Matches `path` below this node, binding parameters along the way.
    ///
    /// At every branch point a static child is preferred over the parameter
    /// child, and the parameter child over the wildcard child, so the most
    /// specific registered route wins. Bindings made along a branch that
    /// fails are truncated away before the next candidate is tried.
    pub(crate) fn find<'a>(&'a self, path: &str, params: &mut Params) -> Option<&'a MethodMap<T>> {
        let rest = match &self.kind {
            SegmentKind::Static => path.strip_prefix(self.prefix.as_str())?,
            SegmentKind::Param(name) => {
                let end = path.find('/').unwrap_or(path.len());
                if end == 0 {
                    return None;
                }
                params.push(name.clone(), decode_segment(&path[..end]));
                &path[end..]
            }
            SegmentKind::Wildcard(name) => {
                params.push(name.clone(), path.to_string());
                ""
            }
        };

        if rest.is_empty() {
            if self.methods.is_some() {
                return self.methods.as_ref();
            }
            // A wildcard matches zero segments when the path ends exactly
            // at its mount point.
            if let Some(child) = &self.wildcard_child {
                if child.methods.is_some() {
                    if let SegmentKind::Wildcard(name) = &child.kind {
                        params.push(name.clone(), String::new());
                    }
                    return child.methods.as_ref();
                }
            }
            return None;
        }

        let mark = params.len();
        let first = rest.as_bytes()[0];

        if let Some(child) = self
            .static_children
            .iter()
            .find(|c| c.prefix.as_bytes().first() == Some(&first))
        {
            if let Some(found) = child.find(rest, params) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.param_child {
            if let Some(found) = child.find(rest, params) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.wildcard_child {
            return child.find(rest, params);
        }

        None
    }
}
