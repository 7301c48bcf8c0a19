//! Template expressions, embedded tokens and the deep token scanner.
//!
//! An element's synthesized fragment is an [`Expr`]: a JSON-like tree in which
//! some leaves are [`Token`]s. Tokens are placeholders that only become concrete
//! when a stack's template is rendered:
//!
//! - [`Token::Reference`] - a `Ref` or `Fn::GetAtt` against another element,
//!   possibly living in another stack
//! - [`Token::Pseudo`] - a deployment-time pseudo parameter such as `AWS::Region`
//!
//! [`find_tokens`] walks an expression and returns every token it contains;
//! [`Token::as_reference`] narrows a token to the cross-stack kind.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::PLACEHOLDER_OPEN;
use crate::tree::NodeId;

/// The attribute a [`Reference`] reads from its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Attribute {
    /// The element's identity (`{"Ref": ...}`).
    Ref,
    /// A named attribute (`{"Fn::GetAtt": [..., name]}`).
    GetAtt(String),
}

impl Attribute {
    /// Name used in generated ids and dependency reasons.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ref => "Ref",
            Self::GetAtt(name) => name,
        }
    }
}

/// An unresolved link from a property to a target element's attribute.
///
/// The pair (target, attribute) is the reference's identity: two references
/// reading the same attribute of the same element are the same reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Reference {
    /// The referenced element
    pub target: NodeId,
    /// What is read from it
    pub attribute: Attribute,
}

impl Reference {
    /// Reference to the identity of `target`.
    #[must_use]
    pub const fn to_ref(target: NodeId) -> Self {
        Self {
            target,
            attribute: Attribute::Ref,
        }
    }

    /// Reference to the attribute `name` of `target`.
    pub fn get_att(target: NodeId, name: impl Into<String>) -> Self {
        Self {
            target,
            attribute: Attribute::GetAtt(name.into()),
        }
    }

    /// Name of the referenced attribute (`Ref` for plain references).
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.attribute.display_name()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.display_name())
    }
}

/// Deployment-time values provided by the backend for every stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PseudoParameter {
    AccountId,
    Region,
    Partition,
    StackName,
    StackId,
    UrlSuffix,
    NotificationArns,
}

impl PseudoParameter {
    /// The backend name, e.g. `AWS::Region`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::StackName => "AWS::StackName",
            Self::StackId => "AWS::StackId",
            Self::UrlSuffix => "AWS::URLSuffix",
            Self::NotificationArns => "AWS::NotificationARNs",
        }
    }

    /// Parse a backend name back into a pseudo parameter.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::AccountId,
            Self::Region,
            Self::Partition,
            Self::StackName,
            Self::StackId,
            Self::UrlSuffix,
            Self::NotificationArns,
        ]
        .into_iter()
        .find(|p| p.name() == name)
    }
}

/// A placeholder embedded in an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Token {
    /// Cross-element reference; may cross stack boundaries.
    Reference(Reference),
    /// Pseudo parameter; always resolvable in place.
    Pseudo(PseudoParameter),
}

impl Token {
    /// Narrow this token to a reference.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Pseudo(_) => None,
        }
    }
}

/// A JSON-like template expression that may contain tokens.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Expr {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Expr>),
    Map(BTreeMap<String, Expr>),
    Token(Token),
}

impl Expr {
    /// Build a map expression from key/value pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Expression holding a single reference token.
    #[must_use]
    pub const fn reference(reference: Reference) -> Self {
        Self::Token(Token::Reference(reference))
    }

    /// Whether the expression contains no tokens at all.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        find_tokens(self).is_empty()
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Reference> for Expr {
    fn from(value: Reference) -> Self {
        Self::reference(value)
    }
}

/// The terminal, backend-consumable form of a reference for one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedValue {
    /// A reference local to the consuming stack: the original reference, a
    /// parameter, or an output attribute of a nested stack resource.
    Reference(Reference),
    /// `Fn::ImportValue` of a named export.
    Import {
        /// The export name
        export_name: String,
    },
}

impl ResolvedValue {
    /// Expression form, used wherever the resolved value is embedded.
    #[must_use]
    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Reference(reference) => Expr::reference(reference.clone()),
            Self::Import { export_name } => {
                Expr::map([("Fn::ImportValue", Expr::String(export_name.clone()))])
            }
        }
    }

    /// The local reference, when the value is not an import.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Import { .. } => None,
        }
    }
}

/// Return every token embedded in `expr`, in depth-first order.
#[must_use]
pub fn find_tokens(expr: &Expr) -> Vec<Token> {
    let mut tokens = Vec::new();
    collect_tokens(expr, &mut tokens);
    tokens
}

fn collect_tokens(expr: &Expr, out: &mut Vec<Token>) {
    match expr {
        Expr::Token(token) => out.push(token.clone()),
        Expr::List(items) => items.iter().for_each(|item| collect_tokens(item, out)),
        Expr::Map(entries) => entries.values().for_each(|value| collect_tokens(value, out)),
        Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::String(_) => {}
    }
}

/// Return every reference embedded in `expr`, skipping other token kinds.
#[must_use]
pub fn find_references(expr: &Expr) -> Vec<Reference> {
    find_tokens(expr).into_iter().filter_map(|t| t.as_reference().cloned()).collect()
}

/// Whether `value` still contains an unresolved `${...}` placeholder.
#[must_use]
pub fn is_unresolved(value: &str) -> bool {
    value.find(PLACEHOLDER_OPEN).is_some_and(|start| value[start..].contains('}'))
}
