//! Property expressions and CloudFormation intrinsic functions.
//!
//! Resource properties are trees of [`Expr`]. Plain values serialize as
//! themselves; intrinsic functions serialize to their single-key JSON object
//! forms (`{"Ref": ...}`, `{"Fn::GetAtt": [...]}` and so on).
//!
//! [`Expr::Imported`] marks a value owned by another stack. It only exists
//! between construction and synthesis: the app resolves it into an
//! `Fn::ImportValue` (or a local expression when producer and consumer are the
//! same stack) before any template is rendered.

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;

/// Prefix of CloudFormation pseudo parameters (`AWS::Region`, ...).
const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

/// A property value in a resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A scalar JSON value.
    Literal(Value),
    /// A list of expressions.
    List(Vec<Expr>),
    /// An object with ordered keys.
    Object(IndexMap<String, Expr>),
    /// `Ref` to a resource or pseudo parameter.
    Ref(String),
    /// `Fn::GetAtt` on a resource attribute.
    GetAtt(String, String),
    /// `Fn::Join` of the parts with a delimiter.
    Join(String, Vec<Expr>),
    /// `Fn::Select` of an index from a list.
    Select(u32, Box<Expr>),
    /// `Fn::Split` of a string by a delimiter.
    Split(String, Box<Expr>),
    /// `Fn::Sub` template string.
    Sub(String),
    /// `Fn::ImportValue` of an exported output.
    ImportValue(String),
    /// Unresolved reference to a value owned by another stack.
    Imported {
        /// Name of the producing stack.
        producer: String,
        /// Expression evaluated inside the producing stack.
        value: Box<Expr>,
    },
}

impl Expr {
    /// A string literal.
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Literal(Value::String(s.into()))
    }

    /// `Ref` to a logical id.
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Expr::Ref(logical_id.into())
    }

    /// `Fn::GetAtt` of a logical id's attribute.
    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt(logical_id.into(), attribute.into())
    }

    /// `Fn::Join` with a delimiter.
    pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
        Expr::Join(delimiter.into(), parts)
    }

    /// `Fn::Sub` template string.
    pub fn sub(template: impl Into<String>) -> Self {
        Expr::Sub(template.into())
    }

    /// A value read from `producer`.
    pub fn imported(producer: impl Into<String>, value: Expr) -> Self {
        Expr::Imported {
            producer: producer.into(),
            value: Box::new(value),
        }
    }

    /// An object from key/value pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Expr)>,
    {
        Expr::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A list of string literals.
    pub fn str_list<S: AsRef<str>>(items: &[S]) -> Self {
        Expr::List(items.iter().map(|s| Expr::str(s.as_ref())).collect())
    }

    /// Returns the string if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the logical id this expression points at, for `Ref` and
    /// `Fn::GetAtt` only.
    pub fn target_logical_id(&self) -> Option<&str> {
        match self {
            Expr::Ref(id) | Expr::GetAtt(id, _) if !id.starts_with(PSEUDO_PARAMETER_PREFIX) => {
                Some(id)
            }
            _ => None,
        }
    }

    /// Look up a key when this is an object.
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Collect every logical id referenced through `Ref`/`Fn::GetAtt` in
    /// this tree, skipping pseudo parameters and unresolved imports.
    pub fn local_references(&self, out: &mut Vec<String>) {
        match self {
            Expr::Ref(_) | Expr::GetAtt(_, _) => {
                if let Some(id) = self.target_logical_id() {
                    out.push(id.to_string());
                }
            }
            Expr::List(items) | Expr::Join(_, items) => {
                items.iter().for_each(|e| e.local_references(out));
            }
            Expr::Object(map) => map.values().for_each(|e| e.local_references(out)),
            Expr::Select(_, inner) | Expr::Split(_, inner) => inner.local_references(out),
            Expr::Literal(_) | Expr::Sub(_) | Expr::ImportValue(_) | Expr::Imported { .. } => {}
        }
    }

    /// Replace every [`Expr::Imported`] in the tree with the result of `f`.
    pub fn resolve_imports<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&str, &Expr) -> Result<Expr>,
    {
        match self {
            Expr::Imported { producer, value } => {
                let resolved = f(producer, value)?;
                *self = resolved;
            }
            Expr::List(items) | Expr::Join(_, items) => {
                for item in items {
                    item.resolve_imports(f)?;
                }
            }
            Expr::Object(map) => {
                for value in map.values_mut() {
                    value.resolve_imports(f)?;
                }
            }
            Expr::Select(_, inner) | Expr::Split(_, inner) => inner.resolve_imports(f)?,
            Expr::Literal(_) | Expr::Ref(_) | Expr::GetAtt(_, _) | Expr::Sub(_) | Expr::ImportValue(_) => {}
        }
        Ok(())
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr::Literal(Value::from(n))
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(items: Vec<Expr>) -> Self {
        Expr::List(items)
    }
}

/// Serialize a single-key object `{ key: value }`.
fn single<S, V>(serializer: S, key: &str, value: &V) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// `[delimiter, [parts...]]` and similar two-element argument lists.
struct Pair<'a, A: ?Sized, B: ?Sized>(&'a A, &'a B);

impl<A: Serialize + ?Sized, B: Serialize + ?Sized> Serialize for Pair<'_, A, B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(self.0)?;
        seq.serialize_element(self.1)?;
        seq.end()
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Expr::Literal(value) => value.serialize(serializer),
            Expr::List(items) => items.serialize(serializer),
            Expr::Object(map) => map.serialize(serializer),
            Expr::Ref(id) => single(serializer, "Ref", id),
            Expr::GetAtt(id, attr) => single(serializer, "Fn::GetAtt", &Pair(id, attr)),
            Expr::Join(delimiter, parts) => single(serializer, "Fn::Join", &Pair(delimiter, parts)),
            Expr::Select(index, list) => {
                single(serializer, "Fn::Select", &Pair(&index.to_string(), list.as_ref()))
            }
            Expr::Split(delimiter, source) => {
                single(serializer, "Fn::Split", &Pair(delimiter, source.as_ref()))
            }
            Expr::Sub(template) => single(serializer, "Fn::Sub", template),
            Expr::ImportValue(name) => single(serializer, "Fn::ImportValue", name),
            Expr::Imported { producer, .. } => Err(S::Error::custom(format!(
                "unresolved cross-stack reference to stack '{}'",
                producer
            ))),
        }
    }
}
