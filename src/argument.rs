//! Argument encoding and the inline -> reference promotion scheme.
//!
//! Every non-declaration node begins as an owned [`PropertyRecord`] with no
//! ref id. The first time it is *used* as an operand of another node,
//! [`Node::encode_as_argument`] hands back an `Argument::Inline` clone of that
//! record. The second time, it promotes itself: the record is appended to the
//! model's reference table and the node remembers the resulting ref id, so
//! every later use (including this one) returns `Argument::Reference`.
//! Declarations skip the inline stage - their ref id is fixed at construction.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::model::node::PropertyRecord;

/// A ref id into a model's reference table. Stable once assigned.
pub type RefId = u32;

/// The tagged wire-form of one operand.
///
/// A bare JSON number could mean either a primitive integer or a reference
/// id, so `Reference` is instead written as the one-field object `{"ref": n}`
/// - the source format's own ambiguity there is resolved by the receiving
/// solver using per-operator argument schemas, which this client does not
/// have, and which the round-trip invariant (`fromJSON(toJSON(m)) == m`)
/// requires resolving unconditionally.
#[derive(Debug, Clone)]
pub enum Argument {
    Primitive(Primitive),
    Inline(Box<PropertyRecord>),
    Reference(RefId),
}

impl Serialize for Argument {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Argument::Primitive(p) => p.serialize(serializer),
            Argument::Inline(record) => record.serialize(serializer),
            Argument::Reference(id) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ref", id)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Argument {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        use serde_json::Value;

        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Number(_) | Value::Bool(_) => {
                serde_json::from_value(value).map(Argument::Primitive).map_err(D::Error::custom)
            }
            Value::Object(obj) if obj.len() == 1 && obj.contains_key("ref") => {
                let id = obj["ref"].as_u64().ok_or_else(|| D::Error::custom("ref must be an integer"))?;
                Ok(Argument::Reference(id as RefId))
            }
            Value::Object(_) => serde_json::from_value(value)
                .map(|r: PropertyRecord| Argument::Inline(Box::new(r)))
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("unexpected argument shape: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Primitive {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Primitive {
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Primitive::Int(v) => Some(v),
            Primitive::Bool(b) => Some(i64::from(b)),
            Primitive::Float(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Primitive::Int(v) => v as f64,
            Primitive::Bool(b) => f64::from(b),
            Primitive::Float(v) => v,
        }
    }
}

/// Reference-counted handle to a graph node. Shared by every typed wrapper
/// (`IntExpr`, `IntervalVar`, `CumulExpr`, ...) that points at it, so
/// promotion-on-second-use is visible through every holder at once.
pub struct Node {
    pub record: RefCell<PropertyRecord>,
    ref_id: Cell<Option<RefId>>,
    use_count: Cell<u32>,
    /// Declarations get their ref id at construction and never inline.
    pub is_declaration: bool,
}

impl Node {
    pub fn new(record: PropertyRecord) -> Rc<Node> {
        Rc::new(Node {
            record: RefCell::new(record),
            ref_id: Cell::new(None),
            use_count: Cell::new(0),
            is_declaration: false,
        })
    }

    /// Construct a declaration node already bound to `ref_id` (assigned by
    /// the caller when it pushes the record into the reference table).
    pub fn new_declaration(record: PropertyRecord, ref_id: RefId) -> Rc<Node> {
        Rc::new(Node {
            record: RefCell::new(record),
            ref_id: Cell::new(Some(ref_id)),
            use_count: Cell::new(0),
            is_declaration: true,
        })
    }

    pub fn ref_id(&self) -> Option<RefId> {
        self.ref_id.get()
    }

    /// Encode this node as an operand, performing the inline -> reference
    /// promotion on the node's second use.
    pub fn encode_as_argument(self: &Rc<Self>, refs: &mut Vec<PropertyRecord>) -> Argument {
        if let Some(id) = self.ref_id.get() {
            return Argument::Reference(id);
        }
        let count = self.use_count.get() + 1;
        self.use_count.set(count);
        if count == 1 {
            Argument::Inline(Box::new(self.record.borrow().clone()))
        } else {
            let id = refs.len() as RefId;
            refs.push(self.record.borrow().clone());
            self.ref_id.set(Some(id));
            Argument::Reference(id)
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("ref_id", &self.ref_id.get())
            .field("use_count", &self.use_count.get())
            .field("record", &self.record.borrow())
            .finish()
    }
}
