//! The materialized document: one arena holding every value node, object
//! table slot, array element slot and string payload, allocated once at the
//! exact size the lexing pass tallied.
//!
//! Everything is addressed by integer index into the arena's contiguous
//! buffers. Nothing here mutates after the parse completes, so a [`Document`]
//! can be shared across any number of concurrent readers.

use std::fmt;

use crate::error::Error;
use crate::Result;

pub(crate) type ValueId = u32;

/// Sentinel for a vacant table/element slot. Never observable through the
/// public API of a successfully parsed document.
pub(crate) const NIL: ValueId = ValueId::MAX;

/// Byte range into the arena's string block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextSpan {
    pub start: u32,
    pub len: u32,
}

impl TextSpan {
    pub(crate) const EMPTY: TextSpan = TextSpan { start: 0, len: 0 };
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ValueNode {
    Str(TextSpan),
    Int(i64),
    Float(f64),
    Object { first_slot: u32, capacity: u32 },
    Array { first_child: u32, len: u32 },
}

/// One open-addressed table slot: key text plus the value it maps to.
/// `value == NIL` marks a vacant slot during construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairSlot {
    pub key: TextSpan,
    pub value: ValueId,
}

impl PairSlot {
    const VACANT: PairSlot = PairSlot {
        key: TextSpan::EMPTY,
        value: NIL,
    };

    pub(crate) fn is_vacant(&self) -> bool {
        self.value == NIL
    }
}

/// Polynomial rolling hash over raw key bytes, `h = h*31 + byte`.
pub(crate) fn hash_key(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in bytes {
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
    }
    hash
}

/// Backing storage for a parsed document. Capacities are fixed up front from
/// the lexer's tally; every allocation is charged against the remaining byte
/// budget so an accounting bug surfaces as an internal error instead of a
/// reallocation.
pub(crate) struct DocArena {
    values: Vec<ValueNode>,
    pairs: Vec<PairSlot>,
    children: Vec<ValueId>,
    text: String,
    budget: usize,
}

impl DocArena {
    pub(crate) fn with_capacities(
        values: usize,
        pair_slots: usize,
        child_slots: usize,
        text_bytes: usize,
        budget: usize,
    ) -> Self {
        Self {
            values: Vec::with_capacity(values),
            pairs: Vec::with_capacity(pair_slots),
            children: Vec::with_capacity(child_slots),
            text: String::with_capacity(text_bytes),
            budget,
        }
    }

    fn charge(&mut self, needed: usize) -> Result<()> {
        if needed > self.budget {
            return Err(Error::BudgetExceeded {
                needed,
                remaining: self.budget,
            });
        }
        self.budget -= needed;
        Ok(())
    }

    pub(crate) fn remaining_budget(&self) -> usize {
        self.budget
    }

    pub(crate) fn push_value(&mut self, node: ValueNode) -> Result<ValueId> {
        self.charge(std::mem::size_of::<ValueNode>())?;
        let id = self.values.len() as ValueId;
        self.values.push(node);
        Ok(id)
    }

    /// Copies string content into the arena's text block, with a NUL
    /// terminator byte after each run as the original layout budgets for.
    pub(crate) fn intern_text(&mut self, content: &str) -> Result<TextSpan> {
        self.charge(content.len() + 1)?;
        let start = self.text.len() as u32;
        self.text.push_str(content);
        self.text.push('\0');
        Ok(TextSpan {
            start,
            len: content.len() as u32,
        })
    }

    /// Reserves an object's whole table region at once, sized exactly to the
    /// key count recorded during lexing.
    pub(crate) fn alloc_pairs(&mut self, capacity: u32) -> Result<u32> {
        self.charge(capacity as usize * std::mem::size_of::<PairSlot>())?;
        let first = self.pairs.len() as u32;
        self.pairs
            .resize(first as usize + capacity as usize, PairSlot::VACANT);
        Ok(first)
    }

    pub(crate) fn alloc_children(&mut self, len: u32) -> Result<u32> {
        self.charge(len as usize * std::mem::size_of::<ValueId>())?;
        let first = self.children.len() as u32;
        self.children.resize(first as usize + len as usize, NIL);
        Ok(first)
    }

    pub(crate) fn value(&self, id: ValueId) -> &ValueNode {
        &self.values[id as usize]
    }

    pub(crate) fn pair(&self, slot: u32) -> &PairSlot {
        &self.pairs[slot as usize]
    }

    pub(crate) fn pair_mut(&mut self, slot: u32) -> &mut PairSlot {
        &mut self.pairs[slot as usize]
    }

    pub(crate) fn child(&self, slot: u32) -> ValueId {
        self.children[slot as usize]
    }

    pub(crate) fn child_mut(&mut self, slot: u32) -> &mut ValueId {
        &mut self.children[slot as usize]
    }

    pub(crate) fn text_str(&self, span: TextSpan) -> &str {
        &self.text[span.start as usize..(span.start + span.len) as usize]
    }
}

/// Tag of a document value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Object,
    Array,
}

impl ValueKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
        }
    }
}

/// A fully parsed, immutable JSON document.
pub struct Document {
    pub(crate) arena: DocArena,
    pub(crate) root: ValueId,
    pub(crate) byte_size: usize,
}

impl Document {
    /// The root object of the document.
    pub fn root(&self) -> ValueRef<'_> {
        ValueRef {
            arena: &self.arena,
            id: self.root,
        }
    }

    /// Looks up `key` on the root object.
    pub fn get(&self, key: &str) -> Result<ValueRef<'_>> {
        self.root().get(key)
    }

    /// Exact number of bytes the document's single allocation required, as
    /// tallied by the lexing pass and consumed by the parsing pass.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Serializes the document back into the grammar subset the parser
    /// accepts.
    pub fn to_json(&self) -> String {
        let mut out = String::with_capacity(self.byte_size);
        write_value(&mut out, self.root());
        out
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("byte_size", &self.byte_size)
            .field("json", &self.to_json())
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

/// Read-only handle to one value inside a [`Document`].
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    arena: &'a DocArena,
    id: ValueId,
}

impl<'a> ValueRef<'a> {
    pub fn kind(&self) -> ValueKind {
        match self.arena.value(self.id) {
            ValueNode::Str(_) => ValueKind::String,
            ValueNode::Int(_) => ValueKind::Integer,
            ValueNode::Float(_) => ValueKind::Float,
            ValueNode::Object { .. } => ValueKind::Object,
            ValueNode::Array { .. } => ValueKind::Array,
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        match self.arena.value(self.id) {
            ValueNode::Str(span) => Ok(self.arena.text_str(*span)),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self.arena.value(self.id) {
            ValueNode::Int(value) => Ok(*value),
            _ => Err(self.mismatch("integer")),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self.arena.value(self.id) {
            ValueNode::Float(value) => Ok(*value),
            _ => Err(self.mismatch("float")),
        }
    }

    pub fn as_object(&self) -> Result<ObjectRef<'a>> {
        match self.arena.value(self.id) {
            ValueNode::Object {
                first_slot,
                capacity,
            } => Ok(ObjectRef {
                arena: self.arena,
                first_slot: *first_slot,
                capacity: *capacity,
            }),
            _ => Err(self.mismatch("object")),
        }
    }

    pub fn as_array(&self) -> Result<ArrayRef<'a>> {
        match self.arena.value(self.id) {
            ValueNode::Array { first_child, len } => Ok(ArrayRef {
                arena: self.arena,
                first_child: *first_child,
                len: *len,
            }),
            _ => Err(self.mismatch("array")),
        }
    }

    /// Object member lookup; fails with a type mismatch on non-objects.
    pub fn get(&self, key: &str) -> Result<ValueRef<'a>> {
        self.as_object()?.get(key)
    }

    /// Array element lookup; fails with a type mismatch on non-arrays.
    pub fn at(&self, index: usize) -> Result<ValueRef<'a>> {
        self.as_array()?.at(index)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.kind().name(),
        }
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_value(&mut out, *self);
        f.write_str(&out)
    }
}

impl PartialEq for ValueRef<'_> {
    /// Structural equality: objects compare key-wise regardless of slot
    /// order, arrays element-wise in order.
    fn eq(&self, other: &Self) -> bool {
        match (self.arena.value(self.id), other.arena.value(other.id)) {
            (ValueNode::Str(a), ValueNode::Str(b)) => {
                self.arena.text_str(*a) == other.arena.text_str(*b)
            }
            (ValueNode::Int(a), ValueNode::Int(b)) => a == b,
            (ValueNode::Float(a), ValueNode::Float(b)) => a == b,
            (ValueNode::Object { .. }, ValueNode::Object { .. }) => {
                let lhs = self.as_object().expect("tag checked");
                let rhs = other.as_object().expect("tag checked");
                lhs.len() == rhs.len()
                    && lhs
                        .iter()
                        .all(|(key, value)| rhs.get(key).is_ok_and(|found| found == value))
            }
            (ValueNode::Array { .. }, ValueNode::Array { .. }) => {
                let lhs = self.as_array().expect("tag checked");
                let rhs = other.as_array().expect("tag checked");
                lhs.len() == rhs.len() && lhs.iter().zip(rhs.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

/// Read-only handle to an object's open-addressed table.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    arena: &'a DocArena,
    first_slot: u32,
    capacity: u32,
}

impl<'a> ObjectRef<'a> {
    /// Number of keys. The table capacity equals the key count, so every
    /// slot is occupied.
    pub fn len(&self) -> usize {
        self.capacity as usize
    }

    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Hash lookup with the same linear probing scheme used for insertion.
    /// Probing is bounded by the table capacity; an absent key fails with
    /// [`Error::KeyNotFound`].
    pub fn get(&self, key: &str) -> Result<ValueRef<'a>> {
        if self.capacity > 0 {
            let mut index = hash_key(key.as_bytes()) % self.capacity;
            for _ in 0..self.capacity {
                let slot = self.arena.pair(self.first_slot + index);
                if slot.is_vacant() {
                    break;
                }
                if self.arena.text_str(slot.key) == key {
                    return Ok(ValueRef {
                        arena: self.arena,
                        id: slot.value,
                    });
                }
                index = (index + 1) % self.capacity;
            }
        }
        Err(Error::KeyNotFound {
            key: key.to_string(),
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Iterates entries in table slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, ValueRef<'a>)> + '_ {
        let arena = self.arena;
        (self.first_slot..self.first_slot + self.capacity).filter_map(move |slot| {
            let pair = arena.pair(slot);
            if pair.is_vacant() {
                return None;
            }
            Some((
                arena.text_str(pair.key),
                ValueRef {
                    arena,
                    id: pair.value,
                },
            ))
        })
    }
}

/// Read-only handle to an array's contiguous element run.
#[derive(Clone, Copy)]
pub struct ArrayRef<'a> {
    arena: &'a DocArena,
    first_child: u32,
    len: u32,
}

impl<'a> ArrayRef<'a> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<ValueRef<'a>> {
        if index >= self.len as usize {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len as usize,
            });
        }
        Ok(ValueRef {
            arena: self.arena,
            id: self.arena.child(self.first_child + index as u32),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueRef<'a>> + '_ {
        let arena = self.arena;
        (self.first_child..self.first_child + self.len).map(move |slot| ValueRef {
            arena,
            id: arena.child(slot),
        })
    }
}

fn write_value(out: &mut String, value: ValueRef<'_>) {
    match value.kind() {
        ValueKind::String => {
            out.push('"');
            out.push_str(value.as_str().expect("tag checked"));
            out.push('"');
        }
        ValueKind::Integer => {
            let mut buffer = itoa::Buffer::new();
            out.push_str(buffer.format(value.as_int().expect("tag checked")));
        }
        ValueKind::Float => {
            write_float(out, value.as_float().expect("tag checked"));
        }
        ValueKind::Object => {
            out.push('{');
            let mut first = true;
            for (key, member) in value.as_object().expect("tag checked").iter() {
                if !first {
                    out.push(',');
                }
                first = false;
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                write_value(out, member);
            }
            out.push('}');
        }
        ValueKind::Array => {
            out.push('[');
            let mut first = true;
            for element in value.as_array().expect("tag checked").iter() {
                if !first {
                    out.push(',');
                }
                first = false;
                write_value(out, element);
            }
            out.push(']');
        }
    }
}

/// Shortest round-trip form via ryu. The lexer has no exponent support, so
/// exponent forms are expanded into plain decimal by shifting the point
/// through ryu's digits, which keeps the value bit-exact.
pub(crate) fn write_float(out: &mut String, value: f64) {
    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format(value);
    match formatted.split_once(['e', 'E']) {
        None => out.push_str(formatted),
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().expect("ryu emits a valid exponent");
            let (sign, mantissa) = match mantissa.strip_prefix('-') {
                Some(rest) => ("-", rest),
                None => ("", mantissa),
            };
            let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
            let digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes()).collect();
            let point = int_part.len() as i32 + exponent;

            out.push_str(sign);
            if point <= 0 {
                out.push_str("0.");
                for _ in 0..-point {
                    out.push('0');
                }
                out.push_str(std::str::from_utf8(&digits).expect("ascii digits"));
            } else if point as usize >= digits.len() {
                out.push_str(std::str::from_utf8(&digits).expect("ascii digits"));
                for _ in 0..point as usize - digits.len() {
                    out.push('0');
                }
                // Keep the token a float.
                out.push_str(".0");
            } else {
                let (head, tail) = digits.split_at(point as usize);
                out.push_str(std::str::from_utf8(head).expect("ascii digits"));
                out.push('.');
                out.push_str(std::str::from_utf8(tail).expect("ascii digits"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(b"", 0)]
    #[case(b"a", 97)]
    #[case(b"ab", 97 * 31 + 98)]
    fn test_hash_key(#[case] bytes: &[u8], #[case] expected: u32) {
        assert_eq!(hash_key(bytes), expected);
    }

    #[rstest::rstest]
    fn test_budget_is_charged_and_exhausted() {
        let node_size = std::mem::size_of::<ValueNode>();
        let mut arena = DocArena::with_capacities(1, 0, 0, 4, node_size + 4);
        arena.push_value(ValueNode::Int(7)).unwrap();
        arena.intern_text("abc").unwrap();
        assert_eq!(arena.remaining_budget(), 0);

        let err = arena.push_value(ValueNode::Int(8)).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { remaining: 0, .. }));
    }

    #[rstest::rstest]
    fn test_interned_text_is_nul_separated() {
        let mut arena = DocArena::with_capacities(0, 0, 0, 8, 8);
        let first = arena.intern_text("ab").unwrap();
        let second = arena.intern_text("cde").unwrap();
        assert_eq!(arena.text_str(first), "ab");
        assert_eq!(arena.text_str(second), "cde");
        assert_eq!(second.start, 3);
    }

    #[rstest::rstest]
    #[case(1.5, "1.5")]
    #[case(-2.25, "-2.25")]
    #[case(1e-9, "0.000000001")]
    #[case(-4.25e-7, "-0.000000425")]
    #[case(3e20, "300000000000000000000.0")]
    fn test_float_writer_avoids_exponents(#[case] value: f64, #[case] expected: &str) {
        let mut out = String::new();
        write_float(&mut out, value);
        assert_eq!(out, expected);
    }

    #[rstest::rstest]
    #[case(1e-9)]
    #[case(123.456e18)]
    #[case(-9.87e-21)]
    fn test_float_writer_is_exact(#[case] value: f64) {
        let mut out = String::new();
        write_float(&mut out, value);
        assert_eq!(out.parse::<f64>().unwrap(), value);
    }
}
