//! Parsing pass: walks the finished token list and writes every value into
//! its final resting place inside one allocation sized exactly by the
//! lexer's tally.
//!
//! The parser never recounts children; it trusts the counts the lexer
//! recorded on container-begin tokens, and the byte budget turns any
//! accounting disagreement into an internal error instead of a memory
//! overrun. After a successful parse the budget must be exactly exhausted.

pub(crate) mod pool;

use crate::doc::{hash_key, DocArena, Document, ValueId, ValueNode, NIL};
use crate::error::Error;
use crate::lex::{lex, SizeTally, Token, TokenKind};
use crate::scope::{ScopeStack, NO_SLOT};
use crate::Result;

use pool::Scratch;

/// Parses a complete JSON document. The top-level value must be an object.
pub(crate) fn parse(input: &str) -> Result<Document> {
    let mut scratch = pool::take_scratch();
    let result = parse_with_scratch(input, &mut scratch);
    pool::put_scratch(scratch);
    result
}

/// Runs only the lexing pass and returns its size tally. Validates string
/// termination and container balance but not structure.
pub(crate) fn measure(input: &str) -> Result<SizeTally> {
    let mut scratch = pool::take_scratch();
    let result = lex(input, &mut scratch.tokens, &mut scratch.scopes);
    pool::put_scratch(scratch);
    result
}

fn parse_with_scratch(input: &str, scratch: &mut Scratch) -> Result<Document> {
    let Scratch { tokens, scopes } = scratch;
    let tally = lex(input, tokens, scopes)?;
    let parser = Parser {
        input,
        arena: DocArena::with_capacities(
            tally.values,
            tally.pair_slots,
            tally.child_slots,
            tally.text_bytes,
            tally.required_bytes(),
        ),
        scopes,
        root: NIL,
    };
    parser.run(tokens, &tally)
}

struct Parser<'a, 'b> {
    input: &'a str,
    arena: DocArena,
    scopes: &'b mut ScopeStack,
    root: ValueId,
}

impl Parser<'_, '_> {
    fn run(mut self, tokens: &[Token], tally: &SizeTally) -> Result<Document> {
        self.scopes.reset();

        match tokens.first().map(|token| token.kind) {
            Some(TokenKind::ObjectBegin) => {}
            _ => return Err(Error::TopLevelNotObject),
        }

        for token in tokens {
            let at = token.start as usize;
            match token.kind {
                TokenKind::ObjectBegin => {
                    let first_slot = self.arena.alloc_pairs(token.children)?;
                    let id = self.arena.push_value(ValueNode::Object {
                        first_slot,
                        capacity: token.children,
                    })?;
                    self.register(id, at)?;
                    let scope = self.scopes.open(id, true);
                    self.scopes.node_mut(scope).child_count = token.children;
                }
                TokenKind::ArrayBegin => {
                    let first_child = self.arena.alloc_children(token.children)?;
                    let id = self.arena.push_value(ValueNode::Array {
                        first_child,
                        len: token.children,
                    })?;
                    self.register(id, at)?;
                    let scope = self.scopes.open(id, false);
                    self.scopes.node_mut(scope).child_count = token.children;
                }
                TokenKind::ObjectEnd | TokenKind::ArrayEnd => self.close_scope()?,
                TokenKind::Key => self.insert_key(token)?,
                TokenKind::Str => {
                    let span = self.arena.intern_text(token.text(self.input))?;
                    let id = self.arena.push_value(ValueNode::Str(span))?;
                    self.register(id, at)?;
                }
                TokenKind::Int => {
                    let text = token.text(self.input);
                    let value: i64 = text.parse().map_err(|_| Error::MalformedNumber {
                        text: text.to_string(),
                        at,
                    })?;
                    let id = self.arena.push_value(ValueNode::Int(value))?;
                    self.register(id, at)?;
                }
                TokenKind::Float => {
                    let text = token.text(self.input);
                    let value: f64 = text.parse().map_err(|_| Error::MalformedNumber {
                        text: text.to_string(),
                        at,
                    })?;
                    let id = self.arena.push_value(ValueNode::Float(value))?;
                    self.register(id, at)?;
                }
                TokenKind::Eof => break,
            }
        }

        let remaining = self.arena.remaining_budget();
        if remaining != 0 {
            return Err(Error::BudgetSlack { remaining });
        }
        Ok(Document {
            arena: self.arena,
            root: self.root,
            byte_size: tally.required_bytes(),
        })
    }

    /// Wires a freshly built value into its container: the next array slot,
    /// the pair slot pending from the last key, or the document root.
    fn register(&mut self, id: ValueId, at: usize) -> Result<()> {
        let Some(scope) = self.scopes.current() else {
            if self.root == NIL {
                self.root = id;
                return Ok(());
            }
            // The root object already closed.
            return match self.arena.value(id) {
                ValueNode::Object { .. } | ValueNode::Array { .. } => {
                    Err(Error::TrailingToken { at })
                }
                _ => Err(Error::ValueOutsideContainer { at }),
            };
        };

        let node = self.scopes.node(scope);
        if node.is_object {
            let slot = node.pending_slot;
            if slot == NO_SLOT {
                return Err(Error::ValueWithoutKey { at });
            }
            self.arena.pair_mut(slot).value = id;
            let node = self.scopes.node_mut(scope);
            node.pending_slot = NO_SLOT;
            node.write_index += 1;
        } else {
            if node.write_index >= node.child_count {
                return Err(Error::CountMismatch {
                    expected: node.child_count as usize,
                    wrote: node.write_index as usize + 1,
                });
            }
            let first_child = match self.arena.value(node.owner) {
                ValueNode::Array { first_child, .. } => *first_child,
                _ => unreachable!("array scope always owns an array value"),
            };
            let slot = first_child + node.write_index;
            *self.arena.child_mut(slot) = id;
            self.scopes.node_mut(scope).write_index += 1;
        }
        Ok(())
    }

    /// Places a key into the current object's table with linear open
    /// addressing and remembers the slot as the write target for the next
    /// value.
    fn insert_key(&mut self, token: &Token) -> Result<()> {
        let key = token.text(self.input);
        let Some(scope) = self.scopes.current() else {
            return Err(Error::KeyOutsideObject {
                key: key.to_string(),
            });
        };
        let node = self.scopes.node(scope);
        if !node.is_object {
            return Err(Error::KeyOutsideObject {
                key: key.to_string(),
            });
        }
        if node.pending_slot != NO_SLOT {
            // Two keys in a row: the first never got its value.
            let dangling = self.arena.pair(node.pending_slot).key;
            return Err(Error::MissingValue {
                key: self.arena.text_str(dangling).to_string(),
            });
        }

        let (first_slot, capacity) = match self.arena.value(node.owner) {
            ValueNode::Object {
                first_slot,
                capacity,
            } => (*first_slot, *capacity),
            _ => unreachable!("object scope always owns an object value"),
        };
        // The table is sized to the object's value count, so running out of
        // slots means a key arrived without a value to pair with it.
        if capacity == 0 {
            return Err(Error::MissingValue {
                key: key.to_string(),
            });
        }

        let span = self.arena.intern_text(key)?;
        let mut index = hash_key(key.as_bytes()) % capacity;
        for _ in 0..capacity {
            let slot = first_slot + index;
            let pair = self.arena.pair(slot);
            if pair.is_vacant() {
                self.arena.pair_mut(slot).key = span;
                self.scopes.node_mut(scope).pending_slot = slot;
                return Ok(());
            }
            if self.arena.text_str(pair.key) == key {
                return Err(Error::DuplicateKey {
                    key: key.to_string(),
                });
            }
            index = (index + 1) % capacity;
        }
        Err(Error::MissingValue {
            key: key.to_string(),
        })
    }

    fn close_scope(&mut self) -> Result<()> {
        let node = self
            .scopes
            .close()
            .expect("lexer guarantees balanced containers");
        if node.is_object && node.pending_slot != NO_SLOT {
            let dangling = self.arena.pair(node.pending_slot).key;
            return Err(Error::MissingValue {
                key: self.arena.text_str(dangling).to_string(),
            });
        }
        if node.write_index != node.child_count {
            return Err(Error::CountMismatch {
                expected: node.child_count as usize,
                wrote: node.write_index as usize,
            });
        }
        Ok(())
    }
}
