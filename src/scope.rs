//! Stack of open-container records, recycled through a free list.
//!
//! The same stack serves two passes with different semantics: during lexing
//! each node only counts children (`child_count`); during parsing it tracks
//! where the next child lands (`write_index` for arrays, `pending_slot` for
//! objects). Nodes are addressed by index into one contiguous buffer, and a
//! closed node's index goes onto the free list for the next open, so deep or
//! wide documents never touch the allocator per nesting level.

use smallvec::SmallVec;

pub(crate) type ScopeId = u32;

/// Sentinel for "no pending object slot".
pub(crate) const NO_SLOT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeNode {
    pub parent: Option<ScopeId>,
    /// Children seen so far (lexing) or the container's fixed capacity
    /// (parsing).
    pub child_count: u32,
    /// Parsing only. Arrays: index of the next free element slot. Objects:
    /// number of values written into the table.
    pub write_index: u32,
    /// Parsing only. Objects: pair slot reserved by the most recent key,
    /// or [`NO_SLOT`].
    pub pending_slot: u32,
    /// Lexing: index of the container-begin token. Parsing: the container's
    /// value id in the document arena.
    pub owner: u32,
    pub is_object: bool,
}

pub(crate) struct ScopeStack {
    nodes: Vec<ScopeNode>,
    free: SmallVec<[ScopeId; 16]>,
    current: Option<ScopeId>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: SmallVec::new(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    /// Opens a new scope as a child of the current one and makes it current.
    /// Recycles a free-listed node when one is available.
    pub fn open(&mut self, owner: u32, is_object: bool) -> ScopeId {
        let node = ScopeNode {
            parent: self.current,
            child_count: 0,
            write_index: 0,
            pending_slot: NO_SLOT,
            owner,
            is_object,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                let id = self.nodes.len() as ScopeId;
                self.nodes.push(node);
                id
            }
        };
        self.current = Some(id);
        id
    }

    /// Pops the current scope, returns a copy of its node and resumes the
    /// parent. Returns `None` when no scope is open.
    pub fn close(&mut self) -> Option<ScopeNode> {
        let id = self.current?;
        let node = self.nodes[id as usize];
        self.free.push(id);
        self.current = node.parent;
        Some(node)
    }

    pub fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.nodes[id as usize]
    }

    pub fn node_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.nodes[id as usize]
    }

    pub fn current_mut(&mut self) -> Option<&mut ScopeNode> {
        self.current.map(|id| &mut self.nodes[id as usize])
    }

    /// Number of scopes still open; nonzero at end of input means an
    /// unterminated container.
    pub fn open_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Drains all state but keeps the node buffer capacity. Called between
    /// the lexing and parsing passes and before returning the stack to the
    /// scratch pool.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_open_close_tracks_parent() {
        let mut scopes = ScopeStack::new();
        let outer = scopes.open(0, true);
        let inner = scopes.open(1, false);
        assert_eq!(scopes.current(), Some(inner));
        assert_eq!(scopes.node(inner).parent, Some(outer));

        let closed = scopes.close().unwrap();
        assert_eq!(closed.owner, 1);
        assert!(!closed.is_object);
        assert_eq!(scopes.current(), Some(outer));

        scopes.close().unwrap();
        assert_eq!(scopes.current(), None);
        assert!(scopes.close().is_none());
    }

    #[rstest::rstest]
    fn test_nodes_are_recycled() {
        let mut scopes = ScopeStack::new();
        scopes.open(0, true);
        let first = scopes.open(1, false);
        scopes.close().unwrap();
        let second = scopes.open(2, false);
        // The freed node index is reused for the next open.
        assert_eq!(first, second);
        assert_eq!(scopes.node(second).owner, 2);
        assert_eq!(scopes.node(second).child_count, 0);
    }

    #[rstest::rstest]
    fn test_open_count_and_reset() {
        let mut scopes = ScopeStack::new();
        scopes.open(0, true);
        scopes.open(1, false);
        scopes.close().unwrap();
        assert_eq!(scopes.open_count(), 1);
        scopes.reset();
        assert_eq!(scopes.open_count(), 0);
        assert_eq!(scopes.current(), None);
    }

    #[rstest::rstest]
    fn test_child_counting() {
        let mut scopes = ScopeStack::new();
        let id = scopes.open(0, false);
        for _ in 0..5 {
            scopes.current_mut().unwrap().child_count += 1;
        }
        assert_eq!(scopes.node(id).child_count, 5);
    }
}
