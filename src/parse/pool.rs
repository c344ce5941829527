//! Thread-local recycling of per-parse temporaries.
//!
//! The token list and the scope free-list live only for the duration of one
//! parse call. Instead of freeing them, they are returned here cleared but
//! with capacity intact, so repeated parses on the same thread skip the
//! allocator entirely.

use std::cell::RefCell;

use crate::lex::Token;
use crate::scope::ScopeStack;

#[derive(Default)]
pub(crate) struct Scratch {
    pub tokens: Vec<Token>,
    pub scopes: ScopeStack,
}

thread_local! {
    static SCRATCH_POOL: RefCell<Scratch> = RefCell::new(Scratch::default());
}

pub(crate) fn take_scratch() -> Scratch {
    SCRATCH_POOL.with(|pool| std::mem::take(&mut *pool.borrow_mut()))
}

pub(crate) fn put_scratch(mut scratch: Scratch) {
    scratch.tokens.clear();
    scratch.scopes.reset();
    SCRATCH_POOL.with(|pool| *pool.borrow_mut() = scratch);
}
