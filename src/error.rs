use thiserror::Error;

/// Coarse classification of [`Error`] variants.
///
/// Parse-time failures are `Lex`, `Structure` or `DuplicateKey`; accessor
/// failures after construction are `TypeMismatch` or `NotFound`. `Internal`
/// marks states that are unreachable when the lexer's size accounting is
/// correct and indicate a bug in this crate, not in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Lex,
    Structure,
    DuplicateKey,
    TypeMismatch,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },

    #[error("unterminated string starting at byte {at}")]
    UnterminatedString { at: usize },

    #[error("{open} container(s) left open at end of input")]
    UnterminatedContainer { open: usize },

    #[error("invalid character {ch:?} at byte {at}")]
    InvalidCharacter { ch: char, at: usize },

    #[error("malformed number {text:?} at byte {at}")]
    MalformedNumber { text: String, at: usize },

    #[error("top-level value must be an object")]
    TopLevelNotObject,

    #[error("unbalanced container close at byte {at}")]
    UnbalancedClose { at: usize },

    #[error("key {key:?} outside an object scope")]
    KeyOutsideObject { key: String },

    #[error("value at byte {at} has no enclosing container")]
    ValueOutsideContainer { at: usize },

    #[error("value at byte {at} inside an object has no preceding key")]
    ValueWithoutKey { at: usize },

    #[error("key {key:?} has no value")]
    MissingValue { key: String },

    #[error("unexpected content after the root object closed, at byte {at}")]
    TrailingToken { at: usize },

    #[error("duplicate key {key:?}")]
    DuplicateKey { key: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("key {key:?} not found")]
    KeyNotFound { key: String },

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("document byte budget exceeded: needed {needed}, remaining {remaining}")]
    BudgetExceeded { needed: usize, remaining: usize },

    #[error("{remaining} byte(s) of document budget left unconsumed")]
    BudgetSlack { remaining: usize },

    #[error("container child count mismatch: expected {expected}, wrote {wrote}")]
    CountMismatch { expected: usize, wrote: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::UnterminatedString { .. }
            | Error::UnterminatedContainer { .. }
            | Error::InvalidCharacter { .. }
            | Error::MalformedNumber { .. } => ErrorKind::Lex,
            Error::TopLevelNotObject
            | Error::UnbalancedClose { .. }
            | Error::KeyOutsideObject { .. }
            | Error::ValueOutsideContainer { .. }
            | Error::ValueWithoutKey { .. }
            | Error::MissingValue { .. }
            | Error::TrailingToken { .. } => ErrorKind::Structure,
            Error::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::KeyNotFound { .. } | Error::IndexOutOfBounds { .. } => ErrorKind::NotFound,
            Error::BudgetExceeded { .. }
            | Error::BudgetSlack { .. }
            | Error::CountMismatch { .. } => ErrorKind::Internal,
        }
    }
}
