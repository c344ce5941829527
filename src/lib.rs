//! Single-allocation JSON parsing for a fixed, escape-free subset of JSON.
//!
//! Parsing runs in two passes over the input. A lexing pass produces the
//! token list, counts each container's children, and tallies the exact byte
//! size of the final document. The parse pass then materializes the whole
//! document into one allocation of exactly that size: value nodes, object
//! hash tables (open addressing, capacity equal to key count), array child
//! slots and string text all live in the same arena, addressed by index.
//!
//! The accepted grammar is deliberately small: the top-level value must be
//! an object; strings carry no escapes; numbers are `i64` integers or `f64`
//! floats with a single decimal point and no exponent; commas are separators
//! consumed like whitespace. Duplicate keys are an error.
//!
//! ```
//! let doc = monojson::parse(r#"{"pairs":[1.5, -2.25]}"#)?;
//! let pairs = doc.get("pairs")?.as_array()?;
//! assert_eq!(pairs.at(0)?.as_float()?, 1.5);
//! # Ok::<(), monojson::Error>(())
//! ```

mod doc;
mod error;
pub mod gen;
mod lex;
mod parse;
mod scope;

pub use doc::{ArrayRef, Document, ObjectRef, ValueKind, ValueRef};
pub use error::{Error, ErrorKind};
pub use lex::SizeTally;

pub type Result<T> = std::result::Result<T, Error>;

/// Parses `input` into a [`Document`].
///
/// Per-parse temporaries (token list, scope stack) are recycled through a
/// thread-local pool, so repeated calls on one thread reuse their buffers.
pub fn parse(input: &str) -> Result<Document> {
    parse::parse(input)
}

/// Measures `input` without building a document: runs only the lexing pass
/// and returns the exact byte size the parsed document would occupy.
pub fn measure(input: &str) -> Result<SizeTally> {
    parse::measure(input)
}

/// Reads `path` and parses its contents.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<Document> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    parse(&input)
}
