//! Byte stream to token stream, with indentation-sensitive layout, string
//! escape decoding, and comment collection.

pub mod scanner;
pub mod string_lit;
pub mod token;

pub use scanner::{Comment, Scanner};
pub use string_lit::decode_string_body;
pub use token::{intern_keywords, keyword_tok, Tok, KEYWORDS};
