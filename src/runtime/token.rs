//! Tokens and symbol constants

use serde::{Deserialize, Serialize};
use std::fmt;

/// End of input, as a symbol
pub const EOF: i32 = -1;

/// Epsilon pseudo-symbol
pub const EPSILON: i32 = -2;

/// Token type that no rule produces
pub const INVALID_TYPE: i32 = 0;

/// Smallest token type a grammar may define
pub const MIN_USER_TOKEN_TYPE: i32 = 1;

/// Channel the parser reads by default
pub const DEFAULT_CHANNEL: i32 = 0;

/// Conventional channel for whitespace and comments
pub const HIDDEN_CHANNEL: i32 = 1;

/// Smallest code point a lexer can match
pub const MIN_CHAR_VALUE: i32 = 0;

/// Largest code point a lexer can match
pub const MAX_CHAR_VALUE: i32 = 0x10FFFF;

/// A token committed by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token type (`EOF` for end of input)
    pub token_type: i32,
    /// Channel the token was emitted on
    pub channel: i32,
    /// Index of the first character
    pub start: usize,
    /// Index one past the last character
    pub stop: usize,
    /// Line of the first character (1-based)
    pub line: usize,
    /// Column of the first character (0-based)
    pub column: usize,
    /// Position in the token stream
    pub token_index: usize,
    /// Matched text
    pub text: String,
}

impl Token {
    /// Build a token of `token_type` on the default channel
    ///
    /// Convenient when feeding a parser from a source other than [`Lexer`](super::lexer::Lexer).
    pub fn new(token_type: i32, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            token_type,
            channel: DEFAULT_CHANNEL,
            start: 0,
            stop: text.chars().count(),
            line: 1,
            column: 0,
            token_index: 0,
            text,
        }
    }

    /// Build an EOF token
    pub fn eof(index: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: EOF,
            channel: DEFAULT_CHANNEL,
            start: index,
            stop: index,
            line,
            column,
            token_index: 0,
            text: String::new(),
        }
    }

    /// Whether this is the end-of-input token
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.is_eof() {
            "<EOF>".to_string()
        } else {
            self.text
                .replace('\n', "\\n")
                .replace('\r', "\\r")
                .replace('\t', "\\t")
        };
        write!(
            f,
            "[@{},{}:{}='{}',<{}>",
            self.token_index, self.start, self.stop, text, self.token_type
        )?;
        if self.channel != DEFAULT_CHANNEL {
            write!(f, ",channel={}", self.channel)?;
        }
        write!(f, ",{}:{}]", self.line, self.column)
    }
}
