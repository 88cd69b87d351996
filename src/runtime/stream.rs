//! Symbol streams consumed by the simulators
//!
//! Both simulators only need lookahead, a cursor and the ability to rewind:
//! the lexer rolls back to its last accept position, and prediction always
//! restores the token stream to where the decision started.

use super::token::{Token, DEFAULT_CHANNEL, EOF};

/// A seekable stream of integer symbols
pub trait IntStream {
    /// Symbol `i` positions ahead (1 = current), `EOF` past the end
    fn la(&self, i: usize) -> i32;

    /// Advance past the current symbol
    fn consume(&mut self);

    /// Current position
    fn index(&self) -> usize;

    /// Move the cursor to `index`
    fn seek(&mut self, index: usize);

    /// Total number of symbols
    fn size(&self) -> usize;
}

/// Unicode code point stream
#[derive(Debug, Clone)]
pub struct CharStream {
    chars: Vec<char>,
    index: usize,
}

impl CharStream {
    /// Create a stream over `input`
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
        }
    }

    /// Text of characters `start..stop`
    pub fn text(&self, start: usize, stop: usize) -> String {
        let stop = stop.min(self.chars.len());
        if start >= stop {
            return String::new();
        }
        self.chars[start..stop].iter().collect()
    }
}

impl IntStream for CharStream {
    #[inline]
    fn la(&self, i: usize) -> i32 {
        debug_assert!(i >= 1);
        self.chars
            .get(self.index + i - 1)
            .map_or(EOF, |&c| c as i32)
    }

    #[inline]
    fn consume(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }

    #[inline]
    fn index(&self) -> usize {
        self.index
    }

    #[inline]
    fn seek(&mut self, index: usize) {
        self.index = index.min(self.chars.len());
    }

    fn size(&self) -> usize {
        self.chars.len()
    }
}

/// A stream of tokens
pub trait TokenStream: IntStream {
    /// Token at absolute position `index`
    fn get(&self, index: usize) -> Option<&Token>;

    /// Token `i` positions ahead on the stream's channel (1 = current)
    fn lt(&self, i: usize) -> Option<&Token>;
}

/// Buffered token stream that exposes a single channel
///
/// Tokens on other channels stay in the buffer (so indexes match the lexer's
/// token indexes) but are skipped by lookahead and `consume`.
#[derive(Debug, Clone)]
pub struct CommonTokenStream {
    tokens: Vec<Token>,
    channel: i32,
    p: usize,
}

impl CommonTokenStream {
    /// Wrap `tokens` and read the default channel
    ///
    /// An EOF token is appended if the buffer does not end with one.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_channel(tokens, DEFAULT_CHANNEL)
    }

    /// Wrap `tokens` and read `channel`
    pub fn with_channel(mut tokens: Vec<Token>, channel: i32) -> Self {
        if tokens.last().map_or(true, |t| !t.is_eof()) {
            let (index, line, column) = tokens
                .last()
                .map_or((0, 1, 0), |t| (t.stop, t.line, t.column));
            tokens.push(Token::eof(index, line, column));
        }
        for (i, token) in tokens.iter_mut().enumerate() {
            token.token_index = i;
        }
        let mut stream = Self {
            tokens,
            channel,
            p: 0,
        };
        stream.p = stream.next_on_channel(0);
        stream
    }

    /// Build a stream from bare token types, for tests and benchmarks
    pub fn from_types(types: &[i32]) -> Self {
        Self::new(
            types
                .iter()
                .map(|&t| Token::new(t, String::new()))
                .collect(),
        )
    }

    /// All buffered tokens, including off-channel ones
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn next_on_channel(&self, mut i: usize) -> usize {
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            if token.channel == self.channel || token.is_eof() {
                return i;
            }
            i += 1;
        }
        self.tokens.len() - 1
    }
}

impl IntStream for CommonTokenStream {
    fn la(&self, i: usize) -> i32 {
        self.lt(i).map_or(EOF, |t| t.token_type)
    }

    fn consume(&mut self) {
        if self.tokens[self.p].is_eof() {
            return;
        }
        self.p = self.next_on_channel(self.p + 1);
    }

    #[inline]
    fn index(&self) -> usize {
        self.p
    }

    fn seek(&mut self, index: usize) {
        self.p = self.next_on_channel(index.min(self.tokens.len() - 1));
    }

    fn size(&self) -> usize {
        self.tokens.len()
    }
}

impl TokenStream for CommonTokenStream {
    fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    fn lt(&self, i: usize) -> Option<&Token> {
        debug_assert!(i >= 1);
        let mut idx = self.p;
        for _ in 1..i {
            if self.tokens[idx].is_eof() {
                break;
            }
            idx = self.next_on_channel(idx + 1);
        }
        self.tokens.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::token::HIDDEN_CHANNEL;

    #[test]
    fn test_char_stream_lookahead() {
        let mut input = CharStream::new("aé");
        assert_eq!(input.la(1), 'a' as i32);
        assert_eq!(input.la(2), 'é' as i32);
        assert_eq!(input.la(3), EOF);
        input.consume();
        input.consume();
        input.consume();
        assert_eq!(input.index(), 2);
        assert_eq!(input.la(1), EOF);
        input.seek(1);
        assert_eq!(input.text(0, 2), "aé");
    }

    #[test]
    fn test_common_token_stream_skips_hidden() {
        let mut ws = Token::new(9, " ");
        ws.channel = HIDDEN_CHANNEL;
        let tokens = vec![Token::new(1, "a"), ws, Token::new(2, "b")];
        let mut stream = CommonTokenStream::new(tokens);

        assert_eq!(stream.size(), 4);
        assert_eq!(stream.la(1), 1);
        assert_eq!(stream.la(2), 2);
        assert_eq!(stream.la(3), EOF);

        stream.consume();
        assert_eq!(stream.index(), 2);
        assert_eq!(stream.la(1), 2);

        stream.consume();
        stream.consume();
        assert_eq!(stream.la(1), EOF);

        stream.seek(0);
        assert_eq!(stream.la(1), 1);
    }

    #[test]
    fn test_from_types_appends_eof() {
        let stream = CommonTokenStream::from_types(&[4, 5]);
        assert_eq!(stream.size(), 3);
        assert_eq!(stream.tokens()[2].token_type, EOF);
        assert_eq!(stream.tokens()[2].token_index, 2);
    }
}
