//! Token-producing lexer driver
//!
//! Wraps a [`LexerAtnSimulator`] and a character stream, runs the commands
//! collected for each match and turns matches into [`Token`]s. The mode
//! stack, `skip`, `more`, `type(..)` and `channel(..)` all live here; the
//! simulator only knows which mode to start from.

use super::error::{RecognitionError, RecognitionResult};
use super::graph::Atn;
use super::lexer_action::{LexerControl, LexerCursor, LexerHooks};
use super::lexer_sim::LexerAtnSimulator;
use super::semantic::NoHooks;
use super::sim_config::SimulatorConfig;
use super::stream::{CharStream, IntStream};
use super::token::{Token, DEFAULT_CHANNEL, EOF};
use std::sync::Arc;

/// What the commands of the current match asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Emit,
    Skip,
    More,
}

/// Lexer over one input
///
/// # Example
///
/// ```rust
/// use atnsim::runtime::builder::*;
/// use atnsim::runtime::{Lexer, LexerAction};
/// use std::sync::Arc;
///
/// let atn = AtnBuilder::lexer()
///     .token("ID", 1, plus(char_range('a', 'z')))
///     .token("WS", 2, seq(vec![plus(ch(' ')), command(LexerAction::Skip)]))
///     .build()
///     .unwrap();
/// let mut lexer = Lexer::new(Arc::new(atn), "ab cd");
/// let tokens = lexer.tokenize().unwrap();
/// let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(texts, ["ab", "cd", ""]);
/// ```
pub struct Lexer {
    sim: LexerAtnSimulator,
    input: CharStream,
    hooks: Box<dyn LexerHooks>,
    mode: usize,
    mode_stack: Vec<usize>,
    hit_eof: bool,
    token_index: usize,

    // current token
    token_start: usize,
    token_line: usize,
    token_column: usize,
    token_type: Option<i32>,
    channel: i32,
    disposition: Disposition,
}

impl Lexer {
    /// Lexer over `input` with default settings and no hooks
    pub fn new(atn: Arc<Atn>, input: &str) -> Self {
        Self::from_simulator(LexerAtnSimulator::new(atn), input)
    }

    /// Lexer over `input` with `config`
    pub fn with_config(atn: Arc<Atn>, input: &str, config: SimulatorConfig) -> Self {
        Self::from_simulator(LexerAtnSimulator::with_config(atn, config), input)
    }

    /// Lexer driving an existing simulator, keeping its DFAs
    pub fn from_simulator(mut sim: LexerAtnSimulator, input: &str) -> Self {
        sim.set_position(1, 0);
        Self {
            sim,
            input: CharStream::new(input),
            hooks: Box::new(NoHooks),
            mode: 0,
            mode_stack: Vec::new(),
            hit_eof: false,
            token_index: 0,
            token_start: 0,
            token_line: 1,
            token_column: 0,
            token_type: None,
            channel: DEFAULT_CHANNEL,
            disposition: Disposition::Emit,
        }
    }

    /// Use `hooks` for predicates and custom actions
    pub fn with_hooks(mut self, hooks: impl LexerHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Give up the lexer, keeping the simulator and its DFAs
    pub fn into_simulator(self) -> LexerAtnSimulator {
        self.sim
    }

    /// The simulator
    pub fn simulator(&self) -> &LexerAtnSimulator {
        &self.sim
    }

    /// The character stream
    pub fn input(&self) -> &CharStream {
        &self.input
    }

    /// Current mode
    pub fn mode(&self) -> usize {
        self.mode
    }

    /// Modes saved by `pushMode`, innermost last
    pub fn mode_stack(&self) -> &[usize] {
        &self.mode_stack
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Produce the next token; `EOF` repeats once the input is exhausted
    ///
    /// On a lexical error the input is left at the failure point; call
    /// [`recover`](Self::recover) before asking for the next token.
    pub fn next_token(&mut self) -> RecognitionResult<Token> {
        loop {
            if self.hit_eof {
                return Ok(self.emit_eof());
            }
            self.token_start = self.input.index();
            self.token_line = self.sim.line();
            self.token_column = self.sim.column();
            self.channel = DEFAULT_CHANNEL;

            loop {
                self.token_type = None;
                self.disposition = Disposition::Emit;
                let matched = self
                    .sim
                    .match_token(&mut self.input, self.mode, self.hooks.as_mut())?;
                if let Some(executor) = matched.executor {
                    let start = self.token_start;
                    executor.execute(self, start)?;
                }
                if self.input.la(1) == EOF {
                    self.hit_eof = true;
                }
                let token_type = *self.token_type.get_or_insert(matched.token_type);
                if token_type == EOF {
                    return Ok(self.emit_eof());
                }
                match self.disposition {
                    Disposition::More => continue,
                    Disposition::Skip => break,
                    Disposition::Emit => return Ok(self.emit(token_type)),
                }
            }
            log_trace!("skipped {}..{}", self.token_start, self.input.index());
        }
    }

    /// Skip one character after a lexical error
    pub fn recover(&mut self) {
        if self.input.la(1) != EOF {
            self.sim.consume(&mut self.input);
        }
    }

    /// All tokens up to and including `EOF`, failing on the first error
    pub fn tokenize(&mut self) -> RecognitionResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// All tokens up to and including `EOF`, recovering from errors
    pub fn tokenize_recovering(&mut self) -> (Vec<Token>, Vec<RecognitionError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            match self.next_token() {
                Ok(token) => {
                    let done = token.is_eof();
                    tokens.push(token);
                    if done {
                        return (tokens, errors);
                    }
                }
                Err(e) if e.is_syntax_error() => {
                    log_debug!("lexer error: {}", e);
                    errors.push(e);
                    self.recover();
                }
                Err(e) => {
                    errors.push(e);
                    return (tokens, errors);
                }
            }
        }
    }

    fn emit(&mut self, token_type: i32) -> Token {
        let stop = self.input.index();
        let token = Token {
            token_type,
            channel: self.channel,
            start: self.token_start,
            stop,
            line: self.token_line,
            column: self.token_column,
            token_index: self.token_index,
            text: self.input.text(self.token_start, stop),
        };
        self.token_index += 1;
        token
    }

    fn emit_eof(&mut self) -> Token {
        let mut token = Token::eof(self.input.index(), self.sim.line(), self.sim.column());
        token.token_index = self.token_index;
        token
    }

    fn cursor(&self) -> LexerCursor {
        LexerCursor {
            index: self.input.index(),
            line: self.sim.line(),
            column: self.sim.column(),
            token_start: self.token_start,
        }
    }
}

impl LexerControl for Lexer {
    fn skip(&mut self) {
        self.disposition = Disposition::Skip;
    }

    fn more(&mut self) {
        self.disposition = Disposition::More;
    }

    fn set_type(&mut self, token_type: i32) {
        self.token_type = Some(token_type);
    }

    fn set_channel(&mut self, channel: i32) {
        self.channel = channel;
    }

    fn set_mode(&mut self, mode: usize) {
        self.mode = mode;
    }

    fn push_mode(&mut self, mode: usize) {
        self.mode_stack.push(self.mode);
        self.mode = mode;
    }

    fn pop_mode(&mut self) -> RecognitionResult<()> {
        let mode = self.mode_stack.pop().ok_or(RecognitionError::ModeStackEmpty {
            index: self.input.index(),
        })?;
        self.mode = mode;
        Ok(())
    }

    fn custom(&mut self, rule_index: usize, action_index: usize) {
        let cursor = self.cursor();
        self.hooks.action(rule_index, action_index, cursor);
    }

    fn index(&self) -> usize {
        self.input.index()
    }

    fn seek(&mut self, index: usize) {
        self.input.seek(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::*;
    use crate::runtime::lexer_action::LexerAction;
    use crate::runtime::token::HIDDEN_CHANNEL;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn types(tokens: &[Token]) -> Vec<i32> {
        tokens.iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_skip_and_channel() {
        let atn = AtnBuilder::lexer()
            .token("ID", 1, plus(char_range('a', 'z')))
            .token("WS", 2, seq(vec![plus(ch(' ')), command(LexerAction::Skip)]))
            .token(
                "C",
                3,
                seq(vec![ch('#'), star(char_range('a', 'z')), command(LexerAction::Channel(HIDDEN_CHANNEL))]),
            )
            .build()
            .unwrap();
        let mut lexer = Lexer::new(Arc::new(atn), "ab #x cd");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(types(&tokens), vec![1, 3, 1, EOF]);
        assert_eq!(tokens[1].channel, HIDDEN_CHANNEL);
        assert_eq!(tokens[2].text, "cd");
        assert_eq!((tokens[2].start, tokens[2].stop), (6, 8));
        assert_eq!(tokens[3].token_index, 3);
    }

    #[test]
    fn test_more_extends_token_and_type_overrides() {
        let atn = AtnBuilder::lexer()
            .token("Q", 1, seq(vec![ch('"'), command(LexerAction::More)]))
            .token("S", 2, seq(vec![plus(char_range('a', 'z')), ch('"'), command(LexerAction::Type(7))]))
            .build()
            .unwrap();
        let mut lexer = Lexer::new(Arc::new(atn), "\"abc\"");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(types(&tokens), vec![7, EOF]);
        assert_eq!(tokens[0].text, "\"abc\"");
    }

    #[test]
    fn test_mode_stack() {
        let atn = AtnBuilder::lexer()
            .token("OPEN", 1, seq(vec![ch('<'), command(LexerAction::PushMode(1))]))
            .token("TEXT", 2, plus(not_set(['<' as i32])))
            .mode("TAG")
            .token("CLOSE", 3, seq(vec![ch('>'), command(LexerAction::PopMode)]))
            .token("NAME", 4, plus(char_range('a', 'z')))
            .build()
            .unwrap();
        let mut lexer = Lexer::new(Arc::new(atn), "hi<b>x");
        assert_eq!(lexer.next_token().unwrap().token_type, 2);
        assert_eq!(lexer.next_token().unwrap().token_type, 1);
        assert_eq!(lexer.mode(), 1);
        assert_eq!(lexer.mode_stack(), &[0]);
        assert_eq!(lexer.next_token().unwrap().token_type, 4);
        assert_eq!(lexer.next_token().unwrap().token_type, 3);
        assert_eq!(lexer.mode(), 0);
        let last = lexer.next_token().unwrap();
        assert_eq!((last.token_type, last.text.as_str()), (2, "x"));
    }

    #[test]
    fn test_pop_on_empty_mode_stack() {
        let atn = AtnBuilder::lexer()
            .token("X", 1, seq(vec![ch('x'), command(LexerAction::PopMode)]))
            .build()
            .unwrap();
        let mut lexer = Lexer::new(Arc::new(atn), "x");
        assert_eq!(
            lexer.next_token(),
            Err(RecognitionError::ModeStackEmpty { index: 1 })
        );
    }

    #[derive(Clone, Default)]
    struct Recorder {
        actions: Rc<RefCell<Vec<(usize, usize)>>>,
        allow_keyword: bool,
    }

    impl LexerHooks for Recorder {
        fn sempred(&mut self, _rule_index: usize, _pred_index: usize, _cursor: LexerCursor) -> bool {
            self.allow_keyword
        }

        fn action(&mut self, _rule_index: usize, action_index: usize, cursor: LexerCursor) {
            self.actions.borrow_mut().push((action_index, cursor.index));
        }
    }

    #[test]
    fn test_actions_replay_at_their_position() {
        let atn = AtnBuilder::lexer()
            .token("X", 1, seq(vec![ch('a'), action(0), ch('b')]))
            .token("Y", 2, seq(vec![ch('c'), ch('d'), action(1)]))
            .build()
            .unwrap();
        let hooks = Recorder::default();
        let log = hooks.actions.clone();
        let mut lexer = Lexer::new(Arc::new(atn), "abcd").with_hooks(hooks);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(types(&tokens), vec![1, 2, EOF]);
        assert_eq!(*log.borrow(), vec![(0, 1), (1, 4)]);
    }

    #[test]
    fn test_predicate_gates_keyword() {
        let atn = Arc::new(
            AtnBuilder::lexer()
                .token("ENUM", 1, seq(vec![lit("enum"), pred(0)]))
                .token("ID", 2, plus(char_range('a', 'z')))
                .build()
                .unwrap(),
        );
        let hooks = Recorder {
            allow_keyword: true,
            ..Default::default()
        };
        let mut lexer = Lexer::new(atn.clone(), "enum").with_hooks(hooks);
        assert_eq!(lexer.next_token().unwrap().token_type, 1);

        let mut lexer = Lexer::new(atn, "enum").with_hooks(Recorder::default());
        assert_eq!(lexer.next_token().unwrap().token_type, 2);
    }

    #[test]
    fn test_recovering_tokenize() {
        let atn = AtnBuilder::lexer()
            .token("A", 1, ch('a'))
            .token("AB", 2, lit("ab"))
            .build()
            .unwrap();
        let mut lexer = Lexer::new(Arc::new(atn), "acab");
        let (tokens, errors) = lexer.tokenize_recovering();
        assert_eq!(types(&tokens), vec![1, 2, EOF]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            RecognitionError::LexerNoViableAlt { start_index: 1, .. }
        ));
    }
}
