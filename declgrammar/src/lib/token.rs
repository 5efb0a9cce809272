use std::fmt;

use crate::Span;

/// A lexeme produced by the lexer and, once shifted, a value on the parser's stack.
///
/// `name` is the terminal name the parser sees: a token name, a keyword, or the literal
/// character itself. Token handlers may rewrite `name`, `value` and `line`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub name: String,
    pub value: String,
    /// Byte span of the matched text in the input.
    pub span: Span,
    /// 1-based line, including any adjustment made by earlier token handlers.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Token {
    pub fn new(name: &str, value: &str, span: Span, line: usize, column: usize) -> Self {
        Token {
            name: name.to_owned(),
            value: value.to_owned(),
            span,
            line,
            column,
        }
    }

    /// Byte offset of the start of the matched text.
    pub fn pos(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({:?}) at line {} column {}",
            self.name, self.value, self.line, self.column
        )
    }
}
