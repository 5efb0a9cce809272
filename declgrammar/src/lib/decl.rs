use std::{fmt, rc::Rc};

use crate::{rules::AssocKind, Token};

/// A token handler may rewrite the matched token (its name, value or line) and returns `true`
/// to keep the token or `false` to discard it.
pub type TokenHandler = Rc<dyn Fn(&mut Token) -> bool>;

/// Called when neither a token rule nor a literal matches. The argument is a token named
/// `error` whose value is the unconsumed remainder of the input; the result is the number of
/// characters to skip, with `0` meaning the error is unrecoverable.
pub type LexErrorHandler = Rc<dyn Fn(&Token) -> usize>;

/// Called with the offending token (or `None` at the end of the input) when the parser finds
/// no action for its current lookahead.
pub type SyntaxErrorHandler = Rc<dyn Fn(Option<&Token>)>;

/// A production's semantic action. It receives the values of the production's symbols,
/// oldest-first, and returns the value synthesized for the production's rule.
pub type ActionHandler<ActionT, ParamT> = Rc<dyn Fn(&mut ParamT, Vec<AStackType<ActionT>>) -> ActionT>;

/// The values held on the parser's value stack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AStackType<ActionT> {
    /// A shifted terminal.
    Lexeme(Token),
    /// The value synthesized when a rule was reduced.
    ActionType(ActionT),
}

impl<ActionT> AStackType<ActionT> {
    pub fn lexeme(&self) -> Option<&Token> {
        match self {
            AStackType::Lexeme(t) => Some(t),
            AStackType::ActionType(_) => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionT> {
        match self {
            AStackType::ActionType(a) => Some(a),
            AStackType::Lexeme(_) => None,
        }
    }

    pub fn into_action(self) -> Option<ActionT> {
        match self {
            AStackType::ActionType(a) => Some(a),
            AStackType::Lexeme(_) => None,
        }
    }

    /// The matched text of a lexeme, or `""` for a synthesized value.
    pub fn value_str(&self) -> &str {
        match self {
            AStackType::Lexeme(t) => &t.value,
            AStackType::ActionType(_) => "",
        }
    }
}

/// A token rule: a named pattern with an optional handler.
#[derive(Clone)]
pub struct TokenDecl {
    pub name: String,
    pub pattern: String,
    pub handler: Option<TokenHandler>,
}

impl fmt::Debug for TokenDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenDecl")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// One level of the precedence table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrecedenceDecl {
    pub assoc: AssocKind,
    pub names: Vec<String>,
}

/// A production declaration: grammar-rule text (`lhs : alt | alt ...`) plus the action shared
/// by all of its alternatives.
pub struct ProductionDecl<ActionT, ParamT> {
    pub rule: String,
    pub handler: Option<ActionHandler<ActionT, ParamT>>,
}

impl<ActionT, ParamT> fmt::Debug for ProductionDecl<ActionT, ParamT> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProductionDecl")
            .field("rule", &self.rule)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// The declarations making up a grammar. A `Grammar` is created with [`GrammarBuilder`] and is
/// immutable afterwards.
pub struct Grammar<ActionT, ParamT> {
    tokens: Vec<TokenDecl>,
    literals: Vec<char>,
    keywords: Vec<String>,
    precedence: Vec<PrecedenceDecl>,
    productions: Vec<ProductionDecl<ActionT, ParamT>>,
    start: Option<String>,
    expect: Option<usize>,
    expect_rr: Option<usize>,
    lex_error: LexErrorHandler,
    syntax_error: SyntaxErrorHandler,
}

impl<ActionT, ParamT> Grammar<ActionT, ParamT> {
    /// All token rules, simple and handler-bearing, in declaration order.
    pub fn tokens(&self) -> &[TokenDecl] {
        &self.tokens
    }

    /// Token rules without a handler, in declaration order.
    pub fn simple_tokens(&self) -> impl Iterator<Item = &TokenDecl> {
        self.tokens.iter().filter(|t| t.handler.is_none())
    }

    /// Token rules with a handler, in declaration order.
    pub fn handler_tokens(&self) -> impl Iterator<Item = &TokenDecl> {
        self.tokens.iter().filter(|t| t.handler.is_some())
    }

    pub fn literals(&self) -> &[char] {
        &self.literals
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn precedence(&self) -> &[PrecedenceDecl] {
        &self.precedence
    }

    pub fn productions(&self) -> &[ProductionDecl<ActionT, ParamT>] {
        &self.productions
    }

    /// The handler of the production declaration at index `decl`, if there is one.
    pub fn action(&self, decl: usize) -> Option<&ActionHandler<ActionT, ParamT>> {
        self.productions.get(decl).and_then(|p| p.handler.as_ref())
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// How many shift/reduce conflicts the grammar author expects, if declared.
    pub fn expect(&self) -> Option<usize> {
        self.expect
    }

    /// How many reduce/reduce conflicts the grammar author expects, if declared.
    pub fn expect_rr(&self) -> Option<usize> {
        self.expect_rr
    }

    pub fn lex_error_handler(&self) -> &LexErrorHandler {
        &self.lex_error
    }

    pub fn syntax_error_handler(&self) -> &SyntaxErrorHandler {
        &self.syntax_error
    }

    /// Is `name` a terminal whose token the lexer can produce or a handler can promote to?
    pub fn is_terminal_name(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t.name == name) || self.keywords.iter().any(|k| k == name)
    }
}

/// Register the declarations of a grammar, in order.
///
/// ```
/// use declgrammar::{GrammarBuilder, Grammar};
///
/// let grammar: Grammar<i64, ()> = GrammarBuilder::new()
///     .token("NUMBER", r"\d+")
///     .literals("+")
///     .left(&["+"])
///     .production("expr : expr '+' expr | NUMBER")
///     .build();
/// assert_eq!(grammar.productions().len(), 1);
/// ```
pub struct GrammarBuilder<ActionT, ParamT> {
    grammar: Grammar<ActionT, ParamT>,
}

impl<ActionT, ParamT> GrammarBuilder<ActionT, ParamT> {
    pub fn new() -> Self {
        GrammarBuilder {
            grammar: Grammar {
                tokens: Vec::new(),
                literals: Vec::new(),
                keywords: Vec::new(),
                precedence: Vec::new(),
                productions: Vec::new(),
                start: None,
                expect: None,
                expect_rr: None,
                lex_error: Rc::new(|_| 0),
                syntax_error: Rc::new(|_| ()),
            },
        }
    }

    /// Declare a simple token `name` matching `pattern`.
    pub fn token(mut self, name: &str, pattern: &str) -> Self {
        self.grammar.tokens.push(TokenDecl {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            handler: None,
        });
        self
    }

    /// Declare a token `name` matching `pattern` whose matches are passed through `handler`.
    pub fn token_with<F>(mut self, name: &str, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut Token) -> bool + 'static,
    {
        self.grammar.tokens.push(TokenDecl {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            handler: Some(Rc::new(handler)),
        });
        self
    }

    /// Declare a single literal character.
    pub fn literal(mut self, c: char) -> Self {
        self.grammar.literals.push(c);
        self
    }

    /// Declare every character of `chars` as a literal.
    pub fn literals(mut self, chars: &str) -> Self {
        self.grammar.literals.extend(chars.chars());
        self
    }

    /// Declare a keyword: a terminal that has no pattern of its own.
    pub fn keyword(mut self, name: &str) -> Self {
        self.grammar.keywords.push(name.to_owned());
        self
    }

    pub fn keywords(mut self, names: &[&str]) -> Self {
        self.grammar
            .keywords
            .extend(names.iter().map(|n| (*n).to_owned()));
        self
    }

    /// Append a precedence level binding tighter than all previous levels. Literal characters
    /// are named by themselves, e.g. `"+"`.
    pub fn precedence(mut self, assoc: AssocKind, names: &[&str]) -> Self {
        self.grammar.precedence.push(PrecedenceDecl {
            assoc,
            names: names.iter().map(|n| (*n).to_owned()).collect(),
        });
        self
    }

    pub fn left(self, names: &[&str]) -> Self {
        self.precedence(AssocKind::Left, names)
    }

    pub fn right(self, names: &[&str]) -> Self {
        self.precedence(AssocKind::Right, names)
    }

    pub fn nonassoc(self, names: &[&str]) -> Self {
        self.precedence(AssocKind::Nonassoc, names)
    }

    /// Declare productions with no action: their rule synthesizes `ActionT::default()`.
    pub fn production(mut self, rule: &str) -> Self {
        self.grammar.productions.push(ProductionDecl {
            rule: rule.to_owned(),
            handler: None,
        });
        self
    }

    /// Declare productions whose values are synthesized by `handler`.
    pub fn production_with<F>(mut self, rule: &str, handler: F) -> Self
    where
        F: Fn(&mut ParamT, Vec<AStackType<ActionT>>) -> ActionT + 'static,
    {
        self.grammar.productions.push(ProductionDecl {
            rule: rule.to_owned(),
            handler: Some(Rc::new(handler)),
        });
        self
    }

    /// Set the start rule. Defaults to the left-hand side of the first production.
    pub fn start(mut self, name: &str) -> Self {
        self.grammar.start = Some(name.to_owned());
        self
    }

    pub fn expect(mut self, shift_reduce: usize) -> Self {
        self.grammar.expect = Some(shift_reduce);
        self
    }

    pub fn expect_rr(mut self, reduce_reduce: usize) -> Self {
        self.grammar.expect_rr = Some(reduce_reduce);
        self
    }

    /// Set the handler called with a synthetic `error` token (whose value is the rest of the
    /// input) when no rule or literal matches. It returns how many characters to skip; 0 stops
    /// lexing with a `LexError`, which is what happens if no handler is set.
    pub fn on_lex_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Token) -> usize + 'static,
    {
        self.grammar.lex_error = Rc::new(handler);
        self
    }

    pub fn on_syntax_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&Token>) + 'static,
    {
        self.grammar.syntax_error = Rc::new(handler);
        self
    }

    pub fn build(self) -> Grammar<ActionT, ParamT> {
        self.grammar
    }
}
