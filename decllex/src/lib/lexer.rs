use std::{collections::HashMap, slice::Iter};

use declgrammar::{
    Grammar, LexErrorHandler, NewlineCache, Span, Token, TokenDecl, TokenHandler,
};
use log::debug;
use regex::Regex;
use regex_automata::{meta, util::captures::Captures, Anchored, Input};
use regex_syntax::ParserBuilder;

use crate::{LexBuildError, LexBuildResult, LexError, LexErrorKind, RuleKind, RuleOrigin};

pub struct Rule {
    /// This rule's name, which is the name given to the tokens it produces (unless a handler
    /// renames them).
    pub name: String,
    pub re_str: String,
    pub handler: Option<TokenHandler>,
    /// The capture group owning this rule in the combined regex.
    group: usize,
}

impl Rule {
    /// Create a new `Rule`, checking that `re_str` is a valid regex which can't match the empty
    /// string. Returns the rule and the number of explicit capture groups in `re_str`.
    fn new(decl: &TokenDecl) -> Result<(Rule, usize), LexBuildError> {
        let mk_err = |kind| LexBuildError {
            kind,
            name: decl.name.clone(),
        };
        let re = Regex::new(&format!("\\A(?:{})", &decl.pattern))
            .map_err(|e| mk_err(LexErrorKind::RegexError(e.to_string())))?;
        let hir = ParserBuilder::new()
            .build()
            .parse(&decl.pattern)
            .map_err(|e| mk_err(LexErrorKind::RegexError(e.to_string())))?;
        if hir.properties().minimum_len() == Some(0) {
            return Err(mk_err(LexErrorKind::EmptyMatch));
        }
        Ok((
            Rule {
                name: decl.name.clone(),
                re_str: decl.pattern.clone(),
                handler: decl.handler.clone(),
                group: 0,
            },
            re.captures_len() - 1,
        ))
    }
}

/// This struct represents, in essence, the token rules of a grammar in memory. From it one can
/// produce an [LRLexer] which actually lexes inputs.
pub struct LexerDef {
    /// Rules in priority order.
    rules: Vec<Rule>,
    /// The combined pattern. Matches are anchored at the lexer's cursor rather than with `\A`,
    /// so that look-around such as `^` and `\b` sees the text before the cursor.
    re_str: String,
    /// `None` if there are no token rules.
    re: Option<meta::Regex>,
    literals: Vec<char>,
    error_handler: LexErrorHandler,
}

impl LexerDef {
    /// Build the lexer for `grammar`'s token rules and literals. Every duplicated name and
    /// invalid pattern is reported.
    pub fn new<ActionT, ParamT>(grammar: &Grammar<ActionT, ParamT>) -> LexBuildResult<LexerDef> {
        let mut errs = duplicate_names(grammar);

        let mut rules = Vec::with_capacity(grammar.tokens().len());
        for decl in grammar
            .handler_tokens()
            .chain(grammar.simple_tokens())
        {
            match Rule::new(decl) {
                Ok(r) => rules.push(r),
                Err(e) => errs.push(e),
            }
        }
        if !errs.is_empty() {
            return Err(errs);
        }

        // Handler rules keep their declaration order; the remaining rules are ordered by
        // descending pattern length. `sort_by_key` is stable, so ties keep declaration order.
        let hlen = grammar.handler_tokens().count();
        rules[hlen..].sort_by_key(|(r, _)| std::cmp::Reverse(r.re_str.len()));

        let mut group = 1;
        let mut alts = Vec::with_capacity(rules.len());
        let rules = rules
            .into_iter()
            .map(|(mut r, ngroups)| {
                r.group = group;
                group += 1 + ngroups;
                alts.push(format!("({})", r.re_str));
                r
            })
            .collect::<Vec<_>>();
        let re_str = format!("(?:{})", alts.join("|"));
        debug!("Combined token pattern: {}", re_str);
        let re = if rules.is_empty() {
            None
        } else {
            // Each pattern compiles on its own, but the combination can still fail, e.g. if two
            // rules use the same named group.
            let re = meta::Regex::new(&re_str).map_err(|e| {
                vec![LexBuildError {
                    kind: LexErrorKind::RegexError(e.to_string()),
                    name: rules
                        .iter()
                        .map(|r| r.name.as_str())
                        .collect::<Vec<_>>()
                        .join("|"),
                }]
            })?;
            Some(re)
        };

        Ok(LexerDef {
            rules,
            re_str,
            re,
            literals: grammar.literals().to_vec(),
            error_handler: grammar.lex_error_handler().clone(),
        })
    }

    /// Get the `Rule` instance associated with a particular name.
    pub fn get_rule_by_name(&self, n: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == n)
    }

    /// Returns an iterator over all rules in priority order.
    pub fn iter_rules(&self) -> Iter<'_, Rule> {
        self.rules.iter()
    }

    /// The combined regex used to match all rules at once. It is always matched anchored at the
    /// lexer's current position.
    pub fn regex_str(&self) -> Option<&str> {
        self.re.as_ref().map(|_| self.re_str.as_str())
    }

    /// Return a lexer for the `String` `s` that will lex relative to this `LexerDef`.
    pub fn lexer<'lexer, 'input: 'lexer>(&'lexer self, s: &'input str) -> LRLexer<'lexer, 'input> {
        LRLexer::new(self, s)
    }
}

/// Find every name declared more than once across token rules, keywords and literals.
fn duplicate_names<ActionT, ParamT>(grammar: &Grammar<ActionT, ParamT>) -> Vec<LexBuildError> {
    let mut origins = HashMap::<String, Vec<RuleOrigin>>::new();
    let mut order = Vec::new();
    let mut add = |name: String, kind: RuleKind, index: usize| {
        let e = origins.entry(name.clone()).or_insert_with(|| {
            order.push(name);
            Vec::new()
        });
        e.push(RuleOrigin { kind, index });
    };
    for (i, t) in grammar.simple_tokens().enumerate() {
        add(t.name.clone(), RuleKind::Token, i);
    }
    for (i, t) in grammar.handler_tokens().enumerate() {
        add(t.name.clone(), RuleKind::HandlerToken, i);
    }
    for (i, k) in grammar.keywords().iter().enumerate() {
        add(k.clone(), RuleKind::Keyword, i);
    }
    for (i, c) in grammar.literals().iter().enumerate() {
        add(c.to_string(), RuleKind::Literal, i);
    }
    order
        .into_iter()
        .filter_map(|name| {
            let os = origins.remove(&name)?;
            if os.len() > 1 {
                Some(LexBuildError {
                    kind: LexErrorKind::DuplicateName(os),
                    name,
                })
            } else {
                None
            }
        })
        .collect()
}

/// A lexer holds a reference to a string and lazily lexes it into [Token]s. Each lexer has its
/// own cursor: lexing the same input twice requires two lexers.
pub struct LRLexer<'lexer, 'input: 'lexer> {
    lexerdef: &'lexer LexerDef,
    s: &'input str,
    newlines: NewlineCache,
    /// Reused between matches; `None` if there are no token rules.
    caps: Option<Captures>,
    /// The current byte offset into `s`.
    pos: usize,
    /// The 1-based physical line and column of `pos`.
    line: usize,
    column: usize,
    /// Adjustment to physical line numbers made by token handlers.
    line_delta: isize,
    /// Set after a lexing error: no further tokens are produced.
    done: bool,
}

impl<'lexer, 'input: 'lexer> LRLexer<'lexer, 'input> {
    fn new(lexerdef: &'lexer LexerDef, s: &'input str) -> LRLexer<'lexer, 'input> {
        LRLexer {
            lexerdef,
            s,
            newlines: NewlineCache::from_str(s),
            caps: lexerdef.re.as_ref().map(|re| re.create_captures()),
            pos: 0,
            line: 1,
            column: 1,
            line_delta: 0,
            done: false,
        }
    }

    /// Make a token for `self.s[self.pos..en]`, with the line adjusted by handlers.
    fn mk_token(&self, name: &str, en: usize) -> Token {
        let line = (self.line as isize + self.line_delta).max(1) as usize;
        Token::new(
            name,
            &self.s[self.pos..en],
            Span::new(self.pos, en),
            line,
            self.column,
        )
    }

    /// Move the cursor to `en`, updating the line and column over the consumed text. Columns
    /// count characters and `\r\n` is a single line terminator.
    fn advance(&mut self, en: usize) {
        let s = self.s;
        for (i, c) in s[self.pos..en].char_indices() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else if !(c == '\r' && s[self.pos + i + 1..].starts_with('\n')) {
                self.column += 1;
            }
        }
        self.pos = en;
    }

    /// Run the combined regex anchored at the cursor, returning the matching rule and the end
    /// offset.
    fn match_rule(&mut self) -> Option<(&'lexer Rule, usize)> {
        let lexerdef = self.lexerdef;
        let (re, caps) = match (lexerdef.re.as_ref(), self.caps.as_mut()) {
            (Some(re), Some(caps)) => (re, caps),
            _ => return None,
        };
        let input = Input::new(self.s)
            .range(self.pos..)
            .anchored(Anchored::Yes);
        re.search_captures(&input, caps);
        let m = caps.get_match()?;
        lexerdef
            .rules
            .iter()
            .find(|r| caps.get_group(r.group).is_some())
            .map(|r| (r, m.end()))
    }

    /// Return the input that `span` references.
    ///
    /// # Panics
    ///
    /// If `span` exceeds the input.
    pub fn span_str(&self, span: Span) -> &'input str {
        if span.end() > self.s.len() {
            panic!(
                "Span {:?} exceeds known input length {}",
                span,
                self.s.len()
            );
        }
        &self.s[span.start()..span.end()]
    }

    /// Return the `((start line, start column), (end line, end column))` of `span`, counting
    /// physical lines in the input (i.e. ignoring any adjustment made by token handlers).
    ///
    /// # Panics
    ///
    /// If `span` exceeds the input.
    pub fn line_col(&self, span: Span) -> ((usize, usize), (usize, usize)) {
        let lc = |off| match self.newlines.byte_to_line_and_col(self.s, off) {
            Some(x) => x,
            None => panic!(
                "Span {:?} exceeds known input length {}",
                span,
                self.s.len()
            ),
        };
        (lc(span.start()), lc(span.end()))
    }
}

impl<'lexer, 'input: 'lexer> Iterator for LRLexer<'lexer, 'input> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.pos < self.s.len() {
            let st = self.pos;
            if let Some((rule, en)) = self.match_rule() {
                let mut tok = self.mk_token(&rule.name, en);
                self.advance(en);
                match rule.handler {
                    Some(ref h) => {
                        let old_line = tok.line;
                        let keep = h(&mut tok);
                        self.line_delta += tok.line as isize - old_line as isize;
                        if keep {
                            return Some(Ok(tok));
                        }
                    }
                    None => return Some(Ok(tok)),
                }
                continue;
            }

            let c = match self.s[st..].chars().next() {
                Some(c) => c,
                None => break,
            };
            if self.lexerdef.literals.contains(&c) {
                let en = st + c.len_utf8();
                let tok = self.mk_token(&c.to_string(), en);
                self.advance(en);
                return Some(Ok(tok));
            }

            let tok = self.mk_token("error", self.s.len());
            let skip = (self.lexerdef.error_handler)(&tok);
            if skip == 0 {
                self.done = true;
                let en = st + c.len_utf8();
                return Some(Err(LexError::new(
                    Span::new(st, en),
                    &self.s[st..en],
                    tok.line,
                    tok.column,
                )));
            }
            debug!("Skipping {} characters at offset {}", skip, st);
            let en = self.s[st..]
                .char_indices()
                .nth(skip)
                .map_or(self.s.len(), |(i, _)| st + i);
            self.advance(en);
        }
        None
    }
}
