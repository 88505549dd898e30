//! Recursive-descent parser for the rill script language.
//!
//! Grammar:
//!
//! ```text
//! script    := statement ((';' | NEWLINE)+ statement)*
//! statement := element ('|' element)*
//! element   := lambda | call
//! call      := WORD arg* block?
//! lambda    := '{' WORD '->' statement '}'
//! block     := '{' statement '}'
//! ```
//!
//! Any malformed input aborts with a positioned [`ShellError::Parse`];
//! there is never a partial tree.

use crate::ast::{Call, Script, Stmt, Word};
use crate::error::ShellError;
use crate::lexer::{lex, Spanned, Token};

/// Parse a whole script.
pub fn parse(source: &str) -> Result<Script, ShellError> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.script()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn script(&mut self) -> Result<Script, ShellError> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.at_end() {
            statements.push(self.statement()?);
            if !self.at_end() && !self.skip_separators() {
                let t = self.peek_spanned();
                return Err(ShellError::parse(
                    t.line,
                    t.column,
                    format!("expected ';' or newline, found {}", describe(&t.token)),
                ));
            }
        }
        if statements.is_empty() {
            // An empty (or comment-only) input is a valid, empty script.
        }
        Ok(Script { statements })
    }

    fn statement(&mut self) -> Result<Stmt, ShellError> {
        let mut stages = vec![self.element()?];
        while self.eat(&Token::Pipe) {
            self.skip_newlines();
            stages.push(self.element()?);
        }
        if stages.len() == 1 {
            Ok(stages.pop().unwrap_or(Stmt::Pipeline(Vec::new())))
        } else {
            Ok(Stmt::Pipeline(stages))
        }
    }

    fn element(&mut self) -> Result<Stmt, ShellError> {
        match self.peek() {
            Some(Token::OpenBrace) => self.lambda(),
            Some(Token::Word(_)) => self.call(),
            _ => {
                let t = self.peek_spanned();
                Err(ShellError::parse(
                    t.line,
                    t.column,
                    format!("expected a command, found {}", describe(&t.token)),
                ))
            }
        }
    }

    fn call(&mut self) -> Result<Stmt, ShellError> {
        let (name, line) = match self.next() {
            Some(Spanned {
                token: Token::Word(name),
                line,
                ..
            }) => (name, line),
            _ => unreachable!("call() is entered on a word token"),
        };

        let mut args = Vec::new();
        while let Some(Token::Word(_)) = self.peek() {
            if let Some(Spanned {
                token: Token::Word(text),
                line,
                ..
            }) = self.next()
            {
                args.push(Word::new(text, line));
            }
        }

        let call = Call { name, line, args };

        if matches!(self.peek(), Some(Token::OpenBrace)) {
            let body = self.block()?;
            return Ok(Stmt::Wrapped {
                call,
                body: Box::new(body),
            });
        }

        Ok(Stmt::Call(call))
    }

    fn block(&mut self) -> Result<Stmt, ShellError> {
        let open = self.expect(&Token::OpenBrace)?;
        self.skip_newlines();
        let body = self.statement()?;
        self.skip_newlines();
        if !self.eat(&Token::CloseBrace) {
            return Err(ShellError::parse(
                open.line,
                open.column,
                "unclosed '{' block",
            ));
        }
        Ok(body)
    }

    fn lambda(&mut self) -> Result<Stmt, ShellError> {
        let open = self.expect(&Token::OpenBrace)?;
        self.skip_newlines();

        let var = match self.next() {
            Some(Spanned {
                token: Token::Word(var),
                ..
            }) => var,
            other => {
                let (line, column) = position(other.as_ref(), &open);
                return Err(ShellError::parse(line, column, "expected a binding name after '{'"));
            }
        };

        if !self.eat(&Token::Arrow) {
            let t = self.peek_spanned();
            return Err(ShellError::parse(
                t.line,
                t.column,
                "expected '->' in lambda binding",
            ));
        }

        self.skip_newlines();
        let body = self.statement()?;
        self.skip_newlines();
        if !self.eat(&Token::CloseBrace) {
            return Err(ShellError::parse(
                open.line,
                open.column,
                "unclosed '{' lambda",
            ));
        }

        Ok(Stmt::Lambda {
            var,
            body: Box::new(body),
            line: open.line,
        })
    }

    // ── token plumbing ──

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    /// Position of the current token, or of the end of input.
    fn peek_spanned(&self) -> Spanned {
        self.tokens.get(self.pos).cloned().unwrap_or_else(|| {
            let (line, column) = self
                .tokens
                .last()
                .map(|t| (t.line, t.column + 1))
                .unwrap_or((1, 1));
            Spanned {
                token: Token::Newline,
                line,
                column,
            }
        })
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Spanned, ShellError> {
        match self.next() {
            Some(spanned) if &spanned.token == token => Ok(spanned),
            Some(spanned) => Err(ShellError::parse(
                spanned.line,
                spanned.column,
                format!("expected {}, found {}", describe(token), describe(&spanned.token)),
            )),
            None => Err(ShellError::parse(1, 1, format!("expected {}", describe(token)))),
        }
    }

    /// Consume `;`/newline runs. Returns whether anything was consumed.
    fn skip_separators(&mut self) -> bool {
        let mut any = false;
        while matches!(self.peek(), Some(Token::Semi | Token::Newline)) {
            self.pos += 1;
            any = true;
        }
        any
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }
}

fn position(token: Option<&Spanned>, fallback: &Spanned) -> (usize, usize) {
    token
        .map(|t| (t.line, t.column))
        .unwrap_or((fallback.line, fallback.column))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("'{w}'"),
        Token::Pipe => "'|'".into(),
        Token::Semi => "';'".into(),
        Token::Newline => "end of line".into(),
        Token::OpenBrace => "'{'".into(),
        Token::CloseBrace => "'}'".into(),
        Token::Arrow => "'->'".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_call() {
        let script = parse("echo hello world").unwrap();
        assert_eq!(script.statements.len(), 1);
        match &script.statements[0] {
            Stmt::Call(call) => {
                assert_eq!(call.name, "echo");
                assert_eq!(call.line, 1);
                let args: Vec<_> = call.args.iter().map(|w| w.text.as_str()).collect();
                assert_eq!(args, vec!["hello", "world"]);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_of_three() {
        let script = parse("rand | take 100 | count").unwrap();
        match &script.statements[0] {
            Stmt::Pipeline(stages) => assert_eq!(stages.len(), 3),
            other => panic!("expected a pipeline, got {other:?}"),
        }
    }

    #[test]
    fn sequence_by_semicolon_and_newline() {
        let script = parse("echo a ; echo b\necho c").unwrap();
        assert_eq!(script.statements.len(), 3);
    }

    #[test]
    fn lines_are_tracked_across_statements() {
        let script = parse("echo a\nbogus b").unwrap();
        match &script.statements[1] {
            Stmt::Call(call) => {
                assert_eq!(call.name, "bogus");
                assert_eq!(call.line, 2);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn wrapper_block() {
        let script = parse("benchmark 3 { echo hi }").unwrap();
        match &script.statements[0] {
            Stmt::Wrapped { call, body } => {
                assert_eq!(call.name, "benchmark");
                assert_eq!(call.args.len(), 1);
                assert!(matches!(**body, Stmt::Call(_)));
            }
            other => panic!("expected a wrapper, got {other:?}"),
        }
    }

    #[test]
    fn lambda_as_pipeline_stage() {
        let script = parse("glob *.txt | { f -> echo ${f} }").unwrap();
        match &script.statements[0] {
            Stmt::Pipeline(stages) => match &stages[1] {
                Stmt::Lambda { var, .. } => assert_eq!(var, "f"),
                other => panic!("expected a lambda, got {other:?}"),
            },
            other => panic!("expected a pipeline, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_empty_script() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("  \n # just a comment\n").unwrap().statements.is_empty());
    }

    #[test]
    fn unclosed_block_is_positioned() {
        let err = parse("time { echo hi").unwrap_err();
        match err {
            ShellError::Parse { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("unclosed"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn pipe_without_stage_is_an_error() {
        assert!(matches!(parse("echo a |"), Err(ShellError::Parse { .. })));
        assert!(matches!(parse("| count"), Err(ShellError::Parse { .. })));
    }

    #[test]
    fn lambda_requires_arrow() {
        let err = parse("{ x echo hi }").unwrap_err();
        assert!(matches!(err, ShellError::Parse { .. }));
    }
}
