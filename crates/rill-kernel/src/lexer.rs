//! Tokenizer for the rill script language.
//!
//! Splits source text into words and structural tokens, tracking
//! 1-based line/column positions. Quoting: single quotes are fully
//! literal; double quotes allow `\"` and `\\` escapes. A `#` outside
//! quotes starts a comment running to the end of the line.

use crate::error::ShellError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare or quoted word, quotes stripped.
    Word(String),
    Pipe,
    Semi,
    Newline,
    OpenBrace,
    CloseBrace,
    Arrow,
}

/// A token with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Tokenize a whole script.
pub fn lex(source: &str) -> Result<Vec<Spanned>, ShellError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;
    let mut column = 1usize;

    while let Some(&c) = chars.peek() {
        let start_line = line;
        let start_column = column;

        match c {
            '\n' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::Newline,
                    line: start_line,
                    column: start_column,
                });
                line += 1;
                column = 1;
            }
            ' ' | '\t' | '\r' => {
                chars.next();
                column += 1;
            }
            '#' => {
                // Comment: consume to end of line, leave the newline.
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                    column += 1;
                }
            }
            '|' => {
                chars.next();
                column += 1;
                tokens.push(Spanned {
                    token: Token::Pipe,
                    line: start_line,
                    column: start_column,
                });
            }
            ';' => {
                chars.next();
                column += 1;
                tokens.push(Spanned {
                    token: Token::Semi,
                    line: start_line,
                    column: start_column,
                });
            }
            '{' => {
                chars.next();
                column += 1;
                tokens.push(Spanned {
                    token: Token::OpenBrace,
                    line: start_line,
                    column: start_column,
                });
            }
            '}' => {
                chars.next();
                column += 1;
                tokens.push(Spanned {
                    token: Token::CloseBrace,
                    line: start_line,
                    column: start_column,
                });
            }
            _ => {
                let word = scan_word(&mut chars, &mut line, &mut column, start_line, start_column)?;
                let token = if word == "->" { Token::Arrow } else { Token::Word(word) };
                tokens.push(Spanned {
                    token,
                    line: start_line,
                    column: start_column,
                });
            }
        }
    }

    Ok(tokens)
}

/// Scan one word, handling quoting. Stops at whitespace or a structural
/// character.
fn scan_word(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: &mut usize,
    column: &mut usize,
    start_line: usize,
    start_column: usize,
) -> Result<String, ShellError> {
    let mut word = String::new();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' | '|' | ';' | '{' | '}' | '#' => break,
            '\'' => {
                chars.next();
                *column += 1;
                let mut closed = false;
                for c in chars.by_ref() {
                    *column += 1;
                    if c == '\'' {
                        closed = true;
                        break;
                    }
                    if c == '\n' {
                        *line += 1;
                        *column = 1;
                    }
                    word.push(c);
                }
                if !closed {
                    return Err(ShellError::parse(
                        start_line,
                        start_column,
                        "unterminated single-quoted string",
                    ));
                }
            }
            '"' => {
                chars.next();
                *column += 1;
                let mut closed = false;
                while let Some(c) = chars.next() {
                    *column += 1;
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => {
                                *column += 1;
                                word.push(escaped);
                            }
                            Some(other) => {
                                *column += 1;
                                word.push('\\');
                                word.push(other);
                            }
                            None => break,
                        },
                        '\n' => {
                            *line += 1;
                            *column = 1;
                            word.push(c);
                        }
                        _ => word.push(c),
                    }
                }
                if !closed {
                    return Err(ShellError::parse(
                        start_line,
                        start_column,
                        "unterminated double-quoted string",
                    ));
                }
            }
            _ => {
                chars.next();
                *column += 1;
                word.push(c);
            }
        }
    }

    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn splits_words_and_structure() {
        assert_eq!(
            words("echo hi | count"),
            vec![
                Token::Word("echo".into()),
                Token::Word("hi".into()),
                Token::Pipe,
                Token::Word("count".into()),
            ]
        );
    }

    #[test]
    fn semicolons_and_newlines() {
        assert_eq!(
            words("echo a ; echo b\necho c"),
            vec![
                Token::Word("echo".into()),
                Token::Word("a".into()),
                Token::Semi,
                Token::Word("echo".into()),
                Token::Word("b".into()),
                Token::Newline,
                Token::Word("echo".into()),
                Token::Word("c".into()),
            ]
        );
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(
            words("echo 'hello | world'"),
            vec![Token::Word("echo".into()), Token::Word("hello | world".into())]
        );
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(
            words(r#"echo "a \"b\" c""#),
            vec![Token::Word("echo".into()), Token::Word(r#"a "b" c"#.into())]
        );
    }

    #[test]
    fn quoted_and_bare_concatenate() {
        assert_eq!(words("echo a'b c'd"), vec![
            Token::Word("echo".into()),
            Token::Word("ab cd".into()),
        ]);
    }

    #[test]
    fn braces_and_arrow() {
        assert_eq!(
            words("{ x -> echo ${x} }"),
            vec![
                Token::OpenBrace,
                Token::Word("x".into()),
                Token::Arrow,
                Token::Word("echo".into()),
                Token::Word("${x}".into()),
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            words("echo a # trailing | noise\necho b"),
            vec![
                Token::Word("echo".into()),
                Token::Word("a".into()),
                Token::Newline,
                Token::Word("echo".into()),
                Token::Word("b".into()),
            ]
        );
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = lex("echo 'oops").unwrap_err();
        assert!(matches!(err, ShellError::Parse { line: 1, .. }));
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = lex("echo\n  count").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!(tokens[1].token, Token::Newline);
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }
}
