use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::{LexError, LexResult};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia();

        let start_line = self.line;
        let start_column = self.column;
        let Some(&(start_idx, ch)) = self.chars.peek() else {
            self.eof_reached = true;
            let index = self.input.len();
            return Ok(Token::new(
                TokenKind::Eof,
                "",
                Span {
                    start: index,
                    end: index,
                    line: self.line,
                    column: self.column,
                    end_line: self.line,
                },
            ));
        };

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '=' => {
                return Ok(self.read_operator(
                    start_idx,
                    start_line,
                    start_column,
                    TokenKind::Assign,
                    TokenKind::EqualEqual,
                ));
            }
            '!' => {
                return Ok(self.read_operator(
                    start_idx,
                    start_line,
                    start_column,
                    TokenKind::Unknown,
                    TokenKind::BangEqual,
                ));
            }
            '<' => {
                return Ok(self.read_operator(
                    start_idx,
                    start_line,
                    start_column,
                    TokenKind::Less,
                    TokenKind::LessEqual,
                ));
            }
            '>' => {
                return Ok(self.read_operator(
                    start_idx,
                    start_line,
                    start_column,
                    TokenKind::Greater,
                    TokenKind::GreaterEqual,
                ));
            }
            '"' => return self.read_string(start_idx, start_line, start_column),
            c if c.is_alphabetic() || c == '_' => {
                return Ok(self.read_identifier(start_idx, start_line, start_column));
            }
            c if c.is_ascii_digit() => {
                return Ok(self.read_integer(start_idx, start_line, start_column));
            }
            _ => TokenKind::Unknown,
        };

        self.advance_char();
        Ok(self.token_from(kind, start_idx, start_line, start_column))
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance_char();
            } else if c == '#' {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance_char();
                }
            } else {
                break;
            }
        }
    }

    /// Reads a one or two character operator. The two character form is only
    /// taken when the very next character is `=`.
    fn read_operator(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        single: TokenKind,
        with_equal: TokenKind,
    ) -> Token {
        self.advance_char();
        let kind = if matches!(self.chars.peek(), Some(&(_, '='))) {
            self.advance_char();
            with_equal
        } else {
            single
        };
        self.token_from(kind, start, line, column)
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token {
        self.advance_char(); // Consume first char
        self.consume_identifier_tail();
        let end_idx = self.current_index();
        let ident = &self.input[start..end_idx];
        let kind = TokenKind::keyword(ident).unwrap_or(TokenKind::Identifier);
        self.token_from(kind, start, line, column)
    }

    fn read_integer(&mut self, start: usize, line: usize, column: usize) -> Token {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        // Digits glued to letters form one identifier, e.g. `2nd`.
        if let Some(&(_, c)) = self.chars.peek()
            && (c.is_alphabetic() || c == '_')
        {
            self.consume_identifier_tail();
            return self.token_from(TokenKind::Identifier, start, line, column);
        }

        self.token_from(TokenKind::Integer, start, line, column)
    }

    fn read_string(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token> {
        self.advance_char(); // Consume opening quote
        let mut value = String::new();
        while let Some((idx, c)) = self.advance_char() {
            match c {
                '"' => {
                    return Ok(Token::new(
                        TokenKind::String,
                        value,
                        Span {
                            start,
                            end: idx + 1,
                            line,
                            column,
                            end_line: self.line,
                        },
                    ));
                }
                '\\' => match self.advance_char() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                other => value.push(other),
            }
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn consume_identifier_tail(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn token_from(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        let end = self.current_index();
        Token::new(
            kind,
            &self.input[start..end],
            Span {
                start,
                end,
                line,
                column,
                end_line: line,
            },
        )
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl Iterator for Lexer<'_> {
    type Item = LexResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        Some(self.next_token())
    }
}

/// Tokenizes the whole input. The result always ends with a single `Eof` token.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn lexemes(input: &str) -> Vec<String> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.lexeme)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {r#"
            def add(a, b):
                return a + b
            print "sum", add(1, 2)
        "#};
        let expected = vec![
            TokenKind::Def,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::Comma,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Return,
            TokenKind::Identifier,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::Print,
            TokenKind::String,
            TokenKind::Comma,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::Integer,
            TokenKind::Comma,
            TokenKind::Integer,
            TokenKind::RParen,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn recognizes_two_character_operators_without_spaces() {
        assert_eq!(
            kinds("a>=b<=c==d!=e"),
            vec![
                TokenKind::Identifier,
                TokenKind::GreaterEqual,
                TokenKind::Identifier,
                TokenKind::LessEqual,
                TokenKind::Identifier,
                TokenKind::EqualEqual,
                TokenKind::Identifier,
                TokenKind::BangEqual,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn falls_back_to_single_character_operators() {
        assert_eq!(
            kinds("x = a > b < c"),
            vec![
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Identifier,
                TokenKind::Greater,
                TokenKind::Identifier,
                TokenKind::Less,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        // `> =` with a space is two tokens.
        assert_eq!(
            kinds("a > = b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Greater,
                TokenKind::Assign,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lone_bang_is_unknown() {
        let tokens = tokenize("!x").expect("tokenize should succeed");
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].lexeme, "!");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn unknown_characters_become_tokens() {
        let tokens = tokenize("x = 1 @ 2").expect("unknown characters are deferred");
        assert_eq!(tokens[3].kind, TokenKind::Unknown);
        assert_eq!(tokens[3].lexeme, "@");
    }

    #[test]
    fn skips_comments_through_end_of_line() {
        let input = indoc! {"
            x = 1 # set x
            # whole line comment
            print x
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Print,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn digits_glued_to_letters_form_an_identifier() {
        let tokens = tokenize("123abc 42").expect("tokenize should succeed");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "123abc");
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[1].lexeme, "42");
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = tokenize(r#""say \"hi\"\n\\ \q""#).expect("tokenize should succeed");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "say \"hi\"\n\\ q");
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("x = 1\nprint \"oops").expect_err("expected lexing failure");
        assert_eq!(err, LexError::UnterminatedString { line: 2, column: 6 });
        assert!(err.to_string().contains("Unterminated string literal"));
    }

    #[test]
    fn errors_on_trailing_backslash_in_string() {
        let err = tokenize("\"abc\\").expect_err("expected lexing failure");
        assert_eq!(err, LexError::UnterminatedString { line: 1, column: 0 });
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("x = 1\n  print x").expect("tokenize should succeed");
        let print = &tokens[3];
        assert_eq!(print.kind, TokenKind::Print);
        assert_eq!((print.span.line, print.span.column), (2, 2));
        assert_eq!(&"x = 1\n  print x"[print.span.start..print.span.end], "print");
        assert_eq!(print.span.end_line, 2);
    }

    #[test]
    fn multi_line_string_records_its_closing_line() {
        let tokens = tokenize("\"a\nb\" 1").expect("tokenize should succeed");
        assert_eq!((tokens[0].span.line, tokens[0].span.end_line), (1, 2));
        assert_eq!((tokens[1].span.line, tokens[1].span.end_line), (2, 2));
    }

    #[test]
    fn empty_input_yields_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t # nothing\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn relexing_joined_lexemes_is_stable() {
        let source = "(12+x)*3/y-4>=z";
        let tokens = tokenize(source).expect("tokenize should succeed");
        let joined = tokens
            .iter()
            .map(|token| token.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let retokenized = tokenize(&joined).expect("re-tokenize should succeed");

        let pairs = |tokens: &[Token]| {
            tokens
                .iter()
                .map(|token| (token.kind, token.lexeme.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&tokens), pairs(&retokenized));
        assert_eq!(
            lexemes(source),
            vec!["(", "12", "+", "x", ")", "*", "3", "/", "y", "-", "4", ">=", "z", ""]
        );
    }
}
