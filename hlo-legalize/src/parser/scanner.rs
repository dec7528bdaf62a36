use crate::parser::token::Location;
use crate::parser::token::Token;
use crate::parser::token::TokenKind;
use anyhow::Result;

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    /// Column of `start`.
    start_column: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 0,
            column: 0,
            start_column: 0,
        }
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }
    fn peek(&self) -> char {
        self.peek_n(0)
    }
    fn peek_next(&self) -> char {
        self.peek_n(1)
    }
    fn peek_n(&self, n: usize) -> char {
        match self.source.get(self.current + n) {
            Some(c) => *c,
            None => '\0',
        }
    }
    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = if kind == TokenKind::Eof {
            "".to_string()
        } else {
            self.source[self.start..self.current].iter().collect()
        };
        let location = Location::new(self.line, self.start_column, self.start);
        self.tokens.push(Token::new(kind, lexeme, location));
    }
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        if is_float && (self.peek() == 'e' || self.peek() == 'E') {
            let sign = self.peek_next() == '+' || self.peek_next() == '-';
            let digit = if sign { self.peek_n(2) } else { self.peek_next() };
            if digit.is_ascii_digit() {
                self.advance();
                if sign {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }
        if is_float {
            self.add_token(TokenKind::FloatLiteral);
        } else {
            self.add_token(TokenKind::Integer)
        }
    }
    // Whether the character is a valid identifier start character.
    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }
    // Whether the character is a valid identifier character.
    fn is_identifier(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
    }
    // Whether the character can appear in a suffix id such as `%0` or `^bb0`.
    fn is_suffix(c: char) -> bool {
        Scanner::is_identifier(c) || c == '-'
    }
    fn identifier(&mut self) {
        while Scanner::is_identifier(self.peek()) {
            self.advance();
        }
        self.add_token(TokenKind::BareIdentifier);
    }
    /// Scan the rest of `%foo`, `^foo`, `@foo` or `#foo`.
    fn prefixed(&mut self, kind: TokenKind) {
        let is_valid = match kind {
            TokenKind::HashIdentifier | TokenKind::AtIdentifier => Scanner::is_identifier,
            _ => Scanner::is_suffix,
        };
        while is_valid(self.peek()) {
            self.advance();
        }
        // Result group index such as `%0#1`.
        if kind == TokenKind::PercentIdentifier
            && self.peek() == '#'
            && self.peek_next().is_ascii_digit()
        {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        if self.current - self.start == 1 {
            self.add_token(TokenKind::Error);
        } else {
            self.add_token(kind);
        }
    }
    fn arrow_or_minus(&mut self) {
        if self.peek() == '>' {
            self.advance();
            self.add_token(TokenKind::Arrow);
        } else {
            self.add_token(TokenKind::Minus);
        }
    }
    fn string(&mut self) -> Result<()> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\\' {
                self.advance();
            }
            if self.peek() == '\n' {
                break;
            }
            if !self.is_at_end() {
                self.advance();
            }
        }
        if self.peek() != '"' {
            let location = Location::new(self.line, self.start_column, self.start);
            let source: String = self.source.iter().collect();
            let msg = Self::error(&source, &location, "Unterminated string");
            return Err(anyhow::anyhow!(msg));
        }
        self.advance();
        self.add_token(TokenKind::String);
        Ok(())
    }
    /// Whether an `x` at the current position separates two dimensions.
    ///
    /// This is the case when it directly follows a dimension (`4`, `?` or
    /// `*`) without whitespace in between.
    fn is_dimension_separator(&self) -> bool {
        match self.tokens.last() {
            Some(previous) => {
                previous.end() == self.start
                    && matches!(
                        previous.kind,
                        TokenKind::Integer | TokenKind::Question | TokenKind::Star
                    )
            }
            None => false,
        }
    }
    fn line_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            ':' => self.add_token(TokenKind::Colon),
            ',' => self.add_token(TokenKind::Comma),
            '=' => self.add_token(TokenKind::Equal),
            '!' => self.add_token(TokenKind::Exclamation),
            '>' => self.add_token(TokenKind::Greater),
            '<' => self.add_token(TokenKind::Less),
            '?' => self.add_token(TokenKind::Question),
            '*' => self.add_token(TokenKind::Star),
            ' ' | '\r' | '\t' => (),
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '/' if self.peek() == '/' => self.line_comment(),
            '-' => self.arrow_or_minus(),
            '"' => self.string()?,
            '%' => self.prefixed(TokenKind::PercentIdentifier),
            '^' => self.prefixed(TokenKind::CaretIdentifier),
            '@' => self.prefixed(TokenKind::AtIdentifier),
            '#' => self.prefixed(TokenKind::HashIdentifier),
            'x' if self.is_dimension_separator() => {
                self.add_token(TokenKind::DimensionSeparator)
            }
            s if s.is_ascii_digit() => self.number(),
            s if Scanner::is_identifier_start(s) => self.identifier(),
            _ => self.add_token(TokenKind::Error),
        }
        Ok(())
    }
    fn scan_tokens(&mut self) -> Result<()> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token()?;
        }
        self.start = self.current;
        self.start_column = self.column;
        self.add_token(TokenKind::Eof);
        Ok(())
    }
    pub fn scan(src: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(src);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }
    /// Format `msg` below the line of `loc` with a caret pointing at the
    /// column.
    pub fn error(src: &str, loc: &Location, msg: &str) -> String {
        let lines = src.split('\n').collect::<Vec<&str>>();
        let n = loc.line().min(lines.len().saturating_sub(1));
        let prev_line = if n > 0 {
            let prev_n = n - 1;
            let prev = lines[prev_n];
            format!("\n{prev_n}  | {prev}")
        } else {
            "".to_string()
        };
        let line = lines.get(n).copied().unwrap_or("");
        let line_num_width = 4 + n.to_string().len();
        let err_indent = " ".repeat(loc.column() + line_num_width);
        format!("```{prev_line}\n{n}  | {line}\n{err_indent}^ {msg}\n```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::scan(src)
            .unwrap()
            .iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_scanner() {
        let tokens = Scanner::scan("42.5 42 1.0e-3").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[0].lexeme, "42.5");
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[1].lexeme, "42");
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].lexeme, "1.0e-3");
        assert_eq!(tokens[3].kind, TokenKind::Eof);

        let src = r#"%0:2 = "stablehlo.sort"(%arg0, %1#1) : (i32) -> ()"#;
        let tokens = Scanner::scan(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::PercentIdentifier);
        assert_eq!(tokens[0].lexeme, "%0");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
        assert_eq!(tokens[2].kind, TokenKind::Integer);
        assert_eq!(tokens[3].kind, TokenKind::Equal);
        assert_eq!(tokens[4].kind, TokenKind::String);
        assert_eq!(tokens[4].lexeme, r#""stablehlo.sort""#);
        assert_eq!(tokens[8].lexeme, "%1#1");
        assert_eq!(tokens[14].kind, TokenKind::Arrow);

        let src = "module {\n  %1 = \"foo.bar\"() : () -> i32\n}";
        let tokens = Scanner::scan(src).unwrap();
        assert_eq!(tokens[2].lexeme, "%1");
        assert_eq!(tokens[2].location.line(), 1);
        assert_eq!(tokens[2].location.column(), 2);

        let text = Scanner::error(src, &tokens[2].location, "test");
        let lines = text.split('\n').collect::<Vec<&str>>();
        assert_eq!(lines[0], "```");
        assert_eq!(lines[1], "0  | module {");
        assert_eq!(lines[2], "1  |   %1 = \"foo.bar\"() : () -> i32");
        assert_eq!(lines[3], "       ^ test");
        assert_eq!(lines[4], "```");
    }

    #[test]
    fn scan_tensor_dimensions() {
        use TokenKind::*;
        assert_eq!(
            kinds("tensor<4x?xf32>"),
            vec![
                BareIdentifier,
                Less,
                Integer,
                DimensionSeparator,
                Question,
                DimensionSeparator,
                BareIdentifier,
                Greater,
                Eof
            ]
        );
        assert_eq!(
            kinds("tensor<*xi1>"),
            vec![BareIdentifier, Less, Star, DimensionSeparator, BareIdentifier, Greater, Eof]
        );
        // An `x` after whitespace is a normal identifier.
        assert_eq!(kinds("4 x"), vec![Integer, BareIdentifier, Eof]);
    }

    #[test]
    fn scan_attributes_and_types() {
        let tokens = Scanner::scan("#stablehlo.gather<index_vector_dim = 1> !stablehlo.token").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::HashIdentifier);
        assert_eq!(tokens[0].lexeme, "#stablehlo.gather");
        assert_eq!(tokens[6].kind, TokenKind::Exclamation);
        assert_eq!(tokens[7].lexeme, "stablehlo.token");

        let tokens = Scanner::scan(r#""a \"quoted\" word" // comment"#).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, r#""a \"quoted\" word""#);

        assert!(Scanner::scan("\"unterminated").is_err());
        assert_eq!(kinds("%"), vec![TokenKind::Error, TokenKind::Eof]);
        assert_eq!(kinds(";"), vec![TokenKind::Error, TokenKind::Eof]);
    }
}
