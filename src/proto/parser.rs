// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive-descent parser for the emitted proto3 subset.

use crate::proto::model::{
    EnumDescriptor, EnumVariantDescriptor, FieldDescriptor, FieldKind, FileDescriptor,
    MessageDescriptor, ScalarKind,
};
use std::fmt;

/// Schema text parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Punct(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier `{}`", s),
            Token::Int(v) => format!("integer `{}`", v),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Punct(c) => format!("`{}`", c),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                match chars.peek() {
                    Some('/') => {
                        for c in chars.by_ref() {
                            if c == '\n' {
                                line += 1;
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = '\0';
                        let mut closed = false;
                        for c in chars.by_ref() {
                            if c == '\n' {
                                line += 1;
                            }
                            if prev == '*' && c == '/' {
                                closed = true;
                                break;
                            }
                            prev = c;
                        }
                        if !closed {
                            return Err(ParseError {
                                line,
                                message: "unterminated block comment".into(),
                            });
                        }
                    }
                    _ => {
                        return Err(ParseError {
                            line,
                            message: "unexpected `/`".into(),
                        })
                    }
                }
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    if c == '\n' {
                        line += 1;
                    }
                    s.push(c);
                }
                if !closed {
                    return Err(ParseError {
                        line,
                        message: "unterminated string literal".into(),
                    });
                }
                tokens.push((Token::Str(s), line));
            }
            '-' | '0'..='9' => {
                let mut s = String::new();
                s.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = s.parse::<i64>().map_err(|_| ParseError {
                    line,
                    message: format!("invalid integer `{}`", s),
                })?;
                tokens.push((Token::Int(value), line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if is_ident_char(d) {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(s), line));
            }
            '{' | '}' | '=' | ';' | '<' | '>' | ',' | '(' | ')' | '[' | ']' => {
                chars.next();
                tokens.push((Token::Punct(c), line));
            }
            other => {
                return Err(ParseError {
                    line,
                    message: format!("unexpected character `{}`", other),
                })
            }
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |(_, l)| *l)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_punct(&mut self, c: char) -> Result<(), ParseError> {
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(self.error(format!("expected `{}`, found {}", c, other.describe()))),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.next()? {
            Token::Ident(s) => Ok(s),
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    fn expect_int(&mut self) -> Result<i64, ParseError> {
        match self.next()? {
            Token::Int(v) => Ok(v),
            other => Err(self.error(format!("expected integer, found {}", other.describe()))),
        }
    }

    fn expect_str(&mut self) -> Result<String, ParseError> {
        match self.next()? {
            Token::Str(s) => Ok(s),
            other => Err(self.error(format!(
                "expected string literal, found {}",
                other.describe()
            ))),
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_file(&mut self) -> Result<FileDescriptor, ParseError> {
        let mut file = FileDescriptor::default();
        while let Some(token) = self.peek() {
            match token {
                Token::Ident(kw) => match kw.as_str() {
                    "syntax" => {
                        self.pos += 1;
                        self.expect_punct('=')?;
                        let syntax = self.expect_str()?;
                        if syntax != "proto3" {
                            return Err(self.error(format!("unsupported syntax `{}`", syntax)));
                        }
                        self.expect_punct(';')?;
                    }
                    "package" => {
                        self.pos += 1;
                        file.package = self.expect_ident()?;
                        self.expect_punct(';')?;
                    }
                    "import" => {
                        self.pos += 1;
                        file.imports.push(self.expect_str()?);
                        self.expect_punct(';')?;
                    }
                    "message" => {
                        self.pos += 1;
                        let message = self.parse_message(&file.package)?;
                        file.messages.push(message);
                    }
                    "enum" => {
                        self.pos += 1;
                        let definition = self.parse_enum(&file.package)?;
                        file.enums.push(definition);
                    }
                    "extend" => {
                        self.pos += 1;
                        self.parse_extend(&mut file)?;
                    }
                    "option" => {
                        self.pos += 1;
                        while self.peek() != Some(&Token::Punct(';')) {
                            self.next()?;
                        }
                        self.expect_punct(';')?;
                    }
                    other => {
                        return Err(self.error(format!("unexpected keyword `{}`", other)));
                    }
                },
                other => {
                    return Err(self.error(format!("unexpected token {}", other.describe())));
                }
            }
        }
        Ok(file)
    }

    fn parse_message(&mut self, package: &str) -> Result<MessageDescriptor, ParseError> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;
        let mut fields = Vec::new();
        loop {
            if self.eat_punct('}') {
                break;
            }
            match self.peek() {
                Some(Token::Ident(kw)) if kw == "oneof" => {
                    self.pos += 1;
                    let group = self.expect_ident()?;
                    self.expect_punct('{')?;
                    while !self.eat_punct('}') {
                        let field = self.parse_field(Some(group.clone()))?;
                        fields.push(field);
                    }
                }
                Some(Token::Ident(_)) => {
                    let field = self.parse_field(None)?;
                    fields.push(field);
                }
                Some(other) => {
                    return Err(self.error(format!(
                        "unexpected token {} in message body",
                        other.describe()
                    )));
                }
                None => return Err(self.error("unexpected end of message body")),
            }
        }
        Ok(MessageDescriptor {
            name,
            package: package.to_string(),
            fields,
        })
    }

    fn parse_field(&mut self, oneof: Option<String>) -> Result<FieldDescriptor, ParseError> {
        let mut repeated = false;
        if let Some(Token::Ident(kw)) = self.peek() {
            match kw.as_str() {
                "repeated" => {
                    repeated = true;
                    self.pos += 1;
                }
                // proto3 `optional` changes presence tracking only; the
                // codec models presence through absence of the field.
                "optional" => {
                    self.pos += 1;
                }
                _ => {}
            }
        }
        let kind = self.parse_field_kind()?;
        let name = self.expect_ident()?;
        self.expect_punct('=')?;
        let number = self.expect_int()?;
        if number < 0 {
            return Err(self.error(format!("negative field number {}", number)));
        }
        if self.eat_punct('[') {
            self.skip_options()?;
        }
        self.expect_punct(';')?;
        Ok(FieldDescriptor {
            name,
            number: number as u32,
            repeated,
            kind,
            oneof,
        })
    }

    fn parse_field_kind(&mut self) -> Result<FieldKind, ParseError> {
        let type_name = self.expect_ident()?;
        if type_name == "map" {
            self.expect_punct('<')?;
            let key_name = self.expect_ident()?;
            let key = ScalarKind::from_name(&key_name)
                .filter(|k| k.valid_map_key())
                .ok_or_else(|| self.error(format!("invalid map key type `{}`", key_name)))?;
            self.expect_punct(',')?;
            let value_name = self.expect_ident()?;
            let value = match ScalarKind::from_name(&value_name) {
                Some(scalar) => FieldKind::Scalar(scalar),
                None => FieldKind::Message(value_name),
            };
            self.expect_punct('>')?;
            return Ok(FieldKind::Map(key, Box::new(value)));
        }
        match ScalarKind::from_name(&type_name) {
            Some(scalar) => Ok(FieldKind::Scalar(scalar)),
            // Message vs enum is decided at link time.
            None => Ok(FieldKind::Message(type_name)),
        }
    }

    fn parse_enum(&mut self, package: &str) -> Result<EnumDescriptor, ParseError> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;
        let mut variants = Vec::new();
        while !self.eat_punct('}') {
            let variant_name = self.expect_ident()?;
            self.expect_punct('=')?;
            let number = self.expect_int()?;
            let mut class_name = None;
            let mut package_name = None;
            if self.eat_punct('[') {
                for (option, value) in self.parse_option_list()? {
                    match option.as_str() {
                        "className" => class_name = Some(value),
                        "packageName" => package_name = Some(value),
                        _ => {}
                    }
                }
            }
            self.expect_punct(';')?;
            variants.push(EnumVariantDescriptor {
                name: variant_name,
                number: number as i32,
                class_name,
                package_name,
            });
        }
        Ok(EnumDescriptor {
            name,
            package: package.to_string(),
            variants,
        })
    }

    /// Parse `(name) = "value"` pairs up to the closing `]`.
    fn parse_option_list(&mut self) -> Result<Vec<(String, String)>, ParseError> {
        let mut options = Vec::new();
        loop {
            let name = if self.eat_punct('(') {
                let name = self.expect_ident()?;
                self.expect_punct(')')?;
                name
            } else {
                self.expect_ident()?
            };
            self.expect_punct('=')?;
            let value = match self.next()? {
                Token::Str(s) => s,
                Token::Int(v) => v.to_string(),
                Token::Ident(s) => s,
                other => {
                    return Err(
                        self.error(format!("expected option value, found {}", other.describe()))
                    )
                }
            };
            options.push((name, value));
            if self.eat_punct(']') {
                break;
            }
            self.expect_punct(',')?;
        }
        Ok(options)
    }

    /// Consume option brackets without interpreting them.
    fn skip_options(&mut self) -> Result<(), ParseError> {
        let _ = self.parse_option_list()?;
        Ok(())
    }

    /// `extend <target> { optional <type> <name> = <n>; ... }` — extension
    /// declarations are recorded by field name only.
    fn parse_extend(&mut self, file: &mut FileDescriptor) -> Result<(), ParseError> {
        let _target = self.expect_ident()?;
        self.expect_punct('{')?;
        while !self.eat_punct('}') {
            if let Some(Token::Ident(kw)) = self.peek() {
                if kw == "optional" || kw == "repeated" {
                    self.pos += 1;
                }
            }
            let _type_name = self.expect_ident()?;
            let name = self.expect_ident()?;
            self.expect_punct('=')?;
            let _number = self.expect_int()?;
            self.expect_punct(';')?;
            file.extensions.push(name);
        }
        Ok(())
    }
}

/// Parse one schema file.
pub fn parse_file(text: &str) -> Result<FileDescriptor, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_file()
}
