//! Command parser for the query shell.
//!
//! Grammar (keywords are case-insensitive, a trailing `;` is ignored):
//!
//! ```text
//! SELECT <key | value | * | COUNT(*)> FROM <table> [WHERE <cond> (AND <cond>)*]
//! LOAD <table> FROM '<file>' [WITH INDEX]
//! QUIT | EXIT
//!
//! <cond> := (key | value) (= | <> | < | > | <= | >=) <literal>
//! ```

use crate::error::{IndexError, Result};
use crate::query::{Comparator, Condition};
use std::path::PathBuf;

/// Column list of a `SELECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectTarget {
    Key,
    Value,
    /// Both columns
    All,
    /// Number of matching tuples
    Count,
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select {
        target: SelectTarget,
        table: String,
        conditions: Vec<Condition>,
    },
    Load {
        table: String,
        file: PathBuf,
        with_index: bool,
    },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Number(String),
    Quoted(String),
    Symbol(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{}'", w),
            Token::Number(n) => n.clone(),
            Token::Quoted(s) => format!("string '{}'", s),
            Token::Symbol(s) => format!("'{}'", s),
        }
    }
}

/// Split a command line into tokens
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Quoted string, either quote style.
        if c == '\'' || c == '"' {
            let start = i + 1;
            i = start;
            while i < len && chars[i] != c {
                i += 1;
            }
            if i >= len {
                return Err(IndexError::parse("unterminated quoted string"));
            }
            tokens.push(Token::Quoted(chars[start..i].iter().collect()));
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '-' && i + 1 < len && chars[i + 1].is_ascii_digit()) {
            let start = i;
            i += 1;
            while i < len && chars[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (symbol, width) = match (c, next) {
            ('<', Some('>')) => ("<>", 2),
            ('<', Some('=')) => ("<=", 2),
            ('>', Some('=')) => (">=", 2),
            ('<', _) => ("<", 1),
            ('>', _) => (">", 1),
            ('=', _) => ("=", 1),
            ('*', _) => ("*", 1),
            ('(', _) => ("(", 1),
            (')', _) => (")", 1),
            (';', _) => (";", 1),
            _ => return Err(IndexError::parse(format!("unexpected character '{}'", c))),
        };
        tokens.push(Token::Symbol(symbol));
        i += width;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| IndexError::parse("unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next()? {
            Token::Word(w) if w.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(IndexError::parse(format!(
                "expected {}, found {}",
                keyword,
                other.describe()
            ))),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<()> {
        match self.next()? {
            Token::Symbol(s) if s == symbol => Ok(()),
            other => Err(IndexError::parse(format!(
                "expected '{}', found {}",
                symbol,
                other.describe()
            ))),
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.next()? {
            Token::Word(w) => Ok(w),
            other => Err(IndexError::parse(format!(
                "expected a table name, found {}",
                other.describe()
            ))),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(IndexError::parse(format!(
                "unexpected {} after statement",
                token.describe()
            ))),
        }
    }

    fn statement(&mut self) -> Result<Statement> {
        let keyword = match self.next()? {
            Token::Word(w) => w.to_uppercase(),
            other => {
                return Err(IndexError::parse(format!(
                    "expected a command, found {}",
                    other.describe()
                )))
            }
        };

        let statement = match keyword.as_str() {
            "SELECT" => self.select()?,
            "LOAD" => self.load()?,
            "QUIT" | "EXIT" => Statement::Quit,
            other => return Err(IndexError::parse(format!("unknown command '{}'", other))),
        };
        self.finish()?;
        Ok(statement)
    }

    fn select(&mut self) -> Result<Statement> {
        let target = match self.next()? {
            Token::Symbol("*") => SelectTarget::All,
            Token::Word(w) => match w.to_uppercase().as_str() {
                "KEY" => SelectTarget::Key,
                "VALUE" => SelectTarget::Value,
                "COUNT" => {
                    self.expect_symbol("(")?;
                    self.expect_symbol("*")?;
                    self.expect_symbol(")")?;
                    SelectTarget::Count
                }
                _ => return Err(IndexError::parse(format!("unknown column '{}'", w))),
            },
            other => {
                return Err(IndexError::parse(format!(
                    "expected a column, found {}",
                    other.describe()
                )))
            }
        };

        self.expect_keyword("FROM")?;
        let table = self.identifier()?;

        let mut conditions = Vec::new();
        if self.peek_keyword("WHERE") {
            self.pos += 1;
            conditions.push(self.condition()?);
            while self.peek_keyword("AND") {
                self.pos += 1;
                conditions.push(self.condition()?);
            }
        }

        Ok(Statement::Select {
            target,
            table,
            conditions,
        })
    }

    fn condition(&mut self) -> Result<Condition> {
        let attr = match self.next()? {
            Token::Word(w) => w.to_uppercase(),
            other => {
                return Err(IndexError::parse(format!(
                    "expected key or value, found {}",
                    other.describe()
                )))
            }
        };

        let comp = match self.next()? {
            Token::Symbol(s) => Comparator::from_symbol(s),
            _ => None,
        }
        .ok_or_else(|| IndexError::parse("expected a comparison operator"))?;

        let literal = match self.next()? {
            Token::Number(s) | Token::Quoted(s) | Token::Word(s) => s,
            Token::Symbol(s) => {
                return Err(IndexError::parse(format!("expected a literal, found '{}'", s)))
            }
        };

        match attr.as_str() {
            "KEY" => {
                let value = literal.trim().parse::<i32>().map_err(|_| {
                    IndexError::parse(format!("key literal '{}' is not a 32-bit integer", literal))
                })?;
                Ok(Condition::key(comp, value))
            }
            "VALUE" => Ok(Condition::value(comp, literal)),
            _ => Err(IndexError::parse(format!("unknown attribute '{}'", attr))),
        }
    }

    fn load(&mut self) -> Result<Statement> {
        let table = self.identifier()?;
        self.expect_keyword("FROM")?;
        let file = match self.next()? {
            Token::Quoted(path) => PathBuf::from(path),
            other => {
                return Err(IndexError::parse(format!(
                    "expected a quoted file name, found {}",
                    other.describe()
                )))
            }
        };

        let with_index = if self.peek_keyword("WITH") {
            self.pos += 1;
            self.expect_keyword("INDEX")?;
            true
        } else {
            false
        };

        Ok(Statement::Load {
            table,
            file,
            with_index,
        })
    }
}

/// Parse one command line
pub fn parse_statement(input: &str) -> Result<Statement> {
    let mut tokens = tokenize(input)?;
    if tokens.last() == Some(&Token::Symbol(";")) {
        tokens.pop();
    }
    if tokens.is_empty() {
        return Err(IndexError::parse("empty statement"));
    }
    Parser { tokens, pos: 0 }.statement()
}
