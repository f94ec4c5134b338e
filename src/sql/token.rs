//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings.

use crate::dialect::Dialect;

/// SQL Token - every element the DDL and statement builders emit.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Query Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    On,
    Join,
    GroupBy,
    Having,
    OrderBy,
    Distinct,
    In,
    IsNull,
    Null,
    NotNull,

    // === DDL Keywords ===
    Create,
    Alter,
    Drop,
    Table,
    Column,
    Index,
    Primary,
    Key,
    Unique,
    Default,
    If,
    Exists,
    Modify,

    // === DML Keywords ===
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // === Punctuation ===
    Comma,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Plus,
    Minus,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Identifier (table, column, index), quoted by the dialect.
    Ident(String),
    /// Bound-argument placeholder; filters rewrite it for the backend.
    Placeholder,
    /// Integer literal
    LitInt(i64),
    /// String literal
    LitString(String),

    // === Escape Hatch ===
    /// Raw SQL passed directly to output without escaping.
    ///
    /// Used for native type names, default expressions and caller-supplied
    /// condition text. Never put user values here; bind them as arguments.
    Raw(String),
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    pub fn serialize<D: Dialect + ?Sized>(&self, dialect: &D) -> String {
        match self {
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => dialect.and_str().into(),
            Token::Or => dialect.or_str().into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::In => "IN".into(),
            Token::IsNull => "IS NULL".into(),
            Token::Null => "NULL".into(),
            Token::NotNull => "NOT NULL".into(),

            Token::Create => "CREATE".into(),
            Token::Alter => "ALTER".into(),
            Token::Drop => "DROP".into(),
            Token::Table => "TABLE".into(),
            Token::Column => "COLUMN".into(),
            Token::Index => "INDEX".into(),
            Token::Primary => "PRIMARY".into(),
            Token::Key => "KEY".into(),
            Token::Unique => "UNIQUE".into(),
            Token::Default => "DEFAULT".into(),
            Token::If => "IF".into(),
            Token::Exists => "EXISTS".into(),
            Token::Modify => "MODIFY".into(),

            Token::Insert => "INSERT".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),

            Token::Comma => ",".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Eq => dialect.eq_str().into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),

            Token::Space => " ".into(),

            Token::Ident(name) => dialect.quote(name),
            Token::Placeholder => "?".into(),
            Token::LitInt(n) => n.to_string(),
            Token::LitString(s) => format!("'{}'", s.replace('\'', "''")),

            Token::Raw(s) => s.clone(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Push keywords separated by single spaces.
    pub fn keywords(&mut self, kws: impl IntoIterator<Item = Token>) -> &mut Self {
        for (i, kw) in kws.into_iter().enumerate() {
            if i > 0 {
                self.space();
            }
            self.push(kw);
        }
        self
    }

    /// Push `items` separated by `sep`; each item may contribute several tokens.
    pub fn separated<I, F>(&mut self, items: I, sep: &[Token], mut each: F) -> &mut Self
    where
        I: IntoIterator,
        F: FnMut(&mut Self, I::Item),
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.extend(sep.iter().cloned());
            }
            each(self, item);
        }
        self
    }

    /// Quoted identifiers joined by a bare comma, as used in key and index lists.
    pub fn ident_list<S: AsRef<str>>(&mut self, names: &[S]) -> &mut Self {
        self.separated(names, &[Token::Comma], |ts, name| {
            let name: &str = name.as_ref();
            ts.push(Token::Ident(name.to_string()));
        })
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize<D: Dialect + ?Sized>(&self, dialect: &D) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}
