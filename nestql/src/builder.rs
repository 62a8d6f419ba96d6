use std::fmt::Write;

use crate::database::Dialect;
use crate::ty::Value;

/// Accumulates statement text together with its parameters,
/// in the order their placeholders appear in the text.
pub struct QueryBuilder {
    dialect: Dialect,
    buf: String,
    params: Vec<Value>,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            buf: String::with_capacity(256),
            params: vec![],
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn build(self) -> (String, Vec<Value>) {
        (self.buf, self.params)
    }

    pub fn push(&mut self, str: &str) {
        self.buf.push_str(str);
    }

    /// Push a quoted identifier.
    pub fn push_ident(&mut self, ident: &str) {
        self.buf.push('"');
        for ch in ident.chars() {
            if ch == '"' {
                self.buf.push('"');
            }
            self.buf.push(ch);
        }
        self.buf.push('"');
    }

    /// Push `"t<alias>"."column"`.
    pub fn push_column(&mut self, alias: u16, column: &str) {
        self.push_alias(alias);
        self.buf.push('.');
        self.push_ident(column);
    }

    pub fn push_alias(&mut self, alias: u16) {
        let _ = write!(self.buf, "\"t{}\"", alias);
    }

    /// Push a placeholder and record the value bound to it.
    ///
    /// NULL is written as a literal, a typed NULL parameter
    /// would not coerce to every column type on PostgreSQL.
    pub fn push_param(&mut self, value: Value) {
        if value.is_null() {
            self.push("NULL");
            return;
        }
        self.params.push(value);
        match self.dialect {
            Dialect::Sqlite => self.buf.push('?'),
            Dialect::Postgres => {
                let _ = write!(self.buf, "${}", self.params.len());
            }
        }
    }

    pub fn push_u64(&mut self, value: u64) {
        let _ = write!(self.buf, "{}", value);
    }
}
