//! The character dataset: a read-only SQLite connection.
//!
//! The connection is opened once per process and shared by every request.
//! Two scalar functions are registered on it:
//!
//! - `regexp(pattern, text)`, backing SQLite's `REGEXP` operator with the
//!   `regex` crate. Compiled patterns are cached per statement.
//! - `parse_int(text, radix)`, a `parseInt`-style integer parse that yields
//!   NULL for malformed input or values outside the safe integer range.

use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::{CachedStatement, Connection, OpenFlags, OptionalExtension, ToSql, params_from_iter};
use tracing::debug;

use crate::compose::ComposedQuery;
use crate::error::{Error, Result};
use crate::params;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub struct Dataset {
    conn: Connection,
}

impl Dataset {
    /// Open a dataset file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened dataset");
        Self::from_connection(conn)
    }

    /// An in-memory dataset initialised from a SQL script.
    pub fn in_memory(script: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(script)?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
        conn.create_scalar_function("regexp", 2, flags, regexp)?;
        conn.create_scalar_function("parse_int", 2, flags, parse_int)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Prepare a composed query. Nothing runs until the cursor is pulled.
    pub fn prepare(&self, query: &ComposedQuery) -> Result<Prepared<'_>> {
        debug!(sql = %query.sql, args = ?query.args, "prepare");
        let stmt = self.conn.prepare_cached(&query.sql)?;
        Ok(Prepared {
            stmt,
            args: query.args.clone(),
        })
    }

    /// Run a query and collect its first column.
    pub fn collect_strings(&self, sql: &str, args: &[&str]) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Run a single-row query with named parameters; `None` when no row
    /// matched or the value is NULL.
    pub fn query_text(&self, sql: &str, named: &[(&str, &dyn ToSql)]) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let text = stmt
            .query_row(named, |row| row.get::<_, Option<String>>(0))
            .optional()?;
        Ok(text.flatten())
    }
}

/// A prepared statement with its bound arguments.
pub struct Prepared<'c> {
    stmt: CachedStatement<'c>,
    args: Vec<String>,
}

impl Prepared<'_> {
    /// A lazy cursor over the first column. Rows are fetched one at a time as
    /// the cursor is pulled.
    pub fn cursor(&mut self) -> Result<impl Iterator<Item = Result<String>> + '_> {
        let rows = self
            .stmt
            .query_map(params_from_iter(self.args.iter()), |row| {
                row.get::<_, String>(0)
            })?;
        Ok(rows.map(|r| r.map_err(Error::from)))
    }
}

fn regexp(ctx: &Context<'_>) -> rusqlite::Result<Option<bool>> {
    let re: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
        Ok(Regex::new(vr.as_str()?)?)
    })?;
    let matched = match ctx.get_raw(1) {
        ValueRef::Null => return Ok(None),
        ValueRef::Text(t) => std::str::from_utf8(t).is_ok_and(|t| re.is_match(t)),
        ValueRef::Integer(n) => re.is_match(&n.to_string()),
        ValueRef::Real(f) => re.is_match(&f.to_string()),
        ValueRef::Blob(_) => false,
    };
    Ok(Some(matched))
}

fn parse_int(ctx: &Context<'_>) -> rusqlite::Result<Option<i64>> {
    let Some(radix) = ctx.get::<Option<i64>>(1)? else {
        return Ok(None);
    };
    let Ok(radix) = u32::try_from(radix) else {
        return Ok(None);
    };
    let parsed = match ctx.get_raw(0) {
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| params::parse_int(s, radix)),
        ValueRef::Integer(n) => params::parse_int(&n.to_string(), radix),
        ValueRef::Null | ValueRef::Real(_) | ValueRef::Blob(_) => None,
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::fixture;

    #[test]
    fn regexp_function() {
        let ds = fixture();
        let hit: bool = ds
            .connection()
            .query_row("SELECT '漢' regexp '^[\\p{L}]$'", [], |r| r.get(0))
            .unwrap();
        assert!(hit);
        let miss: bool = ds
            .connection()
            .query_row("SELECT ' ' regexp '^[\\p{L}\\p{N}\\p{S}]$'", [], |r| r.get(0))
            .unwrap();
        assert!(!miss);
    }

    #[test]
    fn regexp_invalid_utf8_does_not_match() {
        let ds = fixture();
        let v: Option<bool> = ds
            .connection()
            .query_row("SELECT char(55296) regexp '^[\\p{L}\\p{N}\\p{S}]$'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, Some(false));
    }

    #[test]
    fn regexp_null_text_is_null() {
        let ds = fixture();
        let v: Option<bool> = ds
            .connection()
            .query_row("SELECT NULL regexp 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn parse_int_function() {
        let ds = fixture();
        let conn = ds.connection();
        let v: Option<i64> = conn
            .query_row("SELECT parse_int('6f22', 16)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, Some(0x6f22));
        let v: Option<i64> = conn
            .query_row("SELECT parse_int('zz', 16)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, None);
        let v: Option<i64> = conn
            .query_row("SELECT parse_int('ffffffffffffffff', 16)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn collect_first_column() {
        let ds = fixture();
        let chars = ds
            .collect_strings(
                "SELECT 対応するUCS FROM mji WHERE 総画数 = cast(? as integer) ORDER BY 対応するUCS",
                &["2"],
            )
            .unwrap();
        assert_eq!(chars, vec!["丁", "七"]);
    }

    #[test]
    fn cursor_is_lazy_and_ordered() {
        let ds = fixture();
        let query = ComposedQuery {
            sql: "SELECT 対応するUCS FROM mji
                  WHERE 対応するUCS IS NOT NULL AND 総画数 = cast(? as integer)
                  ORDER BY 対応するUCS"
                .into(),
            args: vec!["8".into()],
        };
        let mut prepared = ds.prepare(&query).unwrap();
        let mut cursor = prepared.cursor().unwrap();
        assert!(cursor.next().unwrap().is_ok());
        assert_eq!(cursor.count(), 4);
    }

    #[test]
    fn query_text_no_row() {
        let ds = fixture();
        let v = ds
            .query_text(
                "SELECT 対応するUCS FROM mji WHERE MJ文字図形名 = :id",
                rusqlite::named_params! { ":id": "MJ999999" },
            )
            .unwrap();
        assert_eq!(v, None);
    }
}
