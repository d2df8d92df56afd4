//! Predicate registry: predicate key → parameterized query template.
//!
//! Each template selects a single column `r` of matching characters and takes
//! its arguments as `?` placeholders. Compound keys are the `UNION` of two
//! registered templates, and bind the caller's one argument once per member.
//!
//! The registry is built once, validated at construction (duplicate keys,
//! placeholder count against arity, union members), and read-only afterwards.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::{Error, Result};

/// Errors detected while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate predicate key: {key}")]
    DuplicateKey { key: String },

    #[error("template for {key} has {placeholders} placeholders but arity {arity}")]
    ArityMismatch {
        key: String,
        placeholders: usize,
        arity: usize,
    },

    #[error("union {key} refers to unregistered key {member}")]
    UnknownMember { key: String, member: String },
}

/// A query returning the set of characters matching one predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    sql: String,
    arity: usize,
}

impl QueryTemplate {
    /// A one-argument template.
    pub fn new(sql: &str) -> Self {
        Self {
            sql: sql.trim().to_string(),
            arity: 1,
        }
    }

    /// The union of two templates. The combined arity is the sum, so a single
    /// caller argument is bound once per member.
    pub fn union(left: &QueryTemplate, right: &QueryTemplate) -> Self {
        Self {
            sql: format!("SELECT * FROM ({} UNION {})", left.sql, right.sql),
            arity: left.arity + right.arity,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders the template binds.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The bound arguments for one caller argument.
    pub fn bind<'q>(&self, argument: &'q str) -> impl Iterator<Item = &'q str> + use<'q> {
        std::iter::repeat_n(argument, self.arity)
    }

    fn placeholders(&self) -> usize {
        memchr::memchr_iter(b'?', self.sql.as_bytes()).count()
    }
}

enum Entry {
    Template(QueryTemplate),
    Union(String, String),
}

/// Collects registry entries; [`RegistryBuilder::build`] validates them.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(String, Entry)>,
}

impl RegistryBuilder {
    pub fn template(mut self, key: &str, sql: &str) -> Self {
        self.entries
            .push((key.to_string(), Entry::Template(QueryTemplate::new(sql))));
        self
    }

    /// A compound key whose matches are the union of two keys registered
    /// earlier.
    pub fn union(mut self, key: &str, left: &str, right: &str) -> Self {
        self.entries.push((
            key.to_string(),
            Entry::Union(left.to_string(), right.to_string()),
        ));
        self
    }

    pub fn build(self) -> std::result::Result<Registry, RegistryError> {
        let mut templates: BTreeMap<String, QueryTemplate> = BTreeMap::new();
        for (key, entry) in self.entries {
            if templates.contains_key(&key) {
                return Err(RegistryError::DuplicateKey { key });
            }
            let template = match entry {
                Entry::Template(t) => t,
                Entry::Union(left, right) => {
                    let member = |m: &str| {
                        templates
                            .get(m)
                            .ok_or_else(|| RegistryError::UnknownMember {
                                key: key.clone(),
                                member: m.to_string(),
                            })
                    };
                    QueryTemplate::union(member(&left)?, member(&right)?)
                }
            };
            let placeholders = template.placeholders();
            if placeholders != template.arity {
                return Err(RegistryError::ArityMismatch {
                    key,
                    placeholders,
                    arity: template.arity,
                });
            }
            templates.insert(key, template);
        }
        Ok(Registry { templates })
    }
}

/// Immutable mapping from predicate key to query template.
#[derive(Debug, Clone)]
pub struct Registry {
    templates: BTreeMap<String, QueryTemplate>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The predicates served over the mojidata dataset.
    pub fn builtin() -> std::result::Result<Self, RegistryError> {
        let mut b = Registry::builder()
            .template(
                "UCS",
                r"WITH x(x) AS (VALUES (parse_int(?, 16)))
                  SELECT DISTINCT char(x) AS r FROM x
                  WHERE x BETWEEN 0 AND 1114111
                    AND x NOT BETWEEN 55296 AND 57343
                    AND char(x) regexp '^[\p{L}\p{N}\p{S}]$'",
            )
            .template(
                "mji.読み",
                "SELECT DISTINCT mji.対応するUCS AS r
                 FROM mji
                   JOIN mji_reading USING (MJ文字図形名)
                 WHERE mji.対応するUCS IS NOT NULL
                   AND mji_reading.読み = ?",
            )
            // Every `*` in the argument is removed, not only a trailing one;
            // the remainder is matched as a prefix.
            .template(
                "mji.読み.prefix",
                "SELECT DISTINCT mji.対応するUCS AS r
                 FROM mji
                   JOIN mji_reading USING (MJ文字図形名)
                 WHERE mji.対応するUCS IS NOT NULL
                   AND mji_reading.読み glob (replace(?, '*', '') || '*')",
            )
            .template(
                "mji.MJ文字図形名",
                "SELECT DISTINCT mji.対応するUCS AS r
                 FROM mji
                 WHERE mji.対応するUCS IS NOT NULL
                   AND mji.MJ文字図形名 = ?",
            );
        for (suffix, op) in COMPARATORS {
            b = b
                .template(
                    &format!("mji.総画数{suffix}"),
                    &format!(
                        "SELECT DISTINCT mji.対応するUCS AS r
                         FROM mji
                         WHERE mji.対応するUCS IS NOT NULL
                           AND mji.総画数 {op} parse_int(?, 10)"
                    ),
                )
                .template(
                    &format!("unihan.kTotalStrokes{suffix}"),
                    &format!(
                        "SELECT DISTINCT UCS AS r
                         FROM unihan_each_kTotalStrokes
                         WHERE cast(value as integer) {op} parse_int(?, 10)"
                    ),
                );
        }
        // Stroke counts come from both sources; a character matches if either
        // source says so.
        for (suffix, _) in COMPARATORS {
            b = b.union(
                &format!("totalStrokes{suffix}"),
                &format!("unihan.kTotalStrokes{suffix}"),
                &format!("mji.総画数{suffix}"),
            );
        }
        b.build()
    }

    pub fn get(&self, key: &str) -> Option<&QueryTemplate> {
        self.templates.get(key)
    }

    /// Look up a key, failing with the key's name when it is not registered.
    pub fn resolve(&self, key: &str) -> Result<&QueryTemplate> {
        self.get(key).ok_or_else(|| Error::UnknownPredicate {
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Key suffix and SQL operator for the numeric comparators. The argument is
/// cast to an integer, so a non-numeric argument matches nothing instead of
/// failing.
const COMPARATORS: [(&str, &str); 5] = [
    ("", "="),
    (".lt", "<"),
    (".le", "<="),
    (".gt", ">"),
    (".ge", ">="),
];
