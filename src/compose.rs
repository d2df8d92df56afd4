//! Predicate query composer.
//!
//! Turns an ordered list of `(key, argument)` predicates into one SQL query
//! whose rows are the characters satisfying every predicate. Arguments are
//! bound in predicate order; compound keys bind theirs once per member.

use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// One named predicate and its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate<'a> {
    pub key: &'a str,
    pub argument: &'a str,
}

/// Predicate keys with their arguments, paired by position.
///
/// Construction fails when the two lists differ in length, so a
/// `PredicateList` always has exactly one argument per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateList {
    keys: Vec<String>,
    arguments: Vec<String>,
}

impl PredicateList {
    pub fn new(keys: Vec<String>, arguments: Vec<String>) -> Result<Self> {
        if keys.len() != arguments.len() {
            return Err(Error::validation("q.length must be equal to p.length"));
        }
        Ok(Self { keys, arguments })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Predicate<'_>> {
        self.keys
            .iter()
            .zip(&self.arguments)
            .map(|(key, argument)| Predicate { key, argument })
    }
}

/// SQL text and positional arguments, ready to prepare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub sql: String,
    pub args: Vec<String>,
}

/// Resolve every predicate to its template SQL and collect bound arguments in
/// order. Unknown keys fail before anything is built.
fn resolve<'r>(
    registry: &'r Registry,
    predicates: &PredicateList,
) -> Result<(Vec<&'r str>, Vec<String>)> {
    let mut sql = Vec::with_capacity(predicates.len());
    let mut args = Vec::new();
    for p in predicates.iter() {
        let template = registry.resolve(p.key)?;
        sql.push(template.sql());
        args.extend(template.bind(p.argument).map(str::to_string));
    }
    Ok((sql, args))
}

/// Characters satisfying every predicate: the `INTERSECT` of the resolved
/// templates.
pub fn compose(registry: &Registry, predicates: &PredicateList) -> Result<ComposedQuery> {
    if predicates.is_empty() {
        return Err(Error::validation("p is required"));
    }
    let (templates, args) = resolve(registry, predicates)?;
    // Each member is wrapped so templates that open with a WITH clause can
    // sit anywhere in the compound select.
    let sql = templates
        .iter()
        .map(|t| format!("SELECT r FROM ({t})"))
        .collect::<Vec<_>>()
        .join("\nINTERSECT\n");
    debug!(predicates = predicates.len(), "composed intersection");
    Ok(ComposedQuery { sql, args })
}

/// Characters from `candidates` satisfying every predicate, in candidate
/// order. With no predicates every candidate is kept.
pub fn compose_within(
    registry: &Registry,
    candidates: &[String],
    predicates: &PredicateList,
) -> Result<ComposedQuery> {
    let (templates, bound) = resolve(registry, predicates)?;
    let mut sql = String::from(
        "WITH c(char) AS (SELECT value FROM json_each(?))\nSELECT c.char AS r\nFROM c",
    );
    if !templates.is_empty() {
        sql.push_str("\nWHERE ");
        let conditions = templates
            .iter()
            .map(|t| format!("c.char IN ({t})"))
            .collect::<Vec<_>>()
            .join("\n  AND ");
        sql.push_str(&conditions);
    }
    let mut args = Vec::with_capacity(bound.len() + 1);
    args.push(serde_json::to_string(candidates)?);
    args.extend(bound);
    debug!(
        predicates = predicates.len(),
        candidates = candidates.len(),
        "composed candidate filter"
    );
    Ok(ComposedQuery { sql, args })
}
