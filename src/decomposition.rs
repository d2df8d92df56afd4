//! Decomposition search over Ideographic Description Sequences.
//!
//! The pipeline only needs [`DecompositionSearch`]: a list of patterns in,
//! the characters whose decomposition matches all of them out. [`IdsTable`]
//! answers it from the dataset's `ids` table.

use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// One constraint on a character's decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdsPattern {
    /// The sequence occurs somewhere in the decomposition.
    Contains(String),
    /// The decomposition is exactly this sequence.
    Whole(String),
}

impl IdsPattern {
    /// Patterns for an `idsfind` request: every `ids` entry as a component,
    /// every `whole` entry matched on its own.
    pub fn from_request(ids: &[String], whole: &[String]) -> Vec<IdsPattern> {
        ids.iter()
            .cloned()
            .map(IdsPattern::Contains)
            .chain(whole.iter().cloned().map(IdsPattern::Whole))
            .collect()
    }

    fn condition(&self) -> (&'static str, &str) {
        match self {
            IdsPattern::Contains(s) => ("instr(IDS, ?) > 0", s.as_str()),
            IdsPattern::Whole(s) => ("IDS = ?", s.as_str()),
        }
    }
}

/// Finds characters by decomposition.
pub trait DecompositionSearch {
    /// Characters matching every pattern, in code point order.
    fn find(&self, patterns: &[IdsPattern]) -> Result<Vec<String>>;
}

/// Decomposition search backed by the dataset's `ids` table.
pub struct IdsTable<'d> {
    dataset: &'d Dataset,
}

impl<'d> IdsTable<'d> {
    pub fn new(dataset: &'d Dataset) -> Self {
        Self { dataset }
    }
}

impl DecompositionSearch for IdsTable<'_> {
    fn find(&self, patterns: &[IdsPattern]) -> Result<Vec<String>> {
        if patterns.is_empty() {
            return Err(Error::validation("No parameters"));
        }
        // A character may have several decompositions (one per source), so
        // patterns are intersected per character rather than per row.
        let (conditions, args): (Vec<_>, Vec<_>) =
            patterns.iter().map(IdsPattern::condition).unzip();
        let sql = conditions
            .iter()
            .map(|c| format!("SELECT DISTINCT UCS AS r FROM ids WHERE {c}"))
            .collect::<Vec<_>>()
            .join("\nINTERSECT\n")
            + "\nORDER BY r";
        let found = self.dataset.collect_strings(&sql, &args)?;
        debug!(patterns = patterns.len(), found = found.len(), "decomposition search");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::fixture;

    fn contains(s: &str) -> IdsPattern {
        IdsPattern::Contains(s.to_string())
    }

    #[test]
    fn single_component() {
        let ds = fixture();
        let found = IdsTable::new(&ds).find(&[contains("日")]).unwrap();
        assert_eq!(found, vec!["昌", "明", "暗", "𣅀"]);
    }

    #[test]
    fn components_intersect() {
        let ds = fixture();
        let found = IdsTable::new(&ds)
            .find(&[contains("日"), contains("月")])
            .unwrap();
        assert_eq!(found, vec!["明", "𣅀"]);
    }

    #[test]
    fn whole_matches_exactly() {
        let ds = fixture();
        let search = IdsTable::new(&ds);
        let found = search
            .find(&[IdsPattern::Whole("⿰日月".into())])
            .unwrap();
        assert_eq!(found, vec!["明", "𣅀"]);
        assert!(search.find(&[IdsPattern::Whole("日月".into())]).unwrap().is_empty());
    }

    #[test]
    fn each_whole_entry_stands_alone() {
        let patterns = IdsPattern::from_request(
            &["日".to_string()],
            &["⿰日月".to_string(), "⿱日日".to_string()],
        );
        assert_eq!(
            patterns,
            vec![
                contains("日"),
                IdsPattern::Whole("⿰日月".into()),
                IdsPattern::Whole("⿱日日".into()),
            ]
        );
    }

    #[test]
    fn no_patterns_rejected() {
        let ds = fixture();
        let err = IdsTable::new(&ds).find(&[]).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "No parameters");
    }
}
