//! Request pipelines: validate, compose, paginate, encode.
//!
//! Every request is validated and its query composed before the first byte
//! is written, so a failure before encoding leaves the sink untouched and the
//! caller can answer with an error envelope instead. Errors after that point
//! abort the stream mid-document.
//!
//! Pagination decides how much is held in memory:
//!
//! - with a limit, at most `limit` results are pulled into a page and the
//!   response reports `done`;
//! - with only an offset, results stream straight from the cursor and the
//!   response reports neither `done` nor `total`;
//! - with neither, everything is collected so the response can report
//!   `total`.

use tracing::info;

use crate::compose::{self, PredicateList};
use crate::dataset::Dataset;
use crate::decomposition::{DecompositionSearch, IdsPattern, IdsTable};
use crate::encode::{try_write_array, write_array, write_object, write_raw_json};
use crate::error::{Error, Result};
use crate::lookup;
use crate::params::{PageMode, Pagination};
use crate::registry::Registry;
use crate::seq;
use crate::sink::ChunkSink;
use crate::value::{Serializable, Value};

/// A predicate search.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub p: Vec<String>,
    pub q: Vec<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub all_results: bool,
}

/// A decomposition search, optionally narrowed by predicates.
#[derive(Debug, Clone, Default)]
pub struct IdsFindRequest {
    pub ids: Vec<String>,
    pub whole: Vec<String>,
    pub p: Vec<String>,
    pub q: Vec<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub all_results: bool,
}

/// Everything known about one character.
#[derive(Debug, Clone, Default)]
pub struct LookupRequest {
    pub char: Option<String>,
    pub select: Vec<String>,
}

/// What a completed response contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub returned: usize,
    pub done: Option<bool>,
    pub total: Option<usize>,
}

/// Runs requests against one dataset and predicate registry.
pub struct Pipeline<'a> {
    dataset: &'a Dataset,
    registry: &'a Registry,
}

impl<'a> Pipeline<'a> {
    pub fn new(dataset: &'a Dataset, registry: &'a Registry) -> Self {
        Self { dataset, registry }
    }

    pub fn search(&self, req: &SearchRequest, sink: &mut dyn ChunkSink) -> Result<Outcome> {
        if req.p.is_empty() {
            return Err(Error::validation("p is required"));
        }
        let predicates = PredicateList::new(req.p.clone(), req.q.clone())?;
        let query = compose::compose(self.registry, &predicates)?;
        let pagination = Pagination::from_params(req.limit.as_deref(), req.offset.as_deref());
        let echo = Value::Object(vec![
            ("p".into(), req.p.as_slice().into()),
            ("q".into(), req.q.as_slice().into()),
            ("limit".into(), Value::opt(pagination.limit)),
            ("offset".into(), Value::opt(pagination.offset)),
            ("all_results".into(), Value::opt(req.all_results.then_some(true))),
        ]);

        let mut prepared = self.dataset.prepare(&query)?;
        let outcome = respond(
            sink,
            echo,
            prepared.cursor()?,
            pagination.mode(),
            req.all_results,
        )?;
        info!(
            predicates = predicates.len(),
            returned = outcome.returned,
            done = ?outcome.done,
            total = ?outcome.total,
            "search"
        );
        Ok(outcome)
    }

    pub fn idsfind(&self, req: &IdsFindRequest, sink: &mut dyn ChunkSink) -> Result<Outcome> {
        self.idsfind_with(&IdsTable::new(self.dataset), req, sink)
    }

    /// [`Pipeline::idsfind`] with a caller-supplied decomposition search.
    pub fn idsfind_with(
        &self,
        search: &dyn DecompositionSearch,
        req: &IdsFindRequest,
        sink: &mut dyn ChunkSink,
    ) -> Result<Outcome> {
        if req.ids.is_empty() && req.whole.is_empty() {
            return Err(Error::validation("No parameters"));
        }
        let predicates = PredicateList::new(req.p.clone(), req.q.clone())?;
        // Unknown keys fail before the search runs.
        for p in predicates.iter() {
            self.registry.resolve(p.key)?;
        }
        let pagination = Pagination::from_params(req.limit.as_deref(), req.offset.as_deref());
        let echo = Value::Object(vec![
            ("ids".into(), req.ids.as_slice().into()),
            ("whole".into(), req.whole.as_slice().into()),
            ("p".into(), Value::non_empty_list(&req.p)),
            ("q".into(), Value::non_empty_list(&req.q)),
            ("limit".into(), Value::opt(pagination.limit)),
            ("offset".into(), Value::opt(pagination.offset)),
            ("all_results".into(), Value::opt(req.all_results.then_some(true))),
        ]);

        let candidates = search.find(&IdsPattern::from_request(&req.ids, &req.whole))?;
        let found = candidates.len();
        let outcome = if predicates.is_empty() {
            respond(
                sink,
                echo,
                candidates.into_iter().map(Ok),
                pagination.mode(),
                req.all_results,
            )?
        } else {
            let query = compose::compose_within(self.registry, &candidates, &predicates)?;
            let mut prepared = self.dataset.prepare(&query)?;
            respond(
                sink,
                echo,
                prepared.cursor()?,
                pagination.mode(),
                req.all_results,
            )?
        };
        info!(
            found,
            predicates = predicates.len(),
            returned = outcome.returned,
            done = ?outcome.done,
            total = ?outcome.total,
            "idsfind"
        );
        Ok(outcome)
    }

    pub fn lookup(&self, req: &LookupRequest, sink: &mut dyn ChunkSink) -> Result<Outcome> {
        let ch = match req.char.as_deref() {
            None | Some("") => return Err(Error::validation("char is required")),
            Some(ch) => ch,
        };
        if ch.chars().count() != 1 {
            return Err(Error::validation("char must be a single character"));
        }
        let sql = lookup::build_query(&req.select)?;
        let record = self
            .dataset
            .query_text(&sql, rusqlite::named_params! { "@ucs": ch })?;
        let echo = Value::Object(vec![
            ("char".into(), ch.into()),
            ("select".into(), Value::non_empty_list(&req.select)),
        ]);
        let returned = usize::from(record.is_some());
        write_object(
            sink,
            [
                Some(("query", echo.into())),
                Some((
                    "results",
                    Serializable::deferred(|s| write_raw_json(s, record.as_deref())),
                )),
            ],
        )?;
        info!(char = ch, fields = req.select.len(), "lookup");
        Ok(Outcome {
            returned,
            done: None,
            total: None,
        })
    }
}

/// Whether a result is shown without `all_results`: private use code points
/// and CJK compatibility ideographs are hidden.
pub fn is_default_visible(ch: &str) -> bool {
    !ch.chars().any(|c| {
        matches!(
            u32::from(c),
            0xE000..=0xF8FF
                | 0xF900..=0xFAFF
                | 0x2F800..=0x2FA1F
                | 0xF0000..=0xFFFFD
                | 0x100000..=0x10FFFD
        )
    })
}

/// Filter, paginate and encode a result cursor after the `query` echo.
fn respond<I>(
    sink: &mut dyn ChunkSink,
    query: Value,
    results: I,
    mode: PageMode,
    all_results: bool,
) -> Result<Outcome>
where
    I: Iterator<Item = Result<String>>,
{
    let results = seq::filter(
        move |r: &Result<String>| all_results || r.as_ref().map_or(true, |c| is_default_visible(c)),
        results,
    );
    match mode {
        PageMode::Limited { offset, limit } => {
            let page = seq::try_take_page(limit, seq::try_drop(offset, results)?)?;
            let outcome = Outcome {
                returned: page.items.len(),
                done: Some(page.exhausted),
                total: None,
            };
            let items = page.items;
            write_response(
                sink,
                query,
                Serializable::deferred(move |s| write_array(s, items)),
                outcome,
            )?;
            Ok(outcome)
        }
        PageMode::Unrestricted => {
            let items = results.collect::<Result<Vec<_>>>()?;
            let outcome = Outcome {
                returned: items.len(),
                done: None,
                total: Some(items.len()),
            };
            write_response(
                sink,
                query,
                Serializable::deferred(move |s| write_array(s, items)),
                outcome,
            )?;
            Ok(outcome)
        }
        PageMode::OffsetOnly { offset } => {
            let mut rest = seq::try_drop(offset, results)?.peekable();
            // Fail before the first byte if the cursor errors straight away.
            if rest.peek().is_some_and(Result::is_err) {
                if let Some(Err(e)) = rest.next() {
                    return Err(e);
                }
            }
            let mut returned = 0;
            let counted = rest.inspect(|r| {
                if r.is_ok() {
                    returned += 1;
                }
            });
            let mut outcome = Outcome {
                returned: 0,
                done: None,
                total: None,
            };
            write_response(
                sink,
                query,
                Serializable::deferred(move |s| try_write_array(s, counted)),
                outcome,
            )?;
            outcome.returned = returned;
            Ok(outcome)
        }
    }
}

fn write_response(
    sink: &mut dyn ChunkSink,
    query: Value,
    results: Serializable<'_>,
    outcome: Outcome,
) -> Result<bool> {
    write_object(
        sink,
        [
            Some(("query", query.into())),
            Some(("results", results)),
            outcome.done.map(|d| ("done", d.into())),
            outcome.total.map(|t| ("total", t.into())),
        ],
    )
}
