//! Shared fixtures for unit tests.

use crate::dataset::Dataset;
use crate::registry::Registry;

pub(crate) const FIXTURE_SQL: &str = include_str!("../tests/fixtures/mojidata.sql");

pub(crate) fn fixture() -> Dataset {
    Dataset::in_memory(FIXTURE_SQL).expect("fixture dataset")
}

pub(crate) fn registry() -> Registry {
    Registry::builtin().expect("builtin registry")
}
