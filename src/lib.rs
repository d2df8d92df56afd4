pub mod compose;
pub mod dataset;
pub mod decomposition;
pub mod encode;
pub mod error;
pub mod lookup;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod seq;
pub mod sink;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use error::{Error, Result};
