//! Canonical-name minting and reserved-name validation
//!
//! Every org, metric, and field carries a stable canonical identifier that
//! user-visible aliases map onto. Canonical ids live in the reserved
//! leading-underscore namespace, which the stop-word validator keeps user
//! names out of.

mod generator;
mod stopwords;

pub use generator::{NameGenerator, FIELD_ID_PREFIX, METRIC_ID_PREFIX};
pub use stopwords::StopWordValidator;
