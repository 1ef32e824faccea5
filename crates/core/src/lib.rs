pub mod aggregate;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lookup;
pub mod similarity;

pub mod prelude {
    pub use crate::aggregate::{AggregateResult, Aggregator, LookupContext};
    pub use crate::error::*;
    pub use crate::lookup::{Backend, BackendRegistry, PodcastMatch, Query, Verdict, VerdictKind};
}
