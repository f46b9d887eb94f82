//! # Query Layer
//!
//! Everything between a line of the query language and the catalog:
//!
//! ```text
//! "s=select(db1.t.c,10,20)"
//!     │
//!     ▼  parser::parse
//! Statement { outputs: ["s"], operator: Select { .. } }
//!     │
//!     ▼  executor (names resolved under the catalog guard)
//! select / fetch / join / aggregate / arithmetic / print
//!     │
//!     ▼
//! HandleTable["s"] = Result(Positions([..]))
//! ```
//!
//! - [`parser`]: command line to [`Statement`]
//! - [`operator`]: operator descriptors and the selection predicate
//! - [`handles`]: named intermediate results with most-recent-first shadowing
//! - [`result`]: generalized columns (stored column or materialized result)
//! - [`executor`]: one function per operator kind
//! - [`loader`]: CSV bulk load parsing

pub mod executor;
pub mod handles;
pub mod loader;
pub mod operator;
pub mod parser;
pub mod result;

pub use executor::ExecuteResult;
pub use handles::HandleTable;
pub use operator::{
    AggregateKind, ArithmeticKind, Comparator, JoinKind, Operator, Predicate, Source, Statement,
};
pub use parser::parse;
pub use result::{GeneralizedColumn, IntValues, ResultColumn};
