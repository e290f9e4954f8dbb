//! Query support for `list`
//!
//! - `params.rs` - permissive parsing of the `query` command parameter
//! - `validator.rs` - injection checks and parsing of `where` clauses
//! - `filter.rs` - filter trees evaluated against document JSON
//! - `pattern.rs` - LIKE matching with a shared regex cache

mod filter;
mod params;
mod pattern;
mod validator;

pub use filter::{CompareOp, Filter, lookup, order_values};
pub use params::{OrderBy, QueryParams};
pub use pattern::eval_like;
pub use validator::{
    CommentRule, DangerousKeywordRule, StatementChainRule, ValidationRule, WhereClauseValidator,
};
