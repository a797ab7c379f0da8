//! Query construction and result typing.
//!
//! - [`filter`]: validated, percent-encoded filter predicates
//! - [`request`]: the query descriptor, its date window and execution
//! - [`normalize`]: raw rows to typed columns, with optional renaming

pub mod filter;
pub mod normalize;
pub mod request;

pub use filter::{make_filter, Filter, FilterOperator};
pub use normalize::{
    normalize, resolve_schema, Column, ColumnAliases, ColumnarReport, RawRow, RawValue,
    TypedValue,
};
pub use request::{QueryRequest, QueryRequestBuilder, QueryWindow, DEFAULT_WINDOW_DAYS};
