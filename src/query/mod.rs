//! Statement preparation: bind-token resolution, SQL text assembly and
//! placeholder rewriting.

pub mod binds;
pub mod placeholders;
pub mod source;

pub use binds::{BindParams, resolve_binds};
pub use placeholders::{BoundStatement, bind_statement};
pub use source::{SqlSource, normalize_statement, validate_sql_file};
