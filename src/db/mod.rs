pub mod connection;
pub mod cursor;
pub mod value;

pub use connection::{DbConn, connect};
pub use cursor::{RowStream, execute};
pub use value::{Row, Value};
