//! # orm-lite
//!
//! > **Declare the table. Get checked SQL.**
//!
//! orm-lite maps a table declared as typed column tuples onto
//! create/drop/insert/update/delete/select statements, validating every
//! value against its column's declared type before any SQL is produced.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use orm_lite::prelude::*;
//!
//! orm_lite::entity! {
//!     pub struct User: "users" {
//!         id: ("int", "pk"),
//!         username: ("varchar(255)"),
//!     }
//! }
//!
//! let conn = SqlxConnection::connect("sqlite::memory:").await?;
//! let session = Session::new(&conn);
//! let mut users = session.entity::<User>()?;
//!
//! users.create().await?;
//! users.bind(values! { "id" => 1, "username" => "John" }).add().await?;
//! let rows = users.bind(values! { "username" => "John" }).select_all("*").await?;
//! ```
//!
//! ## Declarations
//!
//! | Tuple                          | Column                         |
//! |--------------------------------|--------------------------------|
//! | `("int")`                      | plain                          |
//! | `("int", "pk")`                | `PRIMARY KEY NOT NULL`         |
//! | `("text", "required")`         | `NOT NULL`                     |
//! | `("int", "fk", "users.id")`    | `FOREIGN KEY ... REFERENCES users(id)`, joined on select |
//!
//! Recognized types are `INT`, `TEXT`, `CHAR(n)` and `VARCHAR(n)`, in any
//! case.

pub mod binder;
pub mod builder;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod parser;
pub mod query;
pub mod sanitize;
pub mod schema;
pub mod value;

pub mod prelude {
    pub use crate::binder::BoundValues;
    pub use crate::builder::{Statement, StatementKind, ToSql};
    pub use crate::config::OrmConfig;
    pub use crate::dialect::Dialect;
    pub use crate::engine::{Connection, Cursor, Gateway, SqlxConnection};
    pub use crate::error::*;
    pub use crate::query::{Operation, Query, Session};
    pub use crate::schema::{Entity, Registry, TableDecl, TableSchema};
    pub use crate::value::{Literal, Row, Value, Values};
    pub use crate::{entity, values};
}
