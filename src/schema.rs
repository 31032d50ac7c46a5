//! Table declarations and the schemas reflected from them.
//!
//! A table is declared as an ordered list of columns, each a short tuple:
//!
//! ```text
//! ("int")                      plain column
//! ("int", "pk")                primary key, implies NOT NULL
//! ("varchar(255)", "required") NOT NULL
//! ("int", "fk", "users.id")    foreign key to users(id)
//! ```
//!
//! Declarations come either from an [`Entity`] impl (usually written with
//! the [`entity!`](crate::entity) macro) or from a config file
//! ([`TableDecl`]). [`reflect`] turns one into an immutable [`TableSchema`];
//! [`Registry`] caches schemas by table name.
//!
//! # Example
//! ```
//! use orm_lite::schema::{Entity, Registry};
//!
//! orm_lite::entity! {
//!     pub struct Post: "posts" {
//!         id: ("int", "pk"),
//!         post: ("varchar(255)"),
//!         user_id: ("int", "fk", "users.id"),
//!     }
//! }
//!
//! let registry = Registry::new();
//! let schema = registry.register_entity::<Post>().unwrap();
//! assert_eq!(schema.table_name(), "posts");
//! assert!(schema.columns()[2].is_foreign_key());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{OrmError, OrmResult};
use crate::parser::parse_fk_target;
use crate::sanitize::clear_identifier;

/// Column names starting with this are never columns.
pub const RESERVED_PREFIX: &str = "__";

/// `(column name, declaration tuple)`
pub type ColumnSpec = (&'static str, &'static [&'static str]);

/// A table mapping declared in code.
pub trait Entity {
    const TABLE_NAME: &'static str;
    const COLUMNS: &'static [ColumnSpec];

    fn declaration() -> TableDecl {
        TableDecl {
            name: Self::TABLE_NAME.to_string(),
            columns: Self::COLUMNS
                .iter()
                .map(|(name, spec)| ColumnDecl {
                    name: name.to_string(),
                    spec: spec.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// Declare an [`Entity`] with tuple-style columns.
///
/// ```
/// orm_lite::entity! {
///     /// Registered users.
///     pub struct User: "users" {
///         id: ("int", "pk"),
///         username: ("varchar(255)"),
///     }
/// }
///
/// use orm_lite::schema::Entity;
/// assert_eq!(User::COLUMNS.len(), 2);
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $table:literal {
            $($column:ident : ( $($part:literal),* $(,)? )),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::schema::Entity for $name {
            const TABLE_NAME: &'static str = $table;
            const COLUMNS: &'static [$crate::schema::ColumnSpec] = &[
                $((stringify!($column), &[$($part),*])),*
            ];
        }
    };
}

/// Table declaration as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDecl {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDecl>,
}

/// One column declaration: a name and its tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecl {
    pub name: String,
    #[serde(default)]
    pub spec: Vec<String>,
}

/// Referenced table and column of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

/// Immutable metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    declared_type: String,
    is_required: bool,
    is_primary_key: bool,
    foreign_key: Option<ForeignKey>,
}

impl ColumnDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// Always true for primary keys.
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }
}

/// A reflected table: sanitized name plus columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table_name: String,
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDescriptor, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c, fk)))
    }
}

/// Reflect a declaration into a schema.
///
/// Reserved names and empty tuples are skipped. Unknown modifiers give a
/// plain column. A malformed foreign key, a duplicate or a non-identifier
/// column name is a [`OrmError::Declaration`].
pub fn reflect(decl: &TableDecl) -> OrmResult<TableSchema> {
    let table_name = clear_identifier(&decl.name);
    let mut columns: Vec<ColumnDescriptor> = Vec::with_capacity(decl.columns.len());

    for col in &decl.columns {
        if col.name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        let Some(raw_type) = col.spec.first() else {
            continue;
        };

        let declaration_error = |message: &str| OrmError::declaration(&table_name, &col.name, message);

        if col.name.is_empty() || !col.name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(declaration_error("column name must be a plain identifier"));
        }
        if columns.iter().any(|c| c.name == col.name) {
            return Err(declaration_error("duplicate column"));
        }

        let mut is_required = false;
        let mut is_primary_key = false;
        let mut foreign_key = None;

        match col.spec.get(1).map(String::as_str) {
            Some("pk") => is_primary_key = true,
            Some("required") => is_required = true,
            Some("fk") => {
                let target = col
                    .spec
                    .get(2)
                    .ok_or_else(|| declaration_error("foreign key without a target"))?;
                let (table, column) = parse_fk_target(target)
                    .ok_or_else(|| declaration_error("foreign key target must be table.column"))?;
                let (table, column) = (clear_identifier(table), clear_identifier(column));
                if table.is_empty() || column.is_empty() {
                    return Err(declaration_error("foreign key target is empty after sanitizing"));
                }
                foreign_key = Some(ForeignKey { table, column });
            }
            _ => {}
        }

        columns.push(ColumnDescriptor {
            name: col.name.clone(),
            declared_type: clear_identifier(raw_type),
            is_required: is_required || is_primary_key,
            is_primary_key,
            foreign_key,
        });
    }

    tracing::debug!(table = %table_name, columns = columns.len(), "reflected table schema");
    Ok(TableSchema { table_name, columns })
}

/// Schemas by table name.
///
/// The first successful registration of a table wins; later ones return
/// the same `Arc` without reflecting again.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect and cache `decl`, or return the cached schema for its table.
    pub fn register(&self, decl: &TableDecl) -> OrmResult<Arc<TableSchema>> {
        let key = clear_identifier(&decl.name);
        if let Some(schema) = self.get(&key) {
            return Ok(schema);
        }

        let schema = Arc::new(reflect(decl)?);
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        // A racing registration may have landed first; keep that one.
        Ok(schemas.entry(key).or_insert(schema).clone())
    }

    pub fn register_entity<E: Entity>(&self) -> OrmResult<Arc<TableSchema>> {
        self.register(&E::declaration())
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::entity! {
        struct User: "users" {
            id: ("int", "pk"),
            username: ("char(255)", "not_required"),
            email: ("text", "required"),
        }
    }

    crate::entity! {
        struct Post: "posts" {
            id: ("int", "pk"),
            post: ("varchar(255)"),
            user_id: ("int", "fk", "users.id"),
            legacy: (),
        }
    }

    fn decl(columns: &[(&str, &[&str])]) -> TableDecl {
        TableDecl {
            name: "t".into(),
            columns: columns
                .iter()
                .map(|(n, s)| ColumnDecl {
                    name: n.to_string(),
                    spec: s.iter().map(|p| p.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_reflect_flags() {
        let schema = reflect(&User::declaration()).unwrap();
        assert_eq!(schema.table_name(), "users");

        let names: Vec<&str> = schema.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "username", "email"]);

        let id = schema.column("id").unwrap();
        assert!(id.is_primary_key());
        assert!(id.is_required());

        let username = schema.column("username").unwrap();
        assert!(!username.is_required());
        assert!(!username.is_primary_key());
        assert_eq!(username.declared_type(), "char(255)");

        assert!(schema.column("email").unwrap().is_required());
    }

    #[test]
    fn test_reflect_foreign_key_and_empty_tuple() {
        let schema = reflect(&Post::declaration()).unwrap();
        assert_eq!(schema.columns().len(), 3);

        let fks: Vec<_> = schema.foreign_keys().collect();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].0.name(), "user_id");
        assert_eq!(
            fks[0].1,
            &ForeignKey {
                table: "users".into(),
                column: "id".into()
            }
        );
    }

    #[test]
    fn test_reflect_sanitizes_identifiers() {
        let mut d = decl(&[("owner", &["int;", "fk", "us'ers.i\"d"])]);
        d.name = "accounts;\n".into();
        let schema = reflect(&d).unwrap();
        assert_eq!(schema.table_name(), "accounts");
        let owner = &schema.columns()[0];
        assert_eq!(owner.declared_type(), "int");
        assert_eq!(owner.foreign_key().unwrap().table, "users");
        assert_eq!(owner.foreign_key().unwrap().column, "id");
    }

    #[test]
    fn test_reflect_skips_reserved_names() {
        let schema = reflect(&decl(&[("__meta", &["int"]), ("id", &["int"])])).unwrap();
        assert_eq!(schema.columns().len(), 1);
    }

    #[test]
    fn test_malformed_foreign_keys_are_errors() {
        for spec in [
            &["int", "fk"][..],
            &["int", "fk", "users"][..],
            &["int", "fk", "users."][..],
            &["int", "fk", "a.b.c"][..],
            &["int", "fk", ";.id"][..],
        ] {
            let err = reflect(&decl(&[("owner", spec)])).unwrap_err();
            assert!(
                matches!(err, OrmError::Declaration { ref column, .. } if column == "owner"),
                "{:?} -> {}",
                spec,
                err
            );
        }
    }

    #[test]
    fn test_duplicate_and_bad_names_are_errors() {
        assert!(reflect(&decl(&[("id", &["int"]), ("id", &["text"])])).is_err());
        assert!(reflect(&decl(&[("bad name", &["int"])])).is_err());
    }

    #[test]
    fn test_registry_returns_same_schema() {
        let registry = Registry::new();
        let first = registry.register_entity::<User>().unwrap();
        let second = registry.register_entity::<User>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &registry.get("users").unwrap()));
    }

    #[test]
    fn test_registry_failed_registration_is_not_cached() {
        let registry = Registry::new();
        assert!(registry.register(&decl(&[("x", &["int", "fk", "nope"])])).is_err());
        assert!(registry.get("t").is_none());
        assert!(registry.tables().is_empty());
    }

    #[test]
    fn test_declaration_from_toml() {
        let d: TableDecl = toml::from_str(
            r#"
            name = "users"
            columns = [
                { name = "id", spec = ["int", "pk"] },
                { name = "username", spec = ["varchar(255)"] },
            ]
            "#,
        )
        .unwrap();
        let schema = reflect(&d).unwrap();
        assert_eq!(schema.columns()[1].name(), "username");
    }
}
