//! SQL statement builder.
//!
//! Pure functions from a [`TableSchema`] plus [`BoundValues`] to a
//! [`Statement`]. A statement keeps its values apart from its text, so it
//! can be sent with bound parameters ([`Statement::render`]) or shown with
//! the values embedded ([`ToSql::to_sql`]).

use std::fmt;

use crate::binder::BoundValues;
use crate::error::{OrmError, OrmResult};
use crate::sanitize::clear_identifier;
use crate::schema::{ColumnDescriptor, TableSchema};
use crate::value::Literal;

/// Trait for converting nodes to SQL text.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

/// How positional parameters are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Dollar,
}

/// Whether a statement changes data (commit) or returns rows (fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Mutation,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Sql(String),
    Param(Literal),
}

/// A generated statement: SQL text with parameter slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    kind: StatementKind,
    fragments: Vec<Fragment>,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            fragments: Vec::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Append SQL text.
    pub fn push_sql(&mut self, sql: &str) {
        match self.fragments.last_mut() {
            Some(Fragment::Sql(last)) => last.push_str(sql),
            _ => self.fragments.push(Fragment::Sql(sql.to_string())),
        }
    }

    /// Append a parameter slot.
    pub fn push_param(&mut self, literal: Literal) {
        self.fragments.push(Fragment::Param(literal));
    }

    pub fn params(&self) -> impl Iterator<Item = &Literal> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Param(p) => Some(p),
            Fragment::Sql(_) => None,
        })
    }

    /// SQL with placeholders, plus the values in placeholder order.
    pub fn render(&self, style: ParamStyle) -> (String, Vec<Literal>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Sql(s) => sql.push_str(s),
                Fragment::Param(p) => {
                    params.push(p.clone());
                    match style {
                        ParamStyle::Question => sql.push('?'),
                        ParamStyle::Dollar => sql.push_str(&format!("${}", params.len())),
                    }
                }
            }
        }
        (sql, params)
    }

    /// Append `col<eq>value` pairs separated by `sep`.
    fn push_pairs(&mut self, entries: &[(String, Literal)], eq: &str, sep: &str) {
        for (i, (column, literal)) in entries.iter().enumerate() {
            if i > 0 {
                self.push_sql(sep);
            }
            self.push_sql(column);
            self.push_sql(eq);
            self.push_param(literal.clone());
        }
    }
}

impl ToSql for Statement {
    /// The statement with every value embedded as a literal.
    fn to_sql(&self) -> String {
        self.fragments
            .iter()
            .map(|f| match f {
                Fragment::Sql(s) => s.clone(),
                Fragment::Param(p) => p.to_string(),
            })
            .collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl ToSql for ColumnDescriptor {
    /// Column definition for CREATE TABLE.
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name(), self.declared_type());
        if self.is_primary_key() {
            sql.push_str(" PRIMARY KEY");
        }
        if self.is_required() {
            sql.push_str(" NOT NULL");
        }
        if let Some(fk) = self.foreign_key() {
            sql.push_str(&format!(
                ", FOREIGN KEY ({}) REFERENCES {}({})",
                self.name(),
                fk.table,
                fk.column
            ));
        }
        sql
    }
}

/// `CREATE TABLE IF NOT EXISTS t (...);`
pub fn create_table(schema: &TableSchema) -> Statement {
    let defs: Vec<String> = schema.columns().iter().map(|c| c.to_sql()).collect();
    let mut stmt = Statement::new(StatementKind::Mutation);
    stmt.push_sql(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        schema.table_name(),
        defs.join(", ")
    ));
    stmt
}

/// `DROP TABLE IF EXISTS t;`
pub fn drop_table(schema: &TableSchema) -> Statement {
    let mut stmt = Statement::new(StatementKind::Mutation);
    stmt.push_sql(&format!("DROP TABLE IF EXISTS {};", schema.table_name()));
    stmt
}

/// `INSERT INTO t (cols) VALUES (values);`
///
/// Refused on a validation error or when a required column is missing.
pub fn insert(schema: &TableSchema, values: &BoundValues) -> OrmResult<Statement> {
    if let Some(e) = values.error() {
        return Err(e.clone().into());
    }
    if !values.all_required_present() {
        return Err(OrmError::MissingRequired(values.missing_required().to_vec()));
    }

    let columns: Vec<&str> = values.entries().iter().map(|(c, _)| c.as_str()).collect();
    let mut stmt = Statement::new(StatementKind::Mutation);
    stmt.push_sql(&format!(
        "INSERT INTO {} ({}) VALUES (",
        schema.table_name(),
        columns.join(", ")
    ));
    for (i, (_, literal)) in values.entries().iter().enumerate() {
        if i > 0 {
            stmt.push_sql(", ");
        }
        stmt.push_param(literal.clone());
    }
    stmt.push_sql(");");
    Ok(stmt)
}

/// `UPDATE t SET a = 1, ...[ WHERE b = 2 AND ...];`
///
/// An empty `condition` emits no WHERE clause and updates every row.
pub fn update(
    schema: &TableSchema,
    assignments: &BoundValues,
    condition: &BoundValues,
) -> OrmResult<Statement> {
    if let Some(e) = assignments.error().or(condition.error()) {
        return Err(e.clone().into());
    }
    if assignments.is_empty() {
        return Err(OrmError::NothingToUpdate);
    }

    let mut stmt = Statement::new(StatementKind::Mutation);
    stmt.push_sql(&format!("UPDATE {} SET ", schema.table_name()));
    stmt.push_pairs(assignments.entries(), " = ", ", ");
    if !condition.is_empty() {
        stmt.push_sql(" WHERE ");
        stmt.push_pairs(condition.entries(), " = ", " AND ");
    }
    stmt.push_sql(";");
    Ok(stmt)
}

/// `DELETE FROM t[ WHERE a=1 AND ...];`
///
/// An empty `condition` deletes every row.
pub fn delete(schema: &TableSchema, condition: &BoundValues) -> OrmResult<Statement> {
    if let Some(e) = condition.error() {
        return Err(e.clone().into());
    }

    let mut stmt = Statement::new(StatementKind::Mutation);
    stmt.push_sql(&format!("DELETE FROM {}", schema.table_name()));
    if !condition.is_empty() {
        stmt.push_sql(" WHERE ");
        stmt.push_pairs(condition.entries(), "=", " AND ");
    }
    stmt.push_sql(";");
    Ok(stmt)
}

/// `SELECT expr FROM t` with an INNER JOIN per foreign key (schema order)
/// and the condition as WHERE clause.
pub fn select_all(
    schema: &TableSchema,
    columns: &str,
    condition: &BoundValues,
) -> OrmResult<Statement> {
    if let Some(e) = condition.error() {
        return Err(e.clone().into());
    }

    let table = schema.table_name();
    let mut stmt = Statement::new(StatementKind::Query);
    stmt.push_sql(&format!("SELECT {} FROM {}", clear_identifier(columns), table));
    let foreign_keys: Vec<_> = schema.foreign_keys().collect();
    for (column, fk) in &foreign_keys {
        stmt.push_sql(&format!(
            " INNER JOIN {0} ON {0}.{1}={2}.{3}",
            fk.table,
            fk.column,
            table,
            column.name()
        ));
    }
    if !condition.is_empty() {
        stmt.push_sql(" WHERE ");
        if foreign_keys.is_empty() {
            stmt.push_pairs(condition.entries(), "=", " AND ");
        } else {
            // Joined tables may share column names.
            let qualified: Vec<(String, Literal)> = condition
                .entries()
                .iter()
                .map(|(column, literal)| (format!("{}.{}", table, column), literal.clone()))
                .collect();
            stmt.push_pairs(&qualified, "=", " AND ");
        }
    }
    stmt.push_sql(";");
    Ok(stmt)
}

/// Select named columns, qualifying bare names with the table. No names
/// selects `*`.
pub fn select<S: AsRef<str>>(
    schema: &TableSchema,
    names: &[S],
    condition: &BoundValues,
) -> OrmResult<Statement> {
    if names.is_empty() {
        return select_all(schema, "*", condition);
    }

    let qualified: Vec<String> = names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            if name.contains('.') {
                name.to_string()
            } else {
                format!("{}.{}", schema.table_name(), name)
            }
        })
        .collect();
    select_all(schema, &qualified.join(", "), condition)
}
