//! Entity instances: a schema, the values currently bound to it, and a
//! borrowed connection.
//!
//! ```rust,ignore
//! let conn = SqlxConnection::connect("sqlite::memory:").await?;
//! let session = Session::new(&conn);
//! let mut users = session.entity::<User>()?;
//!
//! users.create().await?;
//! users.bind(values! { "id" => 1, "username" => "John" }).add().await?;
//! users.bind(values! { "id" => 1 }).update(values! { "username" => "Tom" }).await?;
//! let rows = users.bind(values!()).select_all("*").await?;
//! ```

use std::sync::Arc;

use crate::binder::{BoundValues, bind};
use crate::builder::{self, Statement};
use crate::engine::{Connection, Gateway};
use crate::error::{OrmError, OrmResult};
use crate::schema::{Entity, Registry, TableDecl, TableSchema};
use crate::value::{Row, Values};

/// Something a [`Query`] can do.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create,
    Drop,
    Add,
    /// Assignments; the bound values act as the WHERE filter.
    Update(Values),
    Delete,
    Exists,
    /// Raw column expression, e.g. `*`.
    SelectAll(String),
    /// Column names, qualified with the table unless they contain a `.`.
    Select(Vec<String>),
}

impl Operation {
    /// Label used when reporting a failure.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Drop => "drop",
            Operation::Add => "add",
            Operation::Update(_) => "update",
            Operation::Delete => "delete",
            Operation::Exists => "exists",
            Operation::SelectAll(_) => "select_all",
            Operation::Select(_) => "select",
        }
    }
}

/// One table's query state.
///
/// Binding replaces the whole value set; verbs only read it.
#[derive(Debug)]
pub struct Query<'c, C> {
    schema: Arc<TableSchema>,
    bound: BoundValues,
    conn: Option<&'c C>,
}

impl<'c, C: Connection> Query<'c, C> {
    pub fn new(schema: Arc<TableSchema>, conn: Option<&'c C>) -> Self {
        Self {
            schema,
            bound: BoundValues::default(),
            conn,
        }
    }

    /// Validate `values` against the schema and make them the current set.
    pub fn bind(&mut self, values: Values) -> &mut Self {
        self.bound = bind(&self.schema, &values);
        self
    }

    pub fn with_connection(&mut self, conn: &'c C) -> &mut Self {
        self.conn = Some(conn);
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn bound(&self) -> &BoundValues {
        &self.bound
    }

    /// The statement `op` would run, without running it.
    pub fn plan(&self, op: &Operation) -> OrmResult<Statement> {
        if self.schema.table_name().is_empty() {
            return Err(refused(op.label(), OrmError::Config("table name missing".into())));
        }

        let schema = &*self.schema;
        let stmt = match op {
            Operation::Create => Ok(builder::create_table(schema)),
            Operation::Drop => Ok(builder::drop_table(schema)),
            Operation::Add => builder::insert(schema, &self.bound),
            Operation::Update(values) => builder::update(schema, &bind(schema, values), &self.bound),
            Operation::Delete => builder::delete(schema, &self.bound),
            Operation::Exists => Ok(self.dialect().exists_statement(schema.table_name())),
            Operation::SelectAll(columns) => builder::select_all(schema, columns, &self.bound),
            Operation::Select(names) => builder::select(schema, &names[..], &self.bound),
        };
        stmt.map_err(|e| refused(op.label(), e))
    }

    pub async fn create(&self) -> OrmResult<()> {
        self.execute(&Operation::Create).await.map(|_| ())
    }

    pub async fn drop(&self) -> OrmResult<()> {
        self.execute(&Operation::Drop).await.map(|_| ())
    }

    /// Insert the bound values. Refused unless every required column is
    /// bound and nothing failed validation.
    pub async fn add(&self) -> OrmResult<u64> {
        self.execute(&Operation::Add).await
    }

    /// Set `values` on every row matching the bound values.
    ///
    /// With nothing bound there is no WHERE clause and every row changes.
    pub async fn update(&self, values: Values) -> OrmResult<u64> {
        self.execute(&Operation::Update(values)).await
    }

    /// Delete rows matching the bound values; all rows if nothing is bound.
    pub async fn delete(&self) -> OrmResult<u64> {
        self.execute(&Operation::Delete).await
    }

    pub async fn exists(&self) -> OrmResult<bool> {
        let rows = self.fetch(&Operation::Exists).await?;
        Ok(!rows.is_empty())
    }

    /// `SELECT <columns>` with foreign keys joined and the bound values as
    /// filter.
    pub async fn select_all(&self, columns: &str) -> OrmResult<Vec<Row>> {
        self.fetch(&Operation::SelectAll(columns.to_string())).await
    }

    /// Select named columns; no names selects everything.
    pub async fn select<S: AsRef<str>>(&self, names: &[S]) -> OrmResult<Vec<Row>> {
        let names = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.fetch(&Operation::Select(names)).await
    }

    async fn execute(&self, op: &Operation) -> OrmResult<u64> {
        let gateway = self.gateway(op)?;
        let stmt = self.plan(op)?;
        gateway.execute(&stmt, op.label()).await
    }

    async fn fetch(&self, op: &Operation) -> OrmResult<Vec<Row>> {
        let gateway = self.gateway(op)?;
        let stmt = self.plan(op)?;
        gateway.query(&stmt, op.label()).await
    }

    fn gateway(&self, op: &Operation) -> OrmResult<Gateway<'c, C>> {
        match self.conn {
            Some(conn) if !self.schema.table_name().is_empty() => Ok(Gateway::new(conn)),
            _ => Err(refused(
                op.label(),
                OrmError::Config("table name or connection missing".into()),
            )),
        }
    }

    fn dialect(&self) -> crate::dialect::Dialect {
        self.conn.map(|c| c.dialect()).unwrap_or_default()
    }
}

fn refused(label: &str, err: OrmError) -> OrmError {
    tracing::warn!(label, error = %err, "operation refused");
    err
}

/// Long-lived context: the schema registry plus an optional connection
/// handed to every query it creates.
#[derive(Debug)]
pub struct Session<'c, C> {
    registry: Registry,
    conn: Option<&'c C>,
}

impl<'c, C: Connection> Session<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self {
            registry: Registry::new(),
            conn: Some(conn),
        }
    }

    /// A session without a connection: statements can be planned but not
    /// run.
    pub fn detached() -> Self {
        Self {
            registry: Registry::new(),
            conn: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register(&self, decl: &TableDecl) -> OrmResult<Arc<TableSchema>> {
        self.registry.register(decl)
    }

    /// A fresh query for `E`, registering it on first use.
    pub fn entity<E: Entity>(&self) -> OrmResult<Query<'c, C>> {
        let schema = self.registry.register_entity::<E>()?;
        Ok(Query::new(schema, self.conn))
    }

    /// A fresh query for a previously registered table.
    pub fn table(&self, name: &str) -> OrmResult<Query<'c, C>> {
        let schema = self
            .registry
            .get(name)
            .ok_or_else(|| OrmError::UnknownTable(name.to_string()))?;
        Ok(Query::new(schema, self.conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ToSql;
    use crate::engine::SqlxConnection;
    use crate::error::ErrorKind;
    use crate::values;
    use pretty_assertions::assert_eq;

    crate::entity! {
        struct User: "users" {
            id: ("int", "pk"),
            username: ("varchar(255)"),
        }
    }

    crate::entity! {
        struct Nameless: "" {
            id: ("int"),
        }
    }

    fn detached() -> Session<'static, SqlxConnection> {
        Session::detached()
    }

    #[test]
    fn test_rebind_replaces_values() {
        let session = detached();
        let mut users = session.entity::<User>().unwrap();

        users.bind(values! { "id" => 1, "username" => "John" });
        assert_eq!(users.bound().entries().len(), 2);

        users.bind(values! { "username" => "Max" });
        assert_eq!(users.bound().entries().len(), 1);
        assert_eq!(
            users.plan(&Operation::SelectAll("*".into())).unwrap().to_sql(),
            "SELECT * FROM users WHERE username='Max';"
        );
    }

    #[test]
    fn test_plan_update_uses_bound_values_as_filter() {
        let session = detached();
        let mut users = session.entity::<User>().unwrap();
        users.bind(values! { "id" => 1 });
        let stmt = users
            .plan(&Operation::Update(values! { "username" => "Tom" }))
            .unwrap();
        assert_eq!(stmt.to_sql(), "UPDATE users SET username = 'Tom' WHERE id = 1;");
    }

    #[test]
    fn test_plan_select_names() {
        let session = detached();
        let users = session.entity::<User>().unwrap();
        let stmt = users
            .plan(&Operation::Select(vec!["username".into()]))
            .unwrap();
        assert_eq!(stmt.to_sql(), "SELECT users.username FROM users;");
        assert_eq!(
            users.plan(&Operation::Select(vec![])).unwrap(),
            users.plan(&Operation::SelectAll("*".into())).unwrap()
        );
    }

    #[test]
    fn test_plan_exists_defaults_to_sqlite() {
        let session = detached();
        let users = session.entity::<User>().unwrap();
        assert_eq!(
            users.plan(&Operation::Exists).unwrap().to_sql(),
            "SELECT name FROM sqlite_master WHERE name = 'users';"
        );
    }

    #[test]
    fn test_missing_table_name_is_refused() {
        let session = detached();
        let query = session.entity::<Nameless>().unwrap();
        let err = query.plan(&Operation::Create).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_verbs_without_connection_are_refused() {
        let session = detached();
        let mut users = session.entity::<User>().unwrap();
        users.bind(values! { "id" => 1 });

        for err in [
            users.create().await.unwrap_err(),
            users.drop().await.unwrap_err(),
            users.delete().await.unwrap_err(),
            users.add().await.unwrap_err(),
        ] {
            assert!(matches!(err, OrmError::Config(_)), "{}", err);
        }
        assert!(users.exists().await.is_err());
        assert!(users.select_all("*").await.is_err());
        assert!(users.update(values! { "username" => "x" }).await.is_err());
    }

    #[test]
    fn test_unknown_table() {
        let session = detached();
        assert!(matches!(session.table("users"), Err(OrmError::UnknownTable(_))));
        session.entity::<User>().unwrap();
        assert!(session.table("users").is_ok());
    }

    #[test]
    fn test_session_shares_schema() {
        let session = detached();
        let a = session.entity::<User>().unwrap();
        let b = session.table("users").unwrap();
        assert!(std::ptr::eq(a.schema(), b.schema()));
    }
}
