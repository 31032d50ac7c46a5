//! Store families the engine can talk to.

use crate::builder::{ParamStyle, Statement, StatementKind};
use crate::error::{OrmError, OrmResult};
use crate::value::Literal;

/// SQL dialect of the connected store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Detect the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> OrmResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            other => Err(OrmError::Config(format!(
                "Unsupported database scheme '{}'",
                other
            ))),
        }
    }

    pub fn param_style(self) -> ParamStyle {
        match self {
            Dialect::Postgres => ParamStyle::Dollar,
            Dialect::Sqlite | Dialect::MySql => ParamStyle::Question,
        }
    }

    /// Catalog lookup that returns a row iff `table` exists.
    pub fn exists_statement(self, table: &str) -> Statement {
        let mut stmt = Statement::new(StatementKind::Query);
        stmt.push_sql(match self {
            Dialect::Sqlite => "SELECT name FROM sqlite_master WHERE name = ",
            Dialect::Postgres => {
                "SELECT table_name FROM information_schema.tables WHERE table_name = "
            }
            Dialect::MySql => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = "
            }
        });
        stmt.push_param(Literal::Text(table.to_string()));
        stmt.push_sql(";");
        stmt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ToSql;

    #[test]
    fn test_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("postgres://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://root@localhost/db").unwrap(), Dialect::MySql);
        assert!(Dialect::from_url("oracle://x").is_err());
    }

    #[test]
    fn test_exists_statement() {
        let stmt = Dialect::Sqlite.exists_statement("users");
        assert_eq!(stmt.to_sql(), "SELECT name FROM sqlite_master WHERE name = 'users';");

        let (sql, params) = Dialect::Postgres.exists_statement("users").render(ParamStyle::Dollar);
        assert_eq!(
            sql,
            "SELECT table_name FROM information_schema.tables WHERE table_name = $1;"
        );
        assert_eq!(params, vec![Literal::Text("users".into())]);
    }
}
