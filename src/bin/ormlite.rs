//! ormlite: run declared tables against a database
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL only
//! ormlite --dry-run add users id=1 username=John
//!
//! # Execute against the configured database
//! ormlite create users
//! ormlite select posts --where user_id=1 --columns id,post,users.username
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use orm_lite::parser::parse_assignment;
use orm_lite::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ormlite")]
#[command(version)]
#[command(about = "Run declared tables against a database", long_about = None)]
#[command(after_help = "EXAMPLES:
    ormlite tables
    ormlite create users
    ormlite add users id=1 username=John
    ormlite update users --where id=1 --set username=Tom --dry-run
    ormlite select posts --columns id,post,users.username")]
struct Cli {
    /// Config file (defaults to ./orm-lite.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "ORM_LITE_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Don't execute, just show the generated SQL
    #[arg(short, long, global = true)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared tables and their columns
    Tables,
    /// Create a table if it does not exist
    Create { table: String },
    /// Drop a table if it exists
    Drop { table: String },
    /// Check whether a table exists
    Exists { table: String },
    /// Insert one row
    Add {
        table: String,
        /// column=value pairs
        values: Vec<String>,
    },
    /// Update rows matching --where (all rows without it)
    Update {
        table: String,
        /// column=value filters
        #[arg(long = "where")]
        filter: Vec<String>,
        /// column=value assignments
        #[arg(long, required = true)]
        set: Vec<String>,
    },
    /// Delete rows matching --where (all rows without it)
    Delete {
        table: String,
        /// column=value filters
        #[arg(long = "where")]
        filter: Vec<String>,
    },
    /// Select rows, joining foreign keys
    Select {
        table: String,
        /// column=value filters
        #[arg(long = "where")]
        filter: Vec<String>,
        /// Columns to return (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "orm_lite=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = OrmConfig::discover(cli.config.as_deref())?;
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| config.database.url.clone());

    if let Commands::Tables = cli.command {
        let session = Session::<SqlxConnection>::detached();
        register_all(&session, &config)?;
        show_tables(&session);
        return Ok(());
    }

    // Dry run or no database URL - just show SQL
    let Some(url) = database_url.filter(|_| !cli.dry_run) else {
        let session = Session::<SqlxConnection>::detached();
        register_all(&session, &config)?;
        let (query, op) = prepare(&session, &cli.command)?;
        let stmt = query.plan(&op)?;

        println!("{}", "Generated SQL:".green().bold());
        println!("{}", stmt.to_sql().white());

        if !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No database URL. Use --database-url or set ORM_LITE_DATABASE_URL".yellow()
            );
        }
        return Ok(());
    };

    if cli.verbose {
        println!("{} {}", "Connecting to:".dimmed(), url);
    }
    let conn = SqlxConnection::connect_with(&url, config.database.max_connections).await?;
    let session = Session::new(&conn);
    register_all(&session, &config)?;

    let (query, op) = prepare(&session, &cli.command)?;
    if cli.verbose {
        println!("{} {}", "SQL:".dimmed(), query.plan(&op)?.to_sql().yellow());
    }

    match &op {
        Operation::Create => {
            query.create().await?;
            println!("{} {} created", "✓".green(), query.schema().table_name().cyan());
        }
        Operation::Drop => {
            query.drop().await?;
            println!("{} {} dropped", "✓".green(), query.schema().table_name().cyan());
        }
        Operation::Exists => {
            let exists = query.exists().await?;
            println!("{}", if exists { "true".green() } else { "false".red() });
        }
        Operation::Add => {
            let affected = query.add().await?;
            println!("{} {} rows affected", "✓".green(), affected);
        }
        Operation::Update(values) => {
            let affected = query.update(values.clone()).await?;
            println!("{} {} rows affected", "✓".green(), affected);
        }
        Operation::Delete => {
            let affected = query.delete().await?;
            println!("{} {} rows affected", "✓".green(), affected);
        }
        Operation::SelectAll(columns) => {
            let rows = query.select_all(columns).await?;
            format_output(&rows, &cli.format);
        }
        Operation::Select(names) => {
            let rows = query.select(&names[..]).await?;
            format_output(&rows, &cli.format);
        }
    }

    Ok(())
}

fn register_all<C: Connection>(session: &Session<'_, C>, config: &OrmConfig) -> OrmResult<()> {
    for decl in &config.tables {
        session.register(decl)?;
    }
    Ok(())
}

const NO_FILTER: &[String] = &[];

/// Build the query and operation a subcommand stands for.
fn prepare<'c, C: Connection>(
    session: &Session<'c, C>,
    command: &Commands,
) -> OrmResult<(Query<'c, C>, Operation)> {
    let (table, filter, op) = match command {
        Commands::Tables => {
            return Err(OrmError::Config("`tables` does not build a query".into()));
        }
        Commands::Create { table } => (table, NO_FILTER, Operation::Create),
        Commands::Drop { table } => (table, NO_FILTER, Operation::Drop),
        Commands::Exists { table } => (table, NO_FILTER, Operation::Exists),
        Commands::Add { table, values } => (table, &values[..], Operation::Add),
        Commands::Update { table, filter, set } => {
            (table, &filter[..], Operation::Update(assignments(set)?))
        }
        Commands::Delete { table, filter } => (table, &filter[..], Operation::Delete),
        Commands::Select {
            table,
            filter,
            columns,
        } => (table, &filter[..], Operation::Select(columns.clone())),
    };

    let mut query = session.table(table)?;
    query.bind(assignments(filter)?);
    Ok((query, op))
}

fn assignments(args: &[String]) -> OrmResult<Values> {
    args.iter()
        .map(|arg| parse_assignment(arg))
        .collect::<OrmResult<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

fn show_tables<C: Connection>(session: &Session<'_, C>) {
    let tables = session.registry().tables();
    if tables.is_empty() {
        println!("{}", "(no tables declared)".dimmed());
        return;
    }

    for name in tables {
        let Some(schema) = session.registry().get(&name) else {
            continue;
        };
        println!("{}", name.cyan().bold());
        for col in schema.columns() {
            let mut flags = Vec::new();
            if col.is_primary_key() {
                flags.push("pk".to_string());
            } else if col.is_required() {
                flags.push("required".to_string());
            }
            if let Some(fk) = col.foreign_key() {
                flags.push(format!("fk → {}.{}", fk.table, fk.column));
            }
            println!(
                "  {:20} {:16} {}",
                col.name().white(),
                col.declared_type().yellow(),
                flags.join(", ").dimmed()
            );
        }
        println!();
    }
}

fn format_output(results: &[Row], format: &OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            let objects: Vec<serde_json::Map<String, serde_json::Value>> = results
                .iter()
                .map(|row| {
                    row.columns()
                        .iter()
                        .cloned()
                        .zip(row.values().iter().map(|v| {
                            serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
                        }))
                        .collect()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Get column names from first row
            let columns = results[0].columns();

            // Calculate column widths
            let mut widths: HashMap<usize, usize> =
                columns.iter().enumerate().map(|(i, c)| (i, c.len())).collect();
            for row in results {
                for (i, val) in row.values().iter().enumerate() {
                    let len = val.to_string().len();
                    if let Some(w) = widths.get_mut(&i) {
                        *w = (*w).max(len);
                    }
                }
            }

            // Print header
            let header: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:width$}", c, width = widths[&i]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            // Print separator
            let sep: Vec<String> = (0..columns.len()).map(|i| "─".repeat(widths[&i])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            // Print rows
            for row in results {
                let cells: Vec<String> = row
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        format!("{:width$}", v.to_string(), width = widths.get(&i).copied().unwrap_or(0))
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_takes_where_filters() {
        let cli = Cli::try_parse_from(["ormlite", "delete", "users", "--where", "id=2"]).unwrap();
        let Commands::Delete { table, filter } = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(table, "users");
        assert_eq!(filter, vec!["id=2".to_string()]);

        assert!(Cli::try_parse_from(["ormlite", "delete", "users", "id=2"]).is_err());
    }

    #[test]
    fn test_delete_plan_uses_filters() {
        let config = OrmConfig::from_toml(
            r#"
            [[tables]]
            name = "users"
            columns = [{ name = "id", spec = ["int", "pk"] }]
            "#,
        )
        .unwrap();
        let session = Session::<SqlxConnection>::detached();
        register_all(&session, &config).unwrap();

        let cli = Cli::try_parse_from(["ormlite", "delete", "users", "--where", "id=2"]).unwrap();
        let (query, op) = prepare(&session, &cli.command).unwrap();
        assert_eq!(query.plan(&op).unwrap().to_sql(), "DELETE FROM users WHERE id=2;");
    }
}
