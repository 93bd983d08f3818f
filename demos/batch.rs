use turso_pipeline::{Statement, StatementOutcome, TursoClient, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db = TursoClient::from_env()?;

    let names = ["Alice", "Bob", "Charlie"];
    let statements = std::iter::once(Statement::from(
        "CREATE TABLE IF NOT EXISTS batch_users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    ))
    .chain(names.iter().map(|name| {
        Statement::new(
            "INSERT INTO batch_users (name) VALUES (?)",
            [Value::text(*name)],
        )
    }))
    .chain(std::iter::once(Statement::from(
        "SELECT id, name FROM batch_users",
    )));

    // One envelope: every statement runs in the same server-side session.
    let outcomes = db.execute_pipeline(statements).await?;

    for outcome in outcomes {
        match outcome {
            StatementOutcome::Rows(result) if result.is_empty() => println!("ok"),
            StatementOutcome::Rows(result) => println!("query: {} row(s)", result.count()),
            StatementOutcome::SqlError {
                request_index,
                message,
                ..
            } => {
                eprintln!("sql error at index {request_index}: {message}");
            }
        }
    }

    Ok(())
}
