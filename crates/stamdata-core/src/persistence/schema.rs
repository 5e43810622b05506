//! Table DDL derived from record specifications

use sqlx::SqliteConnection;

use super::error::PersistenceResult;
use super::statements::{MODIFIED_DATE, PID, VALID_FROM, VALID_TO};
use crate::record::RecordSpecification;

/// `CREATE TABLE` statement for a specification
pub fn create_table_sql(spec: &RecordSpecification) -> String {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", PID)];

    columns.extend(spec.persisted_fields().map(|field| {
        let null = if field.is_optional() { "" } else { " NOT NULL" };
        format!("{} {}{}", field.name(), field.field_type().sql_type(), null)
    }));

    columns.push(format!("{} INTEGER NOT NULL", VALID_FROM));
    columns.push(format!("{} INTEGER", VALID_TO));
    columns.push(format!("{} INTEGER NOT NULL", MODIFIED_DATE));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        spec.table(),
        columns.join(",\n    ")
    )
}

/// Index supporting key lookups
pub fn create_index_sql(spec: &RecordSpecification) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_{key} ON {table} ({key}, {valid_from})",
        table = spec.table(),
        key = spec.key_column(),
        valid_from = VALID_FROM
    )
}

/// Create the table and its key index if missing
pub async fn create_table(
    conn: &mut SqliteConnection,
    spec: &RecordSpecification,
) -> PersistenceResult<()> {
    sqlx::query(&create_table_sql(spec))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&create_index_sql(spec))
        .execute(&mut *conn)
        .await?;

    tracing::debug!(table = spec.table(), "Ensured table exists");
    Ok(())
}
