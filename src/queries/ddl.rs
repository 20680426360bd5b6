use sea_query::{ColumnDef, SqliteQueryBuilder, Table};

use crate::schema::{Medicines, Metadata};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS medicines (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL,
///     instructions TEXT NOT NULL,
///     imageUriAsString TEXT,
///     schedules TEXT NOT NULL DEFAULT '[]',
///     aiAdvice TEXT
/// )
pub fn create_medicines_table() -> String {
    Table::create()
        .table(Medicines::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Medicines::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Medicines::Name).text().not_null())
        .col(ColumnDef::new(Medicines::Instructions).text().not_null())
        .col(ColumnDef::new(Medicines::ImageUriAsString).text().null())
        .col(
            ColumnDef::new(Medicines::Schedules)
                .text()
                .not_null()
                .default("[]"),
        )
        .col(ColumnDef::new(Medicines::AiAdvice).text().null())
        .to_string(SqliteQueryBuilder)
}

/// DROP TABLE IF EXISTS medicines
pub fn drop_medicines_table() -> String {
    Table::drop()
        .table(Medicines::Table)
        .if_exists()
        .to_string(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medicines_table_keeps_legacy_column_names() {
        let sql = create_medicines_table();
        assert!(sql.contains("\"medicines\""), "{}", sql);
        assert!(sql.contains("\"imageUriAsString\""), "{}", sql);
        assert!(sql.contains("\"aiAdvice\""), "{}", sql);
        assert!(sql.contains("AUTOINCREMENT"), "{}", sql);
    }

    #[test]
    fn test_drop_is_conditional() {
        assert_eq!(drop_medicines_table(), r#"DROP TABLE IF EXISTS "medicines""#);
    }
}
