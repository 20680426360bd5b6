use sea_query::{Expr, OnConflict, Order, Query, SimpleExpr, SqliteQueryBuilder};

use crate::schema::Medicines;

/// All columns in table order, used by SELECT and to decode rows by position
pub const ALL_COLUMNS: [Medicines; 6] = [
    Medicines::Id,
    Medicines::Name,
    Medicines::Instructions,
    Medicines::ImageUriAsString,
    Medicines::Schedules,
    Medicines::AiAdvice,
];

/// INSERT INTO medicines ([id,] name, instructions, imageUriAsString, schedules, aiAdvice)
/// VALUES (...)
/// ON CONFLICT (id) DO UPDATE SET name = excluded.name, ...
/// RETURNING id
///
/// `id` of `None` lets SQLite assign the next rowid. A given id replaces every
/// column of the existing row, or creates the row with that id.
pub fn upsert(
    id: Option<i64>,
    name: &str,
    instructions: &str,
    image_uri: Option<&str>,
    schedules_json: &str,
    ai_advice: Option<&str>,
) -> String {
    let mut columns = Vec::with_capacity(6);
    let mut values: Vec<SimpleExpr> = Vec::with_capacity(6);
    if let Some(id) = id {
        columns.push(Medicines::Id);
        values.push(id.into());
    }
    columns.extend([
        Medicines::Name,
        Medicines::Instructions,
        Medicines::ImageUriAsString,
        Medicines::Schedules,
        Medicines::AiAdvice,
    ]);
    values.extend([
        name.into(),
        instructions.into(),
        image_uri.map(str::to_owned).into(),
        schedules_json.into(),
        ai_advice.map(str::to_owned).into(),
    ]);

    Query::insert()
        .into_table(Medicines::Table)
        .columns(columns)
        .values_panic(values)
        .on_conflict(
            OnConflict::column(Medicines::Id)
                .update_columns([
                    Medicines::Name,
                    Medicines::Instructions,
                    Medicines::ImageUriAsString,
                    Medicines::Schedules,
                    Medicines::AiAdvice,
                ])
                .to_owned(),
        )
        .returning_col(Medicines::Id)
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM medicines WHERE id = ?
pub fn delete_by_id(id: i64) -> String {
    Query::delete()
        .from_table(Medicines::Table)
        .and_where(Expr::col(Medicines::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, name, instructions, imageUriAsString, schedules, aiAdvice FROM medicines ORDER BY id
pub fn select_all() -> String {
    Query::select()
        .columns(ALL_COLUMNS)
        .from(Medicines::Table)
        .order_by(Medicines::Id, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, name, instructions, imageUriAsString, schedules, aiAdvice FROM medicines WHERE id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns(ALL_COLUMNS)
        .from(Medicines::Table)
        .and_where(Expr::col(Medicines::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}
