use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Medicines table - one row per pill with its JSON-encoded alarm schedules
#[derive(Iden)]
pub enum Medicines {
    Table,
    Id,
    Name,
    Instructions,
    #[iden = "imageUriAsString"]
    ImageUriAsString,
    Schedules,
    #[iden = "aiAdvice"]
    AiAdvice,
}
