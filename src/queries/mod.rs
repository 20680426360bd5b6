//! SQL statement builders, one function per statement
pub mod ddl;
pub mod medicines;
pub mod metadata;
