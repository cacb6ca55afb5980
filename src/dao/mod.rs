/// Serialized representations of catalog data.
pub mod models;
/// Question catalog and its read-only access trait.
pub mod question_bank;
