use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Required,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
}

const fn required(name: &'static str, field_type: FieldType) -> FieldSchema {
    FieldSchema { name, field_type, mode: FieldMode::Required }
}

/// Column layout of the images table, in record file order.
pub const IMAGES_SCHEMA: [FieldSchema; 9] = [
    required("image_id", FieldType::String),
    required("image_url", FieldType::String),
    required("previously_rejected", FieldType::Integer),
    required("vai_adult_score", FieldType::String),
    required("vai_medical_score", FieldType::String),
    required("vai_violence_score", FieldType::String),
    required("vai_racy_score", FieldType::String),
    required("vai_spoof_score", FieldType::String),
    required("should_be_rejected", FieldType::Integer),
];

/// Bookkeeping table standing in for datasets in the SQLite backend.
pub const DATASETS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS datasets (
        name TEXT PRIMARY KEY NOT NULL
    );
";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for `schema`. Deliberately without `IF NOT EXISTS`.
pub fn create_table_sql(table_name: &str, schema: &[FieldSchema]) -> String {
    let columns: Vec<String> = schema
        .iter()
        .map(|field| {
            let sql_type = match field.field_type {
                FieldType::String => "TEXT",
                FieldType::Integer => "INTEGER",
            };
            let null = match field.mode {
                FieldMode::Required => " NOT NULL",
            };
            format!("{} {}{}", quote_ident(field.name), sql_type, null)
        })
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table_name), columns.join(", "))
}

pub fn insert_sql(table_name: &str, schema: &[FieldSchema]) -> String {
    let columns: Vec<String> = schema.iter().map(|field| quote_ident(field.name)).collect();
    let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table_name),
        columns.join(", "),
        placeholders.join(", ")
    )
}
