use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use anyhow::{Result, Context};

use crate::database::schema::FieldSchema;
use crate::database::{RowError, TableRef, TableRow, TableService};
use crate::utils::google::GoogleAuth;

const SERVICE: &str = "BigQuery";
const BIGQUERY_API: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// BigQuery through its v2 REST API.
pub struct BigQueryClient {
    http: Client,
    auth: GoogleAuth,
}

impl BigQueryClient {
    pub fn new(http: Client, auth: GoogleAuth) -> Self {
        Self { http, auth }
    }
}

pub fn dataset_resource(table: &TableRef) -> Value {
    json!({
        "datasetReference": {
            "projectId": table.project,
            "datasetId": table.dataset,
        }
    })
}

pub fn table_resource(table: &TableRef, schema: &[FieldSchema]) -> Value {
    json!({
        "tableReference": {
            "projectId": table.project,
            "datasetId": table.dataset,
            "tableId": table.table,
        },
        "schema": { "fields": schema },
    })
}

pub fn insert_all_request(rows: &[TableRow]) -> Value {
    let rows: Vec<Value> = rows.iter().map(|row| json!({ "json": row })).collect();
    json!({ "rows": rows })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Deserialize)]
struct InsertErrors {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Flattens `insertErrors` into one [`RowError`] per reported problem.
pub fn parse_insert_errors(body: &str) -> Result<Vec<RowError>> {
    let response: InsertAllResponse =
        serde_json::from_str(body).context("Failed to parse insertAll response")?;

    let mut errors = Vec::new();
    for entry in response.insert_errors {
        if entry.errors.is_empty() {
            errors.push(RowError { index: entry.index, message: "unspecified error".to_string() });
        }
        for error in entry.errors {
            errors.push(RowError {
                index: entry.index,
                message: format!("{}: {}", error.reason, error.message),
            });
        }
    }
    Ok(errors)
}

impl TableService for BigQueryClient {
    fn create_dataset(&self, table: &TableRef) -> Result<()> {
        let request = self
            .http
            .post(format!("{}/projects/{}/datasets", BIGQUERY_API, table.project))
            .json(&dataset_resource(table));
        self.auth.send(SERVICE, request)?;
        Ok(())
    }

    fn create_table(&self, table: &TableRef, schema: &[FieldSchema]) -> Result<()> {
        let request = self
            .http
            .post(format!("{}/projects/{}/datasets/{}/tables", BIGQUERY_API, table.project, table.dataset))
            .json(&table_resource(table, schema));
        self.auth.send(SERVICE, request)?;
        Ok(())
    }

    fn insert_rows(&self, table: &TableRef, rows: &[TableRow]) -> Result<Vec<RowError>> {
        let request = self
            .http
            .post(format!(
                "{}/projects/{}/datasets/{}/tables/{}/insertAll",
                BIGQUERY_API, table.project, table.dataset, table.table
            ))
            .json(&insert_all_request(rows));
        let body = self.auth.send(SERVICE, request)?.text().context("Failed to read insertAll response")?;
        parse_insert_errors(&body)
    }
}
