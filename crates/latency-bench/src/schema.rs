//! The `employees` table and a minimal typed select builder over it.
//!
//! The builder only covers what the benchmark issues: a full-column select
//! with an optional limit. Column and table names are always quoted.

use std::fmt::Write as _;
use std::marker::PhantomData;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// Raw SQL used by the untyped strategies.
pub const EMPLOYEES_QUERY: &str =
    r#"SELECT "emp_no", "first_name", "last_name" FROM "employees" LIMIT 10"#;

/// A table a row type maps onto.
pub trait Table: Serialize + DeserializeOwned {
    const NAME: &'static str;
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(deserialize_with = "int_or_text")]
    pub emp_no: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Table for Employee {
    const NAME: &'static str = "employees";
    const COLUMNS: &'static [&'static str] = &["emp_no", "first_name", "last_name"];
}

impl TryFrom<&tokio_postgres::Row> for Employee {
    type Error = tokio_postgres::Error;

    fn try_from(row: &tokio_postgres::Row) -> Result<Self, Self::Error> {
        Ok(Self {
            emp_no: row.try_get("emp_no")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
        })
    }
}

/// SQL-over-HTTP returns every value as text; accept both shapes.
fn int_or_text<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// `select <columns> from <table> [limit n]` for a [`Table`] row type.
#[derive(Debug, Clone)]
pub struct Select<T: Table> {
    limit: Option<usize>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Table> Default for Select<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Table> Select<T> {
    pub fn new() -> Self {
        Self {
            limit: None,
            _row: PhantomData,
        }
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn to_sql(&self) -> String {
        let columns: Vec<String> = T::COLUMNS.iter().map(|c| quote_ident(c)).collect();
        let mut sql = format!(
            "select {} from {}",
            columns.join(", "),
            quote_ident(T::NAME)
        );
        if let Some(n) = self.limit {
            let _ = write!(sql, " limit {n}");
        }
        sql
    }

    /// Decode raw JSON rows into the table's row type.
    pub fn decode(&self, rows: Vec<serde_json::Value>) -> serde_json::Result<Vec<T>> {
        rows.into_iter().map(serde_json::from_value).collect()
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
