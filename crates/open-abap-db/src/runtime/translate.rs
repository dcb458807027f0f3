//! SQL translation from Open SQL to the backend dialect.
//!
//! SELECT clauses are rewritten textually; mutations are built from
//! templates. Neither step parses the statement, so operator tokens inside
//! string literals are rewritten as well.
//!
//! Values and predicates are caller-formatted SQL text and are spliced in
//! as is; callers must escape them.

use std::sync::LazyLock;

use regex_lite::{NoExpand, Regex};

/// `UP TO n ROWS` and everything after it on the same line.
static UP_TO_ROWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) UP TO (\d+) ROWS(.*)").expect("valid UP TO pattern"));

static ORDER_BY_PRIMARY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i) ORDER BY PRIMARY KEY").expect("valid ORDER BY pattern")
});

static ASCENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) ASCENDING").expect("valid ASCENDING pattern"));

static DESCENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) DESCENDING").expect("valid DESCENDING pattern"));

/// SQL translator for Open SQL to backend conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSqlTranslator;

impl OpenSqlTranslator {
    /// Create a new translator.
    pub fn new() -> Self {
        Self
    }

    /// Translate an Open SQL SELECT clause.
    ///
    /// `primary_key` supplies the columns for `ORDER BY PRIMARY KEY`; when it
    /// is absent or empty the clause is dropped.
    pub fn translate_select(&self, select: &str, primary_key: Option<&[String]>) -> String {
        let mut result = self.translate_up_to(select);
        result = self.translate_order_by_primary_key(&result, primary_key);
        result = self.translate_sort_direction(&result);
        self.translate_component_selector(&result)
    }

    /// Translate `UP TO n ROWS <rest>` to `<rest> LIMIT n`.
    fn translate_up_to(&self, sql: &str) -> String {
        UP_TO_ROWS.replace(sql, "${2} LIMIT ${1}").into_owned()
    }

    /// Expand or drop `ORDER BY PRIMARY KEY`.
    fn translate_order_by_primary_key(&self, sql: &str, primary_key: Option<&[String]>) -> String {
        match primary_key {
            Some(keys) if !keys.is_empty() => {
                let replacement = format!(" ORDER BY {}", keys.join(", "));
                ORDER_BY_PRIMARY_KEY
                    .replace(sql, NoExpand(&replacement))
                    .into_owned()
            }
            _ => ORDER_BY_PRIMARY_KEY.replace(sql, "").into_owned(),
        }
    }

    /// Translate ASCENDING/DESCENDING to ASC/DESC.
    fn translate_sort_direction(&self, sql: &str) -> String {
        let result = ASCENDING.replace_all(sql, " ASC");
        DESCENDING.replace_all(&result, " DESC").into_owned()
    }

    /// Translate the component selector `~` to the qualified-name separator.
    fn translate_component_selector(&self, sql: &str) -> String {
        sql.replace('~', ".")
    }

    /// Build an INSERT statement. Column names are quoted, values are
    /// passed through as already-formatted SQL literals.
    pub fn insert_sql(&self, table: &str, columns: &[String], values: &[String]) -> String {
        let columns: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(","),
            values.join(",")
        )
    }

    /// Build an UPDATE statement from `col = expr` assignments and a predicate.
    pub fn update_sql(&self, table: &str, set: &[String], where_clause: &str) -> String {
        format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            set.join(", "),
            where_clause
        )
    }

    /// Build a DELETE statement.
    pub fn delete_sql(&self, table: &str, where_clause: &str) -> String {
        format!("DELETE FROM {} WHERE {}", table, where_clause)
    }
}

/// Quote an identifier, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
