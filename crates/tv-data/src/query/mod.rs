//! Query source declarations
//!
//! A track declares where its rows come from: a table, the column
//! expressions to select from it and the SQL modules that must be included
//! before the table exists. Nothing here touches the database.

use serde::{Deserialize, Serialize};

use crate::schema::RowSchema;

/// A selected column, optionally aliased (`scoped_id AS id`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnExpr {
    expression: String,
    name: String,
}

impl ColumnExpr {
    /// Parse `expr` or `expr AS alias`. The `AS` keyword is matched
    /// case-insensitively and only as the second-to-last token.
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let n = tokens.len();
        if n >= 3 && tokens[n - 2].eq_ignore_ascii_case("as") {
            return Self {
                expression: tokens[..n - 2].join(" "),
                name: tokens[n - 1].to_string(),
            };
        }

        let expression = tokens.join(" ");
        Self {
            name: expression.clone(),
            expression,
        }
    }

    /// The source expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The output column name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_sql(&self) -> String {
        if self.expression == self.name {
            self.name.clone()
        } else {
            format!("{} AS {}", self.expression, self.name)
        }
    }
}

/// Table and columns a track selects from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySource {
    table: String,
    columns: Vec<ColumnExpr>,
    where_clause: Option<String>,
}

impl QuerySource {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(|c| ColumnExpr::parse(c.as_ref())).collect(),
            where_clause: None,
        }
    }

    /// Restrict the selected rows
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnExpr] {
        &self.columns
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Output column names in selection order
    pub fn output_names(&self) -> Vec<&str> {
        self.columns.iter().map(ColumnExpr::name).collect()
    }

    /// Schema columns this source does not produce
    pub fn missing_columns(&self, schema: &RowSchema) -> Vec<String> {
        let produced = self.output_names();
        schema
            .column_names()
            .into_iter()
            .filter(|name| !produced.contains(name))
            .map(str::to_string)
            .collect()
    }

    pub fn covers(&self, schema: &RowSchema) -> bool {
        self.missing_columns(schema).is_empty()
    }

    pub fn select_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnExpr::to_sql).collect();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), self.table);
        if let Some(clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql
    }
}

/// SQL modules a track needs before its source table can be queried
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlImports {
    modules: Vec<String>,
}

impl SqlImports {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }
}

/// Visible time range, in trace nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Whether a slice starting at `ts` lasting `dur` touches the window.
    /// A negative duration is still running, so it reaches every window
    /// that starts after `ts`.
    pub fn overlaps(&self, ts: i64, dur: i64) -> bool {
        (dur < 0 || ts.saturating_add(dur) >= self.start) && ts <= self.end
    }

    /// SQL predicate equivalent to [`TimeWindow::overlaps`] over `ts`/`dur`
    pub fn sql_predicate(&self) -> String {
        format!(
            "(dur < 0 OR ts + dur >= {}) AND ts <= {}",
            self.start, self.end
        )
    }
}
