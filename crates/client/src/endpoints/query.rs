//! OData query option composition.
//!
//! Every `$filter` conjunct pushed onto a [`QueryOptions`] ends up in a single
//! `$filter` option joined with `and`; the option is never repeated on a URL.

use std::fmt::Write as _;

use super::url_encoding::encode_path_segment;

/// OData system query options plus the TM1 `!sandbox` parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub select: Option<String>,
    pub expand: Option<String>,
    pub filters: Vec<String>,
    pub orderby: Option<String>,
    pub top: Option<usize>,
    pub skip: Option<usize>,
    pub sandbox: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    /// Add one conjunct to `$filter`.
    pub fn filter(mut self, conjunct: impl Into<String>) -> Self {
        self.filters.push(conjunct.into());
        self
    }

    pub fn orderby(mut self, orderby: impl Into<String>) -> Self {
        self.orderby = Some(orderby.into());
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Scope the request to a sandbox. Empty names mean the base model.
    pub fn sandbox(mut self, sandbox: Option<&str>) -> Self {
        self.sandbox = sandbox.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Combined `$filter` expression, if any conjuncts were added.
    pub fn filter_expression(&self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(" and "))
        }
    }

    /// Render as `opt=val&opt=val` without a leading `?`.
    ///
    /// Values are left readable; spaces are escaped when the full URL is
    /// composed by the engine.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(select) = &self.select {
            parts.push(format!("$select={select}"));
        }
        if let Some(expand) = &self.expand {
            parts.push(format!("$expand={expand}"));
        }
        if let Some(filter) = self.filter_expression() {
            parts.push(format!("$filter={filter}"));
        }
        if let Some(orderby) = &self.orderby {
            parts.push(format!("$orderby={orderby}"));
        }
        if let Some(top) = self.top {
            parts.push(format!("$top={top}"));
        }
        if let Some(skip) = self.skip {
            parts.push(format!("$skip={skip}"));
        }
        if let Some(sandbox) = &self.sandbox {
            parts.push(format!("!sandbox={}", encode_path_segment(sandbox)));
        }
        parts.join("&")
    }

    /// Append the options to `path`, respecting an existing query string.
    pub fn apply(&self, path: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            return path.to_string();
        }
        let mut out = String::with_capacity(path.len() + query.len() + 1);
        out.push_str(path);
        let sep = if path.contains('?') { '&' } else { '?' };
        let _ = write!(out, "{sep}{query}");
        out
    }
}

/// Append `!sandbox=` to `path` when a non-empty sandbox name is given.
pub fn with_sandbox(path: &str, sandbox: Option<&str>) -> String {
    QueryOptions::new().sandbox(sandbox).apply(path)
}
