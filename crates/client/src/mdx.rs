//! MDX query building.
//!
//! [`MdxQuery`] renders `WITH .. SELECT .. FROM .. WHERE ..` text from
//! members and axis expressions. [`table_to_mdx`] turns a table of member
//! names into the query that selects exactly those cells: columns whose
//! value is the same on every row go to the slicer, the rest form tuples
//! on axis 0.

use std::fmt;

use crate::error::{ClientError, Result};
use crate::models::CellValue;
use crate::tabular::Table;

/// A member reference, `[dim].[hier].[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MdxMember {
    hierarchy: String,
    name: String,
}

impl MdxMember {
    pub fn new(dimension: &str, hierarchy: &str, name: &str) -> Self {
        Self {
            hierarchy: format!("[{dimension}].[{hierarchy}]"),
            name: name.to_string(),
        }
    }

    /// Member of the same-named hierarchy of `dimension`.
    pub fn of(dimension: &str, name: &str) -> Self {
        Self::new(dimension, dimension, name)
    }

    /// Member of a table column: either a hierarchy unique name
    /// (`[d].[h]`) or a plain dimension name.
    pub fn from_column(column: &str, name: &str) -> Self {
        if column.starts_with('[') {
            Self {
                hierarchy: column.to_string(),
                name: name.to_string(),
            }
        } else {
            Self::of(column, name)
        }
    }

    pub fn unique_name(&self) -> String {
        format!("{}.[{}]", self.hierarchy, self.name.replace(']', "]]"))
    }
}

impl fmt::Display for MdxMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_name())
    }
}

/// Contents of one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum MdxAxis {
    /// Set expression used verbatim, e.g. `{TM1SUBSETALL([Year])}`.
    Expression(String),
    /// Explicit tuple set.
    Tuples(Vec<Vec<MdxMember>>),
}

impl MdxAxis {
    fn render(&self) -> String {
        match self {
            MdxAxis::Expression(expr) => expr.clone(),
            MdxAxis::Tuples(tuples) => {
                let rendered: Vec<String> = tuples.iter().map(|t| tuple_text(t)).collect();
                format!("{{{}}}", rendered.join(","))
            }
        }
    }
}

fn tuple_text(members: &[MdxMember]) -> String {
    let names: Vec<String> = members.iter().map(MdxMember::unique_name).collect();
    format!("({})", names.join(","))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MdxQuery {
    pub with: Vec<String>,
    pub cube: Option<String>,
    pub axes: Vec<MdxAxis>,
    pub where_tuple: Vec<MdxMember>,
}

impl MdxQuery {
    pub fn new(cube: impl Into<String>) -> Self {
        Self {
            cube: Some(cube.into()),
            ..Self::default()
        }
    }

    /// Add a `MEMBER`/`SET` definition to the `WITH` clause.
    pub fn with(mut self, definition: impl Into<String>) -> Self {
        self.with.push(definition.into());
        self
    }

    pub fn axis(mut self, axis: MdxAxis) -> Self {
        self.axes.push(axis);
        self
    }

    pub fn where_member(mut self, member: MdxMember) -> Self {
        if !self.where_tuple.contains(&member) {
            self.where_tuple.push(member);
        }
        self
    }

    pub fn to_mdx(&self) -> Result<String> {
        let cube = self
            .cube
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ClientError::InvalidMdx("query has no cube".to_string()))?;
        if self.axes.is_empty() {
            return Err(ClientError::InvalidMdx("query has no axes".to_string()));
        }
        let mut mdx = String::new();
        if !self.with.is_empty() {
            mdx.push_str("WITH ");
            mdx.push_str(&self.with.join(" "));
            mdx.push(' ');
        }
        let axes: Vec<String> = self
            .axes
            .iter()
            .enumerate()
            .map(|(i, axis)| format!("{} ON {i}", axis.render()))
            .collect();
        mdx.push_str("SELECT ");
        mdx.push_str(&axes.join(", "));
        mdx.push_str(&format!(" FROM [{cube}]"));
        if !self.where_tuple.is_empty() {
            mdx.push_str(" WHERE ");
            mdx.push_str(&tuple_text(&self.where_tuple));
        }
        Ok(mdx)
    }
}

/// For each column, whether every row holds the same value.
pub fn uniform_columns(table: &Table) -> Vec<bool> {
    (0..table.columns.len())
        .map(|idx| {
            let mut values = table.column(idx);
            match values.next() {
                Some(first) => values.all(|v| v == first),
                None => true,
            }
        })
        .collect()
}

fn member_name(value: &CellValue) -> String {
    value.to_string()
}

/// MDX selecting the cells addressed by `table`.
///
/// Every column except the last names a hierarchy; the last column holds
/// values and is ignored. A table whose rows all address one cell (a single
/// row, or duplicates) puts that cell's full tuple on axis 0.
pub fn table_to_mdx(table: &Table, cube: &str) -> Result<String> {
    if table.columns.len() < 2 {
        return Err(ClientError::InvalidMdx(
            "table needs at least one member column and a value column".to_string(),
        ));
    }
    if table.is_empty() {
        return Err(ClientError::InvalidMdx("table has no rows".to_string()));
    }
    let dims = table.columns.len() - 1;
    let uniform = uniform_columns(table);
    // Rows that all address the same cell collapse to one full tuple.
    let single_cell = uniform[..dims].iter().all(|&u| u);
    let varying: Vec<usize> = if single_cell {
        (0..dims).collect()
    } else {
        (0..dims).filter(|&i| !uniform[i]).collect()
    };

    let mut query = MdxQuery::new(cube);
    for idx in (0..dims).filter(|i| !varying.contains(i)) {
        let first = &table.rows[0][idx];
        query = query.where_member(MdxMember::from_column(&table.columns[idx], &member_name(first)));
    }
    let rows = if single_cell { &table.rows[..1] } else { &table.rows[..] };
    let tuples: Vec<Vec<MdxMember>> = rows
        .iter()
        .map(|row| {
            varying
                .iter()
                .map(|&i| MdxMember::from_column(&table.columns[i], &member_name(&row[i])))
                .collect()
        })
        .collect();
    query.axis(MdxAxis::Tuples(tuples)).to_mdx()
}
