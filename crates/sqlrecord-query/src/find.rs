//! SELECT synthesis for find requests.
//!
//! [`generate_find_query`] turns an identifier and a [`FindOptions`] bag into
//! one SELECT statement. When associations are eager-loaded every selected
//! column is re-aliased `t<table>_r<column>` (base table first, index 0) and
//! the alias map is returned with the SQL so rows can be split back into
//! per-table fragments with [`transform_row`].

use crate::options::{FindOptions, Identifier};
use regex::Regex;
use sqlrecord_core::{Row, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// The entity metadata query synthesis needs.
pub trait FindSource {
    /// Backing table.
    fn table_name(&self) -> &str;

    /// Identity column.
    fn primary_key(&self) -> &str;

    /// Declared columns, in order.
    fn columns(&self) -> &[String];

    /// The eager-load join for an association, if the entity declares one
    /// with this name.
    fn join(&self, association: &str) -> Option<JoinSpec>;
}

/// What an association contributes to an eager-load query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// The joined table.
    pub table: String,
    /// Columns to select from the joined table.
    pub columns: Vec<String>,
    /// The JOIN clause itself.
    pub fragment: String,
}

/// Which side of the relationship holds the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeySide {
    /// The parent row holds the key (belongs-to).
    Parent,
    /// The related rows hold the key (has-one, has-many).
    Related,
}

/// Generate the LEFT JOIN clause for an association.
///
/// ```
/// use sqlrecord_query::{ForeignKeySide, build_join_clause};
///
/// assert_eq!(
///     build_join_clause("posts", "id", "comments", "id", "post_id", ForeignKeySide::Related),
///     "LEFT JOIN comments ON comments.post_id = posts.id"
/// );
/// assert_eq!(
///     build_join_clause("comments", "id", "posts", "id", "post_id", ForeignKeySide::Parent),
///     "LEFT JOIN posts ON posts.id = comments.post_id"
/// );
/// ```
pub fn build_join_clause(
    parent_table: &str,
    parent_pk: &str,
    related_table: &str,
    related_pk: &str,
    foreign_key: &str,
    side: ForeignKeySide,
) -> String {
    match side {
        ForeignKeySide::Parent => format!(
            "LEFT JOIN {related_table} ON {related_table}.{related_pk} = {parent_table}.{foreign_key}"
        ),
        ForeignKeySide::Related => format!(
            "LEFT JOIN {related_table} ON {related_table}.{foreign_key} = {parent_table}.{parent_pk}"
        ),
    }
}

/// Where an aliased column really comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Position of the table in the select list; the base table is 0.
    pub table_index: usize,
    pub table: String,
    pub column: String,
}

/// A generated SELECT and its alias map.
///
/// `column_lookup` is empty unless associations were eager-loaded.
/// `includes` lists the associations that were actually joined; the one at
/// position `k` owns table index `k + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    pub query: String,
    pub column_lookup: BTreeMap<String, ColumnRef>,
    pub includes: Vec<String>,
}

impl FindQuery {
    /// Did this query eager-load anything?
    pub fn is_joined(&self) -> bool {
        !self.column_lookup.is_empty()
    }
}

fn clause_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9\-_ ,()]+$").expect("clause pattern is valid"))
}

fn offset_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("offset pattern is valid"))
}

/// Keep a free-text clause only when it passes `pattern`.
fn sanitize<'a>(option: &'static str, value: Option<&'a str>, pattern: &Regex) -> &'a str {
    match value {
        Some(v) if pattern.is_match(v) => v,
        Some(v) => {
            tracing::warn!(option, value = v, "Discarding invalid find option");
            ""
        }
        None => "",
    }
}

/// Build the SELECT for a find request.
///
/// Clause order is fixed:
/// `SELECT … FROM … [joins] [WHERE …] [GROUP BY …] [ORDER BY …] [LIMIT …] [OFFSET …]`
/// and each clause is left out when empty.
#[tracing::instrument(level = "debug", skip(source, options), fields(table = source.table_name()))]
pub fn generate_find_query<S: FindSource + ?Sized>(
    source: &S,
    identifier: &Identifier,
    options: &FindOptions,
) -> FindQuery {
    let table = source.table_name();
    let pk = source.primary_key();

    let group = sanitize("group", options.group.as_deref(), clause_pattern());
    let order = sanitize("order", options.order.as_deref(), clause_pattern());
    let mut limit = sanitize("limit", options.limit.as_deref(), clause_pattern());
    let offset = sanitize("offset", options.offset.as_deref(), offset_pattern());

    let mut where_clause = match identifier {
        Identifier::Ids(ids) if ids.is_empty() => format!("{pk} IN (NULL)"),
        Identifier::Ids(ids) => {
            let ids: Vec<String> = ids.iter().map(Value::to_sql_literal).collect();
            format!("{pk} IN ({})", ids.join(","))
        }
        Identifier::First => {
            limit = "1";
            String::new()
        }
        Identifier::Id(id) => format!("{table}.{pk} = {}", id.to_sql_literal()),
        Identifier::All => String::new(),
    };

    if let Some(conditions) = &options.conditions {
        let fragment = conditions.to_where();
        if !fragment.is_empty() {
            where_clause = if where_clause.is_empty() {
                fragment
            } else {
                format!("{where_clause} AND {fragment}")
            };
        }
    }

    let mut select = options.select.clone().unwrap_or_else(|| "*".to_string());
    let mut joins = Vec::new();
    let mut column_lookup = BTreeMap::new();
    let mut includes = Vec::new();

    if options.include.is_some() {
        let mut tables: Vec<(String, Vec<String>)> =
            vec![(table.to_string(), source.columns().to_vec())];
        for name in options.include_names() {
            match source.join(name) {
                Some(spec) => {
                    includes.push(name.to_string());
                    joins.push(spec.fragment);
                    tables.push((spec.table, spec.columns));
                }
                None => tracing::warn!(association = name, "Ignoring unknown include"),
            }
        }

        let mut selects = Vec::new();
        for (table_index, (table_name, columns)) in tables.iter().enumerate() {
            for (column_index, column) in columns.iter().enumerate() {
                let alias = format!("t{table_index}_r{column_index}");
                selects.push(format!("{table_name}.{column} AS {alias}"));
                column_lookup.insert(
                    alias,
                    ColumnRef {
                        table_index,
                        table: table_name.clone(),
                        column: column.clone(),
                    },
                );
            }
        }
        select = selects.join(", ");
    }

    let mut query = format!("SELECT {select} FROM {table}");
    if !joins.is_empty() {
        query.push(' ');
        query.push_str(&joins.join(" "));
    }
    for (keyword, value) in [
        ("WHERE", where_clause.as_str()),
        ("GROUP BY", group),
        ("ORDER BY", order),
        ("LIMIT", limit),
        ("OFFSET", offset),
    ] {
        if !value.is_empty() {
            query.push_str(&format!(" {keyword} {value}"));
        }
    }

    tracing::trace!(sql = %query, aliases = column_lookup.len(), "Generated find query");
    FindQuery {
        query,
        column_lookup,
        includes,
    }
}

/// One table's share of a joined row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFragment {
    pub table_index: usize,
    pub table: String,
    /// Real column names with their values, in select order.
    pub attributes: Vec<(String, Value)>,
}

impl TableFragment {
    /// True when every value is NULL (an outer join with no match).
    pub fn is_empty_match(&self) -> bool {
        self.attributes.iter().all(|(_, v)| v.is_null())
    }
}

/// Regroup an aliased row into per-table fragments.
///
/// Fragments are keyed by table index (so a table joined twice yields two
/// fragments) and come back in first-seen order; cells whose alias is not in
/// the lookup are skipped.
pub fn transform_row(row: &Row, column_lookup: &BTreeMap<String, ColumnRef>) -> Vec<TableFragment> {
    let mut fragments: Vec<TableFragment> = Vec::new();
    for (alias, value) in row.iter() {
        let Some(column) = column_lookup.get(alias) else {
            continue;
        };
        let pair = (column.column.clone(), value.clone());
        match fragments
            .iter_mut()
            .find(|f| f.table_index == column.table_index)
        {
            Some(fragment) => fragment.attributes.push(pair),
            None => fragments.push(TableFragment {
                table_index: column.table_index,
                table: column.table.clone(),
                attributes: vec![pair],
            }),
        }
    }
    fragments
}
