//! Table reference extraction from SQL

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::object_name_to_string;
use crate::parser::SqlParser;
use sqlparser::ast::{ObjectName, Query, Visit, Visitor};
use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

#[derive(Default)]
struct TableCollector {
    tables: BTreeSet<String>,
    ctes: HashSet<String>,
}

impl Visitor for TableCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        self.tables.insert(object_name_to_string(relation));
        ControlFlow::Continue(())
    }
}

/// Physical tables referenced by the first statement of `sql`, sorted.
///
/// Names bound by a `WITH` clause are not physical tables and are left out.
pub fn referenced_tables(sql: &str, dialect: Dialect) -> SqlResult<Vec<String>> {
    let stmt = SqlParser::new(dialect).first_statement(sql)?;
    let mut collector = TableCollector::default();
    let _ = stmt.visit(&mut collector);

    let TableCollector { tables, ctes } = collector;
    Ok(tables
        .into_iter()
        .filter(|t| !ctes.contains(&t.to_lowercase()))
        .collect())
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
