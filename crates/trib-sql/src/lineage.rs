//! Schema-aware column lineage
//!
//! For each output column of a query, finds the physical table columns its
//! value is computed from. CTEs, derived tables, nested joins and set
//! operations are resolved through to the tables they read. Wildcards expand
//! against the supplied [`Schema`] or against CTE and subquery outputs; a
//! relation with no known columns contributes a `*` output column instead.

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::object_name_to_string;
use crate::parser::SqlParser;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    Expr, JoinConstraint, JoinOperator, ObjectName, Query, Select, SelectItem,
    SelectItemQualifiedWildcardKind, SetExpr, Statement, TableAlias, TableFactor,
    TableWithJoins, Visit, Visitor,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::ControlFlow;

/// A physical table column an output column reads from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpstreamRef {
    pub table: String,
    pub column: String,
}

impl UpstreamRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Lineage of a single output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageColumn {
    /// Output column name, or `*` for an unexpanded wildcard
    pub name: String,

    /// Upstream table columns, deduplicated and sorted by table
    pub upstream: Vec<UpstreamRef>,
}

/// Lineage of a query, one entry per output column in projection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub columns: Vec<LineageColumn>,
}

impl Lineage {
    /// Find an output column by name
    pub fn column(&self, name: &str) -> Option<&LineageColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Compute column lineage of the first statement in `sql`.
///
/// Statements other than queries have no output columns and yield an empty
/// lineage. Parse failures are returned as errors.
pub fn column_lineage(sql: &str, dialect: Dialect, schema: &Schema) -> SqlResult<Lineage> {
    let stmt = SqlParser::new(dialect).first_statement(sql)?;
    let Statement::Query(query) = &stmt else {
        log::debug!("No lineage for non-query statement");
        return Ok(Lineage::default());
    };

    let resolver = Resolver { schema };
    let outputs = resolver.query(query, &Ctes::new());
    Ok(Lineage {
        columns: outputs
            .into_iter()
            .map(|o| LineageColumn {
                name: o.name,
                upstream: o.sources.into_iter().collect(),
            })
            .collect(),
    })
}

/// An output column of a (sub)query with its leaf sources
#[derive(Debug, Clone)]
struct Output {
    name: String,
    sources: BTreeSet<UpstreamRef>,
}

impl Output {
    fn wildcard(table: &str) -> Self {
        Self {
            name: "*".to_string(),
            sources: BTreeSet::from([UpstreamRef::new(table, "*")]),
        }
    }

    fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

/// CTE outputs visible to a query, keyed by lowercased name
type Ctes = HashMap<String, Vec<Output>>;

/// Columns a relation in a FROM clause provides
#[derive(Debug, Clone)]
enum Columns {
    /// Columns are known: schema table, CTE or subquery
    Known(Vec<Output>),
    /// Physical table without a schema
    Unknown,
}

/// A relation in scope of a SELECT
#[derive(Debug, Clone)]
struct Relation {
    /// Alias if given, else the name as written
    binding: String,
    /// Physical table name, if the relation is a table
    table: Option<String>,
    columns: Columns,
}

impl Relation {
    /// Whether a column qualifier refers to this relation
    fn matches_qualifier(&self, qualifier: &str) -> bool {
        if self.binding.eq_ignore_ascii_case(qualifier) {
            return true;
        }
        // `schema.table` referenced as `table.col` when no alias is given
        match &self.table {
            Some(table) if table == &self.binding => table
                .rsplit('.')
                .next()
                .is_some_and(|last| last.eq_ignore_ascii_case(qualifier)),
            _ => false,
        }
    }

    /// Whether the relation is known to provide `column` by name
    fn declares(&self, column: &str) -> bool {
        match &self.columns {
            Columns::Known(outputs) => outputs.iter().any(|o| o.name.eq_ignore_ascii_case(column)),
            Columns::Unknown => false,
        }
    }

    fn has_wildcard(&self) -> bool {
        match &self.columns {
            Columns::Known(outputs) => outputs.iter().any(Output::is_wildcard),
            Columns::Unknown => true,
        }
    }

    /// Leaf sources of `column` read through this relation
    fn lookup(&self, column: &str) -> BTreeSet<UpstreamRef> {
        match &self.columns {
            Columns::Known(outputs) => {
                if let Some(o) = outputs.iter().find(|o| o.name.eq_ignore_ascii_case(column)) {
                    return o.sources.clone();
                }
                // Passthrough of a table whose columns are not known
                let passthrough: BTreeSet<UpstreamRef> = outputs
                    .iter()
                    .filter(|o| o.is_wildcard())
                    .flat_map(|o| o.sources.iter())
                    .map(|s| UpstreamRef::new(s.table.clone(), column))
                    .collect();
                match &self.table {
                    // Declared schemas may be partial
                    Some(table) if passthrough.is_empty() => {
                        BTreeSet::from([UpstreamRef::new(table.clone(), column)])
                    }
                    _ => passthrough,
                }
            }
            Columns::Unknown => match &self.table {
                Some(table) => BTreeSet::from([UpstreamRef::new(table.clone(), column)]),
                None => BTreeSet::new(),
            },
        }
    }

    /// Outputs produced by `*` over this relation
    fn expand(&self) -> Vec<Output> {
        match (&self.columns, &self.table) {
            (Columns::Known(outputs), _) => outputs.clone(),
            (Columns::Unknown, Some(table)) => vec![Output::wildcard(table)],
            (Columns::Unknown, None) => Vec::new(),
        }
    }
}

/// Relations of a FROM clause plus the columns merged by `USING`
#[derive(Debug, Default)]
struct Scope {
    relations: Vec<Relation>,
    /// Lowercased `USING` column names
    using: HashSet<String>,
}

impl Scope {
    fn find(&self, qualifier: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.matches_qualifier(qualifier))
    }

    /// Resolve one column reference against the relations in scope
    fn resolve(&self, qualifier: Option<&str>, column: &str) -> BTreeSet<UpstreamRef> {
        if let Some(qualifier) = qualifier {
            return match self.find(qualifier) {
                Some(relation) => relation.lookup(column),
                None => BTreeSet::new(),
            };
        }

        if self.using.contains(&column.to_lowercase()) {
            return self
                .relations
                .iter()
                .filter(|r| r.declares(column) || r.has_wildcard())
                .flat_map(|r| r.lookup(column))
                .collect();
        }
        if let Some(relation) = self.relations.iter().find(|r| r.declares(column)) {
            return relation.lookup(column);
        }
        if let [only] = self.relations.as_slice() {
            return only.lookup(column);
        }
        // A single relation with unknown columns can be the only provider
        let mut open = self.relations.iter().filter(|r| r.has_wildcard());
        match (open.next(), open.next()) {
            (Some(relation), None) => relation.lookup(column),
            _ => BTreeSet::new(),
        }
    }

    /// Outputs of an unqualified `*`; `USING` columns appear once
    fn expand_all(&self) -> Vec<Output> {
        let mut outputs: Vec<Output> = Vec::new();
        for out in self.relations.iter().flat_map(Relation::expand) {
            if self.using.contains(&out.name.to_lowercase()) {
                if let Some(existing) = outputs
                    .iter_mut()
                    .find(|o| o.name.eq_ignore_ascii_case(&out.name))
                {
                    existing.sources.extend(out.sources);
                    continue;
                }
            }
            outputs.push(out);
        }
        outputs
    }
}

/// Collects the sources of an expression.
///
/// Column references are resolved against the enclosing scope; a nested query
/// contributes the sources of its own outputs.
struct ExprSources<'r, 'a> {
    resolver: &'r Resolver<'a>,
    scope: &'r Scope,
    ctes: &'r Ctes,
    depth: usize,
    sources: BTreeSet<UpstreamRef>,
}

impl Visitor for ExprSources<'_, '_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            for out in self.resolver.query(query, self.ctes) {
                self.sources.extend(out.sources);
            }
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.depth = self.depth.saturating_sub(1);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.depth > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            Expr::Identifier(ident) => {
                self.sources.extend(self.scope.resolve(None, &ident.value));
            }
            Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
                let column = &idents[idents.len() - 1].value;
                let qualifier = idents[..idents.len() - 1]
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                self.sources.extend(self.scope.resolve(Some(&qualifier), column));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

struct Resolver<'a> {
    schema: &'a Schema,
}

impl Resolver<'_> {
    fn query(&self, query: &Query, outer: &Ctes) -> Vec<Output> {
        let mut ctes = outer.clone();
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let outputs = apply_column_aliases(self.query(&cte.query, &ctes), &cte.alias);
                ctes.insert(cte.alias.name.value.to_lowercase(), outputs);
            }
        }
        self.set_expr(&query.body, &ctes)
    }

    fn set_expr(&self, body: &SetExpr, ctes: &Ctes) -> Vec<Output> {
        match body {
            SetExpr::Select(select) => self.select(select, ctes),
            SetExpr::Query(query) => self.query(query, ctes),
            SetExpr::SetOperation { left, right, .. } => {
                // Names come from the left branch, sources merge by position
                let mut outputs = self.set_expr(left, ctes);
                let right = self.set_expr(right, ctes);
                for (out, other) in outputs.iter_mut().zip(right) {
                    out.sources.extend(other.sources);
                }
                outputs
            }
            _ => Vec::new(),
        }
    }

    fn select(&self, select: &Select, ctes: &Ctes) -> Vec<Output> {
        let mut scope = Scope::default();
        for table in &select.from {
            self.table_with_joins(table, ctes, &mut scope);
        }

        let mut outputs = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => outputs.push(Output {
                    name: output_name(expr),
                    sources: self.expr_sources(expr, &scope, ctes),
                }),
                SelectItem::ExprWithAlias { expr, alias } => outputs.push(Output {
                    name: alias.value.clone(),
                    sources: self.expr_sources(expr, &scope, ctes),
                }),
                SelectItem::Wildcard(_) => outputs.extend(scope.expand_all()),
                SelectItem::QualifiedWildcard(kind, _) => {
                    let SelectItemQualifiedWildcardKind::ObjectName(name) = kind else {
                        continue;
                    };
                    if let Some(relation) = scope.find(&object_name_to_string(name)) {
                        outputs.extend(relation.expand());
                    }
                }
            }
        }
        outputs
    }

    fn table_with_joins(&self, twj: &TableWithJoins, ctes: &Ctes, scope: &mut Scope) {
        self.table_factor(&twj.relation, ctes, scope);
        for join in &twj.joins {
            self.table_factor(&join.relation, ctes, scope);
            if let Some(JoinConstraint::Using(columns)) = join_constraint(&join.join_operator) {
                for column in columns {
                    let name = object_name_to_string(column);
                    let last = name.rsplit('.').next().unwrap_or(&name);
                    scope.using.insert(last.to_lowercase());
                }
            }
        }
    }

    fn table_factor(&self, factor: &TableFactor, ctes: &Ctes, scope: &mut Scope) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                scope
                    .relations
                    .push(self.table_relation(name, alias.as_ref(), ctes));
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let outputs = self.query(subquery, ctes);
                let (binding, outputs) = match alias {
                    Some(a) => (a.name.value.clone(), apply_column_aliases(outputs, a)),
                    None => (String::new(), outputs),
                };
                scope.relations.push(Relation {
                    binding,
                    table: None,
                    columns: Columns::Known(outputs),
                });
            }
            TableFactor::NestedJoin {
                table_with_joins,
                alias,
            } => {
                let mut inner = Scope::default();
                self.table_with_joins(table_with_joins, ctes, &mut inner);
                match alias {
                    Some(a) => scope.relations.push(Relation {
                        binding: a.name.value.clone(),
                        table: None,
                        columns: Columns::Known(inner.expand_all()),
                    }),
                    None => {
                        scope.relations.extend(inner.relations);
                        scope.using.extend(inner.using);
                    }
                }
            }
            _ => {}
        }
    }

    fn table_relation(&self, name: &ObjectName, alias: Option<&TableAlias>, ctes: &Ctes) -> Relation {
        let written = object_name_to_string(name);
        let binding = alias
            .map(|a| a.name.value.clone())
            .unwrap_or_else(|| written.clone());

        if let Some(outputs) = ctes.get(&written.to_lowercase()) {
            return Relation {
                binding,
                table: None,
                columns: Columns::Known(outputs.clone()),
            };
        }

        match self.schema.table(&written) {
            Some((table, cols)) => {
                let outputs = cols
                    .iter()
                    .map(|c| Output {
                        name: c.name.clone(),
                        sources: BTreeSet::from([UpstreamRef::new(table, c.name.clone())]),
                    })
                    .collect();
                Relation {
                    binding,
                    table: Some(table.to_string()),
                    columns: Columns::Known(outputs),
                }
            }
            None => Relation {
                binding,
                table: Some(written),
                columns: Columns::Unknown,
            },
        }
    }

    /// Leaf sources of every column referenced in `expr`
    fn expr_sources(&self, expr: &Expr, scope: &Scope, ctes: &Ctes) -> BTreeSet<UpstreamRef> {
        let mut collector = ExprSources {
            resolver: self,
            scope,
            ctes,
            depth: 0,
            sources: BTreeSet::new(),
        };
        let _ = expr.visit(&mut collector);
        collector.sources
    }
}

fn join_constraint(op: &JoinOperator) -> Option<&JoinConstraint> {
    match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c) => Some(c),
        _ => None,
    }
}

/// Rename outputs positionally by `alias (c1, c2, ...)`
fn apply_column_aliases(mut outputs: Vec<Output>, alias: &TableAlias) -> Vec<Output> {
    for (out, col) in outputs.iter_mut().zip(&alias.columns) {
        out.name = col.name.value.clone();
    }
    outputs
}

/// Output name of an unaliased projection expression
fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|i| i.value.clone())
            .unwrap_or_default(),
        Expr::Nested(inner) => output_name(inner),
        Expr::Cast { expr, .. } => output_name(expr),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
