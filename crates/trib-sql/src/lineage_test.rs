use super::*;

fn schema(tables: &[(&str, &[(&str, &str)])]) -> Schema {
    let mut schema = Schema::new();
    for (name, cols) in tables {
        schema.insert_table(*name, cols.iter().copied());
    }
    schema
}

fn upstream(lineage: &Lineage, column: &str) -> Vec<(String, String)> {
    lineage
        .column(column)
        .unwrap_or_else(|| panic!("missing column {column}"))
        .upstream
        .iter()
        .map(|u| (u.table.clone(), u.column.clone()))
        .collect()
}

fn refs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(t, c)| (t.to_string(), c.to_string()))
        .collect()
}

fn names(lineage: &Lineage) -> Vec<&str> {
    lineage.columns.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn test_nested_subqueries_with_using() {
    let schema = schema(&[
        ("table1", &[("a", "str"), ("b", "int64")]),
        ("table2", &[("a", "str"), ("c", "int64")]),
    ]);
    let sql = r#"
        select *
        from table1
        join (
            select *
            from (
                select *
                from table2
            ) t2
        ) t3
        using(a)
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(names(&lineage), vec!["a", "b", "c"]);
    assert_eq!(upstream(&lineage, "a"), refs(&[("table1", "a"), ("table2", "a")]));
    assert_eq!(upstream(&lineage, "b"), refs(&[("table1", "b")]));
    assert_eq!(upstream(&lineage, "c"), refs(&[("table2", "c")]));
}

#[test]
fn test_case_when_collects_all_referenced_columns() {
    let schema = schema(&[
        ("items", &[("item_id", "str"), ("price", "int64"), ("in_stock", "bool")]),
        ("orders", &[("item_id", "str"), ("somecol", "int64")]),
    ]);
    let sql = r#"
        SELECT
            items.item_id as item_id,
            CASE
                WHEN price > 1000 AND t2.somecol < 250 THEN 'high'
                WHEN price > 100 THEN 'medium'
                ELSE 'low'
            END as price_category
        FROM items
        JOIN orders as t2 on items.item_id = t2.item_id
        WHERE in_stock = true
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(names(&lineage), vec!["item_id", "price_category"]);
    assert_eq!(upstream(&lineage, "item_id"), refs(&[("items", "item_id")]));
    assert_eq!(
        upstream(&lineage, "price_category"),
        refs(&[("items", "price"), ("orders", "somecol")])
    );
}

#[test]
fn test_simple_join_with_aliases() {
    let schema = schema(&[
        ("table1", &[("id", "str"), ("col1", "int64")]),
        ("table2", &[("id", "str"), ("col2", "int64")]),
    ]);
    let sql = "SELECT t1.col1, t2.col2 FROM table1 t1 JOIN table2 t2 ON t1.id = t2.id";
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(upstream(&lineage, "col1"), refs(&[("table1", "col1")]));
    assert_eq!(upstream(&lineage, "col2"), refs(&[("table2", "col2")]));
}

#[test]
fn test_qualified_wildcard_and_renamed_columns() {
    let schema = schema(&[
        ("table1", &[("a", "str"), ("b", "int64")]),
        ("table2", &[("a", "str"), ("c", "int64")]),
    ]);
    let sql = r#"
        select t1.*, t2.a as b2, t2.c as c2
        from table1 t1
        join table2 t2 on t1.a = t2.a
    "#;
    let lineage = column_lineage(sql, Dialect::DuckDb, &schema).unwrap();

    assert_eq!(names(&lineage), vec!["a", "b", "b2", "c2"]);
    assert_eq!(upstream(&lineage, "b2"), refs(&[("table2", "a")]));
    assert_eq!(upstream(&lineage, "c2"), refs(&[("table2", "c")]));
}

#[test]
fn test_aggregates_keep_argument_columns() {
    let schema = schema(&[(
        "orders",
        &[("customer_id", "str"), ("order_id", "str"), ("order_amount", "int64")],
    )]);
    let sql = r#"
        SELECT
            customer_id,
            SUM(order_amount) as total_amount,
            COUNT(order_id) as order_count
        FROM orders
        GROUP BY customer_id
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(names(&lineage), vec!["customer_id", "total_amount", "order_count"]);
    assert_eq!(upstream(&lineage, "total_amount"), refs(&[("orders", "order_amount")]));
    assert_eq!(upstream(&lineage, "order_count"), refs(&[("orders", "order_id")]));
}

#[test]
fn test_scalar_subquery_uses_inner_scope() {
    let schema = schema(&[
        ("employees", &[("emp_id", "str")]),
        ("salaries", &[("emp_id", "str"), ("salary", "int64")]),
    ]);
    let sql = r#"
        SELECT
            emp_id,
            (SELECT AVG(salary) FROM salaries WHERE salaries.emp_id = employees.emp_id) as avg_salary
        FROM employees
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(upstream(&lineage, "emp_id"), refs(&[("employees", "emp_id")]));
    assert_eq!(upstream(&lineage, "avg_salary"), refs(&[("salaries", "salary")]));
}

#[test]
fn test_union_merges_positionally() {
    let schema = schema(&[
        ("customers", &[("id", "str"), ("name", "str")]),
        ("employees", &[("id", "str"), ("full_name", "str")]),
    ]);
    let sql = "SELECT id, name FROM customers UNION ALL SELECT id, full_name FROM employees";
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(names(&lineage), vec!["id", "name"]);
    assert_eq!(upstream(&lineage, "id"), refs(&[("customers", "id"), ("employees", "id")]));
    assert_eq!(
        upstream(&lineage, "name"),
        refs(&[("customers", "name"), ("employees", "full_name")])
    );
}

#[test]
fn test_self_join_deduplicates() {
    let schema = schema(&[("employees", &[("id", "str"), ("manager_id", "str")])]);
    let sql = r#"
        SELECT e1.id, coalesce(e2.manager_id, e1.manager_id) as manager_id
        FROM employees e1
        JOIN employees e2 ON e1.manager_id = e2.id
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(upstream(&lineage, "manager_id"), refs(&[("employees", "manager_id")]));
}

#[test]
fn test_literals_and_functions_without_columns() {
    let schema = schema(&[
        ("users", &[("first_name", "str"), ("last_name", "str")]),
    ]);
    let sql = r#"
        SELECT
            CONCAT(first_name, ' ', last_name) as full_name,
            NOW() as current_time,
            'fixed' as fixed
        FROM users
    "#;
    let lineage = column_lineage(sql, Dialect::BigQuery, &schema).unwrap();

    assert_eq!(
        upstream(&lineage, "full_name"),
        refs(&[("users", "first_name"), ("users", "last_name")])
    );
    assert!(upstream(&lineage, "current_time").is_empty());
    assert!(upstream(&lineage, "fixed").is_empty());
}

#[test]
fn test_cte_passthrough() {
    let schema = schema(&[("raw_orders", &[("id", "int"), ("amount", "double")])]);
    let sql = r#"
        with base as (select id, amount * 100 as cents from raw_orders),
             doubled as (select id, cents * 2 as twice from base)
        select d.id, d.twice from doubled d
    "#;
    let lineage = column_lineage(sql, Dialect::DuckDb, &schema).unwrap();

    assert_eq!(upstream(&lineage, "id"), refs(&[("raw_orders", "id")]));
    assert_eq!(upstream(&lineage, "twice"), refs(&[("raw_orders", "amount")]));
}

#[test]
fn test_unknown_table_star_is_unexpanded() {
    let lineage = column_lineage("select * from raw.events", Dialect::DuckDb, &Schema::new()).unwrap();
    assert_eq!(names(&lineage), vec!["*"]);
    assert_eq!(upstream(&lineage, "*"), refs(&[("raw.events", "*")]));
}

#[test]
fn test_unknown_table_columns_are_attributed() {
    let sql = "select e.id, upper(kind) as kind from raw.events e";
    let lineage = column_lineage(sql, Dialect::DuckDb, &Schema::new()).unwrap();
    assert_eq!(upstream(&lineage, "id"), refs(&[("raw.events", "id")]));
    assert_eq!(upstream(&lineage, "kind"), refs(&[("raw.events", "kind")]));
}

#[test]
fn test_schema_qualified_table_referenced_by_last_part() {
    let schema = schema(&[("analytics.people", &[("id", "int"), ("name", "varchar")])]);
    let sql = "select people.name from analytics.people";
    let lineage = column_lineage(sql, Dialect::DuckDb, &schema).unwrap();
    assert_eq!(upstream(&lineage, "name"), refs(&[("analytics.people", "name")]));
}

#[test]
fn test_ambiguous_unqualified_column_is_unresolved() {
    let sql = "select id from a join b on a.x = b.x";
    let lineage = column_lineage(sql, Dialect::DuckDb, &Schema::new()).unwrap();
    assert!(upstream(&lineage, "id").is_empty());
}

#[test]
fn test_non_query_statement_has_no_lineage() {
    let lineage = column_lineage("create table t (id int)", Dialect::DuckDb, &Schema::new()).unwrap();
    assert!(lineage.columns.is_empty());
}

#[test]
fn test_parse_error_is_returned() {
    let result = column_lineage("selec id from t", Dialect::DuckDb, &Schema::new());
    assert!(matches!(result, Err(crate::SqlError::ParseError { .. })));
}

#[test]
fn test_column_missing_from_partial_schema_is_attributed_to_table() {
    let schema = schema(&[("table2", &[("id", "int"), ("age", "int")])]);
    let lineage = column_lineage("select name from table2", Dialect::DuckDb, &schema).unwrap();
    assert_eq!(upstream(&lineage, "name"), refs(&[("table2", "name")]));
}
