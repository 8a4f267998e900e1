//! Query emission.
//!
//! Turns a validated intent, its resolved time window and join plan into a
//! structured [`Query`]. Catalog SQL fragments go through
//! [`catalog_expr`](crate::sql::catalog_expr); intent filter values only ever
//! become literals or placeholders.

use chrono::NaiveDate;

use super::join_path::JoinPlan;
use super::{PlanError, PlanResult};
use crate::catalog::{Catalog, DataType, Dimension, JoinEdge, JoinKind, Metric, TableRef};
use crate::intent::{Filter, FilterOperator, FilterValue, QueryIntent, ScalarValue};
use crate::sql::catalog_expr;
use crate::sql::query::TableRef as SqlTableRef;
use crate::sql::{
    count_distinct, func, lit_date, table_col, Dialect, Expr, ExprExt, IdentQuoting, JoinType,
    Literal, Query, SelectExpr,
};
use crate::time_range::TimeWindow;

/// How the emitted query is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub dialect: Dialect,
    pub quoting: IdentQuoting,
    /// Bind filter values as placeholders instead of inline literals.
    pub parameterize: bool,
    /// Sort rows by every requested dimension, ascending.
    pub order_by_dimensions: bool,
}

/// Output of [`emit`].
#[derive(Debug, Clone)]
pub struct Emitted {
    pub query: Query,
    pub sql: String,
    /// Bound values in placeholder order. Empty unless parameterized.
    pub params: Vec<Literal>,
}

/// Build and render the query for `intent`.
pub fn emit(
    catalog: &Catalog,
    intent: &QueryIntent,
    window: Option<&TimeWindow>,
    plan: &JoinPlan,
    options: &RenderOptions,
) -> PlanResult<Emitted> {
    let metric = catalog.lookup_metric(&intent.metric)?;
    let mut emitter = Emitter {
        options,
        names: TableNames::new(std::iter::once(&metric.table).chain(plan.joined_tables())),
        params: Vec::new(),
    };

    let dimensions = intent
        .dimensions
        .iter()
        .map(|name| catalog.lookup_dimension(name))
        .collect::<Result<Vec<_>, _>>()?;

    // SELECT
    let mut select = Vec::with_capacity(dimensions.len() + 1);
    let mut group_by = Vec::with_capacity(dimensions.len());
    for dimension in &dimensions {
        let expr = emitter.dimension_expr(dimension)?;
        select.push(match &dimension.expression {
            Some(_) => expr.clone().alias(&dimension.name),
            None => SelectExpr::new(expr.clone()),
        });
        group_by.push(expr);
    }
    let aggregate = emitter.aggregate_expr(metric)?;
    select.push(aggregate.clone().alias(&metric.name));

    // FROM / JOIN
    let mut query = Query::new()
        .select(select)
        .from(emitter.names.sql_table(&metric.table));
    for step in &plan.steps {
        let on = catalog_expr::condition_expr(
            &step.edge.on_condition,
            |table| emitter.names.rename(table, &step.edge),
            options.dialect,
            options.quoting,
        )
        .map_err(|e| PlanError::InvalidExpression {
            owner: format!("join {}", step.edge),
            message: e.to_string(),
        })?;
        let join_type = match step.edge.kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::Left,
        };
        query = query.join(join_type, emitter.names.sql_table(&step.joined), on);
    }

    // WHERE: time window first, then dimension filters
    if let Some(window) = window {
        let column = catalog
            .time_column_for(metric)
            .ok_or_else(|| PlanError::NoTimeColumn {
                table: metric.table.clone(),
            })?;
        let date = table_col(emitter.names.name_of(&metric.table), column);
        query = query.filter(
            date.clone()
                .gte(lit_date(window.start))
                .and(date.lt(lit_date(window.end))),
        );
    }
    for filter in intent.filters.iter().filter(|f| f.target != metric.name) {
        let dimension = catalog.lookup_dimension(&filter.target)?;
        let target = emitter.dimension_expr(dimension)?;
        let is_date = dimension.data_type == DataType::Date;
        query = query.filter(emitter.predicate(filter, target, is_date)?);
    }

    // GROUP BY / HAVING / ORDER BY
    if options.order_by_dimensions {
        query = query.order_by(group_by.clone());
    }
    if !group_by.is_empty() {
        query = query.group_by(group_by);
    }
    for filter in intent.filters.iter().filter(|f| f.target == metric.name) {
        query = query.having(emitter.predicate(filter, aggregate.clone(), false)?);
    }

    // LIMIT
    if let Some(limit) = intent.limit.and_then(|n| u64::try_from(n).ok()) {
        query = query.limit(limit);
    }

    let sql = query.to_sql_with(options.dialect, options.quoting);
    Ok(Emitted {
        query,
        sql,
        params: emitter.params,
    })
}

struct Emitter<'a> {
    options: &'a RenderOptions,
    names: TableNames,
    params: Vec<Literal>,
}

impl Emitter<'_> {
    fn dimension_expr(&self, dimension: &Dimension) -> PlanResult<Expr> {
        catalog_expr::column_expr(
            dimension.sql_text(),
            self.names.name_of(&dimension.table),
            self.options.dialect,
            self.options.quoting,
        )
        .map_err(|e| PlanError::InvalidExpression {
            owner: format!("dimension '{}'", dimension.name),
            message: e.to_string(),
        })
    }

    fn aggregate_expr(&self, metric: &Metric) -> PlanResult<Expr> {
        let arg = catalog_expr::column_expr(
            &metric.expression,
            self.names.name_of(&metric.table),
            self.options.dialect,
            self.options.quoting,
        )
        .map_err(|e| PlanError::InvalidExpression {
            owner: format!("metric '{}'", metric.name),
            message: e.to_string(),
        })?;

        Ok(if metric.aggregation.is_distinct() {
            count_distinct(arg)
        } else {
            func(metric.aggregation.function_name(), vec![arg])
        })
    }

    fn predicate(&mut self, filter: &Filter, target: Expr, is_date: bool) -> PlanResult<Expr> {
        let values = match &filter.value {
            FilterValue::Scalar(v) => std::slice::from_ref(v),
            FilterValue::List(vs) => vs.as_slice(),
        };
        let mut operands = Vec::with_capacity(values.len());
        for value in values {
            let literal = to_literal(filter, value, is_date)?;
            operands.push(self.bind(literal));
        }

        if filter.operator.takes_list() {
            return Ok(match filter.operator {
                FilterOperator::NotIn => target.not_in_list(operands),
                _ => target.in_list(operands),
            });
        }

        let operand = operands
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::InvalidExpression {
                owner: format!("filter on '{}'", filter.target),
                message: format!("operator '{}' requires a value", filter.operator),
            })?;

        Ok(match filter.operator {
            FilterOperator::Eq => target.eq(operand),
            FilterOperator::Neq => target.ne(operand),
            FilterOperator::Gt => target.gt(operand),
            FilterOperator::Lt => target.lt(operand),
            FilterOperator::Gte => target.gte(operand),
            FilterOperator::Lte => target.lte(operand),
            FilterOperator::In => target.in_list(vec![operand]),
            FilterOperator::NotIn => target.not_in_list(vec![operand]),
        })
    }

    /// Inline `literal`, or record it as the next bound parameter.
    fn bind(&mut self, literal: Literal) -> Expr {
        if self.options.parameterize {
            self.params.push(literal);
            Expr::Placeholder(self.params.len())
        } else {
            Expr::Literal(literal)
        }
    }
}

fn to_literal(filter: &Filter, value: &ScalarValue, is_date: bool) -> PlanResult<Literal> {
    Ok(match value {
        ScalarValue::Bool(b) => Literal::Bool(*b),
        ScalarValue::Int(n) => Literal::Int(*n),
        ScalarValue::Float(x) if x.is_finite() => Literal::Float(*x),
        ScalarValue::Float(x) => {
            return Err(PlanError::InvalidExpression {
                owner: format!("filter on '{}'", filter.target),
                message: format!("non-finite number {}", x),
            })
        }
        ScalarValue::Text(s) if is_date => match s.parse::<NaiveDate>() {
            Ok(date) => Literal::Date(date),
            Err(_) => Literal::String(s.clone()),
        },
        ScalarValue::Text(s) => Literal::String(s.clone()),
    })
}

/// The name each table goes by inside one query.
///
/// A table is referred to by its bare name unless another table in the same
/// query shares it. Tables that collide are aliased as `schema_table`, or
/// `catalog_schema_table` when the schema collides too, and every column
/// reference uses the alias.
struct TableNames {
    entries: Vec<(TableRef, String)>,
}

impl TableNames {
    fn new<'t>(tables: impl IntoIterator<Item = &'t TableRef>) -> Self {
        let tables: Vec<&TableRef> = tables.into_iter().collect();
        let mut entries: Vec<(TableRef, String)> = Vec::with_capacity(tables.len());

        for table in &tables {
            let same_name = tables.iter().filter(|t| t.table == table.table).count();
            let same_schema = tables
                .iter()
                .filter(|t| t.table == table.table && t.schema == table.schema)
                .count();
            let base = if same_name == 1 {
                table.table.clone()
            } else if same_schema == 1 {
                alias_of(&[&table.schema, &table.table])
            } else {
                alias_of(&[&table.catalog_id, &table.schema, &table.table])
            };

            // An alias may still clash with another table's bare name
            let mut name = base.clone();
            let mut n = 2;
            while entries.iter().any(|(_, used)| *used == name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            entries.push(((*table).clone(), name));
        }

        Self { entries }
    }

    fn name_of<'a>(&'a self, table: &'a TableRef) -> &'a str {
        self.entries
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, name)| name.as_str())
            .unwrap_or(table.table.as_str())
    }

    fn sql_table(&self, table: &TableRef) -> SqlTableRef {
        let mut sql = SqlTableRef::new(&table.table);
        if !table.schema.is_empty() {
            sql = sql.with_schema(&table.schema);
        }
        let name = self.name_of(table);
        if name != table.table {
            sql = sql.with_alias(name);
        }
        sql
    }

    /// Map a table reference written in `edge`'s condition to its name in
    /// the query. When the reference fits several tables, only the edge's
    /// own endpoints are considered.
    fn rename(&self, written: &[&str], edge: &JoinEdge) -> Option<String> {
        let reference = written.join(".");
        let candidates: Vec<&(TableRef, String)> = self
            .entries
            .iter()
            .filter(|(t, _)| t.matches(&reference))
            .collect();
        let candidates: Vec<&(TableRef, String)> = if candidates.len() > 1 {
            candidates
                .into_iter()
                .filter(|(t, _)| *t == edge.from || *t == edge.to)
                .collect()
        } else {
            candidates
        };

        match candidates.as_slice() {
            [(_, name)] => Some(name.clone()),
            _ => None,
        }
    }
}

fn alias_of(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
