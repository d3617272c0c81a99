//! Compiles query-engine predicates into SQL over the `doc` column.
//!
//! Field paths are compile-time constants from the resource definitions, so
//! they are inlined as literals. Every client-supplied value is bound as a
//! positional `?` parameter, in the order its placeholder appears.

use marquee_core::{
  query::{Field, Order, Predicate, Scalar},
  stats::Dimension,
};
use rusqlite::types::Value;

/// A `WHERE` fragment and its bound parameters.
#[derive(Debug, Default)]
pub struct Clause {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// AND together `terms`. An empty conjunction matches everything.
pub fn compile(terms: &[Predicate]) -> Clause {
  let mut params = Vec::new();
  let parts: Vec<String> = terms.iter().map(|t| predicate(t, &mut params)).collect();
  let sql = if parts.is_empty() { "1 = 1".to_owned() } else { parts.join(" AND ") };
  Clause { sql, params }
}

pub fn order_by(field: Field, order: Order) -> String {
  let dir = match order {
    Order::Asc => "ASC",
    Order::Desc => "DESC",
  };
  format!("{} {dir}, id ASC", scalar(path_of(field)))
}

/// SQL expression for a scalar path. Audit fields use their mirrored
/// columns.
pub fn scalar(path: &str) -> String {
  match path {
    "$.createdAt" => "created_at".to_owned(),
    "$.updatedAt" => "updated_at".to_owned(),
    "$.isActive" => "is_active".to_owned(),
    "$.createdBy" => "created_by".to_owned(),
    p => format!("json_extract(doc, '{p}')"),
  }
}

pub fn path_of(field: Field) -> &'static str {
  match field {
    Field::At(path) | Field::Each(path) => path,
    Field::EachMember { array, .. } => array,
  }
}

/// Rows of a single `v` column holding each value `dimension` yields for an
/// active document of `table`.
pub fn dimension_source(table: &str, dimension: Dimension) -> String {
  match dimension {
    Dimension::Value(Field::At(path)) => {
      format!("SELECT {} AS v FROM {table} WHERE is_active = 1", scalar(path))
    }
    Dimension::Value(Field::Each(path)) => format!(
      "SELECT j.value AS v FROM {table}, json_each({table}.doc, '{path}') AS j \
       WHERE {table}.is_active = 1"
    ),
    Dimension::Value(Field::EachMember { array, member }) => format!(
      "SELECT json_extract(j.value, '{member}') AS v \
       FROM {table}, json_each({table}.doc, '{array}') AS j WHERE {table}.is_active = 1"
    ),
    Dimension::Year(field) => format!(
      "SELECT substr({}, 1, 4) AS v FROM {table} WHERE is_active = 1",
      scalar(path_of(field))
    ),
  }
}

fn predicate(p: &Predicate, params: &mut Vec<Value>) -> String {
  match p {
    Predicate::Active(flag) => {
      params.push(Value::Integer(i64::from(*flag)));
      "is_active = ?".to_owned()
    }
    Predicate::Equals(field, value) => {
      params.push(match value {
        Scalar::Text(s) => Value::Text(s.clone()),
        Scalar::Integer(n) => Value::Integer(*n),
      });
      test(*field, |e| format!("{e} = ?"))
    }
    Predicate::Contains(field, needle) => {
      params.push(Value::Text(like_pattern(needle)));
      test(*field, |e| format!("lower({e}) LIKE ? ESCAPE '\\'"))
    }
    Predicate::AtLeast(field, min) => {
      params.push(Value::Real(*min));
      test(*field, |e| format!("{e} >= ?"))
    }
    Predicate::Between { field, from, until } => {
      params.push(Value::Text(from.to_string()));
      params.push(Value::Text(until.to_string()));
      test(*field, |e| format!("({e} >= ? AND {e} < ?)"))
    }
    Predicate::AnyOf(group) if group.is_empty() => "0".to_owned(),
    Predicate::AnyOf(group) => {
      let parts: Vec<String> = group.iter().map(|g| predicate(g, params)).collect();
      format!("({})", parts.join(" OR "))
    }
  }
}

/// Apply `cond` to the scalar expression(s) `field` denotes. Array fields
/// match when any element satisfies the condition.
fn test(field: Field, cond: impl Fn(&str) -> String) -> String {
  match field {
    Field::At(path) => cond(&scalar(path)),
    Field::Each(path) => format!(
      "EXISTS (SELECT 1 FROM json_each(doc, '{path}') WHERE {})",
      cond("value")
    ),
    Field::EachMember { array, member } => format!(
      "EXISTS (SELECT 1 FROM json_each(doc, '{array}') WHERE {})",
      cond(&format!("json_extract(value, '{member}')"))
    ),
  }
}

/// `%needle%`, lowercased, with LIKE wildcards escaped.
fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.to_lowercase().chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}
