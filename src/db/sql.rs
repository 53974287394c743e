//! Rendering of [`TaskQuery`] filters into SQLite clauses.

use crate::query::{Column, Filter, TaskQuery, Value};
use crate::types::{SortOrder, format_timestamp};
use rusqlite::ToSql;

/// Bound parameters accumulated while rendering.
pub type Params = Vec<Box<dyn ToSql>>;

/// Borrow rendered parameters in the form rusqlite expects.
pub fn param_refs(params: &Params) -> Vec<&dyn ToSql> {
    params.iter().map(|b| b.as_ref()).collect()
}

fn bind(params: &mut Params, value: &Value) -> String {
    let text = match value {
        Value::Text(s) => s.clone(),
        Value::Time(t) => format_timestamp(t),
    };
    params.push(Box::new(text));
    format!("?{}", params.len())
}

/// Escape LIKE metacharacters so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Timestamp text in one canonical shape, so rows written as `T` or space
/// separated, with fractions or with an offset compare by time rather than by
/// their raw spelling.
fn normalized_time(expr: &str) -> String {
    format!("strftime('%Y-%m-%dT%H:%M:%f', {})", expr)
}

fn comparison(params: &mut Params, column: Column, op: &str, value: &Value) -> String {
    let slot = bind(params, value);
    if column.is_timestamp() {
        format!(
            "{} {} {}",
            normalized_time(column.as_str()),
            op,
            normalized_time(&slot)
        )
    } else {
        format!("{} {} {}", column.as_str(), op, slot)
    }
}

/// Render one filter, pushing its parameters.
pub fn render_filter(filter: &Filter, params: &mut Params) -> String {
    match filter {
        Filter::Eq(c, v) => comparison(params, *c, "=", v),
        Filter::Neq(c, v) => comparison(params, *c, "<>", v),
        Filter::Gt(c, v) => comparison(params, *c, ">", v),
        Filter::Gte(c, v) => comparison(params, *c, ">=", v),
        Filter::Lt(c, v) => comparison(params, *c, "<", v),
        Filter::Lte(c, v) => comparison(params, *c, "<=", v),
        Filter::In(c, set) => {
            if set.is_empty() {
                return "0".to_string();
            }
            let slots: Vec<String> = set
                .iter()
                .map(|s| bind(params, &Value::Text(s.clone())))
                .collect();
            format!("{} IN ({})", c.as_str(), slots.join(", "))
        }
        Filter::IsNull(c) => format!("{} IS NULL", c.as_str()),
        Filter::NotNull(c) => format!("{} IS NOT NULL", c.as_str()),
        Filter::ILike(c, needle) => {
            let slot = bind(params, &Value::Text(escape_like(needle)));
            let column = match c {
                Column::TaskId => "CAST(task_id AS TEXT)".to_string(),
                other => other.as_str().to_string(),
            };
            format!(
                "LOWER({}) LIKE '%' || LOWER({}) || '%' ESCAPE '\\'",
                column, slot
            )
        }
        Filter::Or(any) => {
            if any.is_empty() {
                return "0".to_string();
            }
            let parts: Vec<String> = any.iter().map(|f| render_filter(f, params)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// `WHERE` clause for the query's filters, or an empty string.
pub fn where_clause(query: &TaskQuery, params: &mut Params) -> String {
    if query.filters.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = query
        .filters
        .iter()
        .map(|f| render_filter(f, params))
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

/// `ORDER BY` and `LIMIT/OFFSET` suffix.
pub fn order_and_window(query: &TaskQuery) -> String {
    let start = normalized_time(Column::TaskStartDate.as_str());
    let mut sql = match query.order {
        Some(SortOrder::Asc) => format!(" ORDER BY {} ASC, task_id ASC", start),
        Some(SortOrder::Desc) => format!(" ORDER BY {} DESC, task_id ASC", start),
        None => " ORDER BY task_id ASC".to_string(),
    };
    if let Some(range) = query.range {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", range.limit, range.offset));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collection;

    #[test]
    fn renders_numbered_placeholders() {
        let query = TaskQuery::new(Collection::Checklist)
            .filter(Filter::Eq(Column::Name, Value::text("alice")))
            .filter(Filter::Or(vec![
                Filter::IsNull(Column::Status),
                Filter::Neq(Column::Status, Value::text("Yes")),
            ]))
            .filter(Filter::In(
                Column::Department,
                vec!["Sales".into(), "HR".into()],
            ));
        let mut params = Params::new();
        let sql = where_clause(&query, &mut params);
        assert_eq!(
            sql,
            " WHERE name = ?1 AND (status IS NULL OR status <> ?2) AND department IN (?3, ?4)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn empty_sets_render_false() {
        let mut params = Params::new();
        assert_eq!(render_filter(&Filter::In(Column::Name, vec![]), &mut params), "0");
        assert_eq!(render_filter(&Filter::Or(vec![]), &mut params), "0");
        assert!(params.is_empty());
    }

    #[test]
    fn timestamp_comparisons_are_normalized() {
        let at = crate::types::parse_timestamp("2025-06-10").unwrap();
        let mut params = Params::new();
        let sql = render_filter(
            &Filter::Gte(Column::TaskStartDate, Value::Time(at)),
            &mut params,
        );
        assert_eq!(
            sql,
            "strftime('%Y-%m-%dT%H:%M:%f', task_start_date) >= strftime('%Y-%m-%dT%H:%M:%f', ?1)"
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
