// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/other/#other-filter
//
// Both the legacy filter syntax (["==", "class", "river"]) and the expression
// syntax (["==", ["get", "class"], "river"]) are accepted. A filter that cannot
// be understood parses to `None`, which callers treat as "always visible".

use super::common::types::Attributes;
use super::expression::{normalize_key, parse_value, ExprTree};
use super::scope::Scope;
use super::value::Value;

use log::debug;
use serde_json::Value as Json;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterTree {
    True,
    False,
    Equal(ExprTree, Value),
    NotEqual(ExprTree, Value),
    Greater(ExprTree, Value),
    GreaterEq(ExprTree, Value),
    Less(ExprTree, Value),
    LessEq(ExprTree, Value),
    In(ExprTree, Vec<Value>),
    NotIn(ExprTree, Vec<Value>),
    Has(String),
    NotHas(String),
    All(Vec<FilterTree>),
    Any(Vec<FilterTree>),
    None(Vec<FilterTree>),
    // (filters, stops, key): filters[0] applies below stops[0], filters[i + 1]
    // applies from stops[i] up to (excluding) stops[i + 1].
    Step(Vec<FilterTree>, Vec<Value>, ExprTree),
}

impl FilterTree {
    pub fn parse(json: &Json) -> Option<FilterTree> {
        match json {
            Json::Bool(true) => Some(FilterTree::True),
            Json::Bool(false) => Some(FilterTree::False),
            Json::Array(token) => parse_array(token),
            other => {
                debug!("Unsupported filter: {}", other);
                None
            }
        }
    }

    pub fn evaluate(&self, attrs: &Attributes) -> bool {
        self.evaluate_in(&Scope::new(attrs))
    }

    pub(crate) fn evaluate_in(&self, scope: &Scope<'_>) -> bool {
        match self {
            FilterTree::True => true,
            FilterTree::False => false,
            FilterTree::Equal(key, value) => key
                .evaluate_in(scope)
                .map_or(false, |v| v.equals(value)),
            FilterTree::NotEqual(key, value) => key
                .evaluate_in(scope)
                .map_or(false, |v| !v.equals(value)),
            FilterTree::Greater(key, value) => {
                compare(key, value, scope, |o| o == Ordering::Greater)
            }
            FilterTree::GreaterEq(key, value) => {
                compare(key, value, scope, |o| o != Ordering::Less)
            }
            FilterTree::Less(key, value) => compare(key, value, scope, |o| o == Ordering::Less),
            FilterTree::LessEq(key, value) => {
                compare(key, value, scope, |o| o != Ordering::Greater)
            }
            FilterTree::In(key, values) => key
                .evaluate_in(scope)
                .map_or(false, |v| values.iter().any(|x| v.equals(x))),
            FilterTree::NotIn(key, values) => key
                .evaluate_in(scope)
                .map_or(true, |v| !values.iter().any(|x| v.equals(x))),
            FilterTree::Has(key) => scope.contains(key),
            FilterTree::NotHas(key) => !scope.contains(key),
            FilterTree::All(filters) => filters.iter().all(|f| f.evaluate_in(scope)),
            FilterTree::Any(filters) => filters.iter().any(|f| f.evaluate_in(scope)),
            FilterTree::None(filters) => filters.iter().all(|f| !f.evaluate_in(scope)),
            FilterTree::Step(filters, stops, key) => match key.evaluate_in(scope) {
                Some(value) => filters
                    .get(step_index(&value, stops))
                    .or_else(|| filters.last())
                    .map_or(false, |f| f.evaluate_in(scope)),
                None => false,
            },
        }
    }
}

/// Index of the branch selected by `value`: 0 below the first stop, `i + 1`
/// inside `[stops[i], stops[i + 1])`, `stops.len()` at or past the last stop.
pub(crate) fn step_index(value: &Value, stops: &[Value]) -> usize {
    stops
        .iter()
        .take_while(|stop| value.compare(stop) != Ordering::Less)
        .count()
}

fn compare(key: &ExprTree, value: &Value, scope: &Scope<'_>, test: fn(Ordering) -> bool) -> bool {
    key.evaluate_in(scope)
        .map_or(false, |v| test(v.compare(value)))
}

fn parse_array(token: &[Json]) -> Option<FilterTree> {
    let op = token.first()?.as_str()?;
    match op {
        "!" => {
            let inner = token.get(1)?;
            match inner.as_array() {
                Some(inner) => parse_negated(inner),
                None => FilterTree::parse(inner).map(|f| FilterTree::None(vec![f])),
            }
        }
        "all" | "any" | "none" => Some(parse_combinator(op, &token[1..])),
        "step" => parse_step(token),
        _ => parse_leaf(op, token),
    }
}

// "!" is folded into the wrapped form where the grammar has a direct inverse.
fn parse_negated(inner: &[Json]) -> Option<FilterTree> {
    let op = inner.first()?.as_str()?;
    match op {
        "all" | "any" => Some(parse_combinator("none", &inner[1..])),
        "none" => Some(parse_combinator("any", &inner[1..])),
        "has" => parse_leaf("!has", inner),
        "!has" => parse_leaf("has", inner),
        "in" => parse_leaf("!in", inner),
        "!in" => parse_leaf("in", inner),
        "==" => parse_leaf("!=", inner),
        "!=" => parse_leaf("==", inner),
        _ => parse_array(inner).map(|f| FilterTree::None(vec![f])),
    }
}

fn parse_combinator(op: &str, children: &[Json]) -> FilterTree {
    let filters: Vec<FilterTree> = children.iter().filter_map(FilterTree::parse).collect();
    if filters.is_empty() {
        return FilterTree::False;
    }
    match op {
        "all" => FilterTree::All(filters),
        "any" => FilterTree::Any(filters),
        _ => FilterTree::None(filters),
    }
}

// ["step", ["zoom"], <filter0>, 14, <filter1>, 16, <filter2>]
fn parse_step(token: &[Json]) -> Option<FilterTree> {
    let key = parse_key(token.get(1)?);
    let mut filters = vec![FilterTree::parse(token.get(2)?)?];
    let mut stops = vec![];
    for pair in token[3..].chunks_exact(2) {
        match (parse_value(&pair[0]), FilterTree::parse(&pair[1])) {
            (Some(stop), Some(filter)) => {
                stops.push(stop);
                filters.push(filter);
            }
            _ => debug!("Dropping step branch at {}", pair[0]),
        }
    }
    Some(FilterTree::Step(filters, stops, key))
}

fn parse_leaf(op: &str, token: &[Json]) -> Option<FilterTree> {
    match op {
        "has" | "!has" => {
            let key = get_key(token.get(1)?)?;
            Some(if op == "has" {
                FilterTree::Has(key)
            } else {
                FilterTree::NotHas(key)
            })
        }
        "in" | "!in" => {
            let key = parse_key(token.get(1)?);
            let values = parse_in_values(token);
            Some(if op == "in" {
                FilterTree::In(key, values)
            } else {
                FilterTree::NotIn(key, values)
            })
        }
        _ => {
            let build: fn(ExprTree, Value) -> FilterTree = match op {
                "==" => FilterTree::Equal,
                "!=" => FilterTree::NotEqual,
                ">" => FilterTree::Greater,
                ">=" => FilterTree::GreaterEq,
                "<" => FilterTree::Less,
                "<=" => FilterTree::LessEq,
                _ => {
                    debug!("Unknown filter operator: {}", op);
                    return None;
                }
            };
            let key = parse_key(token.get(1)?);
            let value = parse_value(token.get(2)?)?;
            Some(build(key, value))
        }
    }
}

// Legacy filters name the attribute directly: ["==", "class", "river"].
fn parse_key(json: &Json) -> ExprTree {
    match json.as_str() {
        Some(key) => ExprTree::Get(normalize_key(key)),
        None => ExprTree::parse(json),
    }
}

// ["get", "<key>"], ["zoom"] / ["geometry-type"], or a bare "<key>"
fn get_key(json: &Json) -> Option<String> {
    match json {
        Json::Array(array) if array.len() > 1 => array[1].as_str().map(String::from),
        Json::Array(array) => array.first()?.as_str().map(normalize_key),
        Json::String(key) => Some(normalize_key(key)),
        _ => None,
    }
}

// ["in", k, ["literal", [a, b]]], ["in", k, [a, b]] or ["in", k, a, b]
fn parse_in_values(token: &[Json]) -> Vec<Value> {
    match token.get(2) {
        Some(Json::Array(array)) => {
            if array.first().and_then(Json::as_str) == Some("literal") {
                array
                    .get(1)
                    .and_then(Json::as_array)
                    .map(|values| values.iter().filter_map(parse_value).collect())
                    .unwrap_or_default()
            } else {
                array.iter().filter_map(parse_value).collect()
            }
        }
        Some(_) => token[2..].iter().filter_map(parse_value).collect(),
        None => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(json: Json) -> FilterTree {
        FilterTree::parse(&json).expect("filter should parse")
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equal_filter_matches_attribute() {
        let filter = parse(json!(["==", ["get", "vt_code"], 5322]));
        assert!(filter.evaluate(&attrs(&[("vt_code", Value::Int(5322))])));
        assert!(!filter.evaluate(&attrs(&[("vt_code", Value::Int(5323))])));
        assert!(!filter.evaluate(&Attributes::new()));
    }

    #[test]
    fn legacy_string_key_is_a_lookup() {
        let filter = parse(json!(["==", "class", "river"]));
        assert_eq!(
            filter,
            FilterTree::Equal(ExprTree::Get("class".to_string()), Value::from("river"))
        );
        let filter = parse(json!(["==", "$type", "Polygon"]));
        assert!(filter.evaluate(&attrs(&[("$type", Value::from("Polygon"))])));
    }

    #[test]
    fn negated_has_becomes_not_has() {
        assert_eq!(
            parse(json!(["!", ["has", "k"]])),
            FilterTree::NotHas("k".to_string())
        );
        assert_eq!(
            parse(json!(["!", ["!has", "k"]])),
            FilterTree::Has("k".to_string())
        );
    }

    #[test]
    fn negated_all_becomes_none() {
        let a = json!(["==", ["get", "a"], 1]);
        let b = json!(["has", "b"]);
        assert_eq!(
            parse(json!(["!", ["all", a.clone(), b.clone()]])),
            FilterTree::None(vec![parse(a), parse(b)])
        );
    }

    #[test]
    fn negated_any_and_none_swap() {
        assert_eq!(
            parse(json!(["!", ["any", ["has", "a"], ["has", "b"]]])),
            FilterTree::None(vec![
                FilterTree::Has("a".to_string()),
                FilterTree::Has("b".to_string())
            ])
        );
        assert_eq!(
            parse(json!(["!", ["none", ["has", "a"]]])),
            FilterTree::Any(vec![FilterTree::Has("a".to_string())])
        );
    }

    #[test]
    fn not_has_on_missing_key_is_true() {
        assert!(parse(json!(["!has", "k"])).evaluate(&Attributes::new()));
        assert!(!parse(json!(["!has", "k"])).evaluate(&attrs(&[("k", Value::Int(1))])));
    }

    #[test]
    fn negated_in_and_equal_are_inverted() {
        assert!(matches!(
            parse(json!(["!", ["in", ["get", "k"], ["literal", [1, 2]]]])),
            FilterTree::NotIn(_, _)
        ));
        assert!(matches!(
            parse(json!(["!", ["==", ["get", "k"], 1]])),
            FilterTree::NotEqual(_, _)
        ));
    }

    #[test]
    fn negated_comparison_wraps_in_none() {
        let filter = parse(json!(["!", [">", ["get", "rank"], 5]]));
        assert!(matches!(filter, FilterTree::None(_)));
        assert!(filter.evaluate(&attrs(&[("rank", Value::Int(3))])));
        assert!(!filter.evaluate(&attrs(&[("rank", Value::Int(7))])));
        assert!(filter.evaluate(&Attributes::new()));
    }

    #[test]
    fn in_filter_accepts_literal_bare_and_legacy_lists() {
        for json in vec![
            json!(["in", ["get", "vt_code"], ["literal", [5101, 5103]]]),
            json!(["in", ["get", "vt_code"], [5101, 5103]]),
            json!(["in", "vt_code", 5101, 5103]),
        ] {
            let filter = parse(json);
            assert!(filter.evaluate(&attrs(&[("vt_code", Value::Int(5101))])));
            assert!(!filter.evaluate(&attrs(&[("vt_code", Value::Int(5102))])));
            assert!(filter.evaluate(&attrs(&[("vt_code", Value::Int(5103))])));
        }
    }

    #[test]
    fn not_in_passes_missing_keys() {
        let filter = parse(json!(["!in", "class", "river", "canal"]));
        assert!(filter.evaluate(&Attributes::new()));
        assert!(!filter.evaluate(&attrs(&[("class", Value::from("canal"))])));
    }

    #[test]
    fn missing_keys_fail_comparisons() {
        for op in &["==", "!=", ">", ">=", "<", "<="] {
            let filter = parse(json!([op, ["get", "missing"], 1]));
            assert!(!filter.evaluate(&Attributes::new()), "{}", op);
        }
    }

    #[test]
    fn comparison_operators() {
        let a = attrs(&[("vt_lvorder", Value::Int(4))]);
        assert!(parse(json!([">=", ["get", "vt_lvorder"], 4])).evaluate(&a));
        assert!(!parse(json!([">", ["get", "vt_lvorder"], 4])).evaluate(&a));
        assert!(parse(json!(["<=", ["get", "vt_lvorder"], 4])).evaluate(&a));
        assert!(parse(json!(["<", ["get", "vt_lvorder"], 4.5])).evaluate(&a));
    }

    #[test]
    fn combinators() {
        let a = attrs(&[("x", Value::Int(1))]);
        let any = parse(json!(["any", ["==", ["get", "x"], 0], ["==", ["get", "x"], 1]]));
        let none = parse(json!(["none", ["==", ["get", "x"], 0], ["==", ["get", "x"], 1]]));
        let all = parse(json!(["all", ["has", "x"], ["==", ["get", "x"], 1]]));
        assert!(any.evaluate(&a));
        assert!(!none.evaluate(&a));
        assert!(all.evaluate(&a));
    }

    #[test]
    fn empty_combinator_is_false() {
        assert_eq!(parse(json!(["all"])), FilterTree::False);
        assert_eq!(parse(json!(["any", ["bogus", 1]])), FilterTree::False);
    }

    #[test]
    fn step_uses_half_open_intervals() {
        let filter = FilterTree::Step(
            (0..4).map(|i| FilterTree::Has(format!("f{}", i))).collect(),
            vec![Value::Int(5), Value::Int(10), Value::Int(15)],
            ExprTree::Get("k".to_string()),
        );
        let pick = |v: i64| {
            (0..4)
                .find(|i| {
                    let flag = format!("f{}", i);
                    let a = attrs(&[("k", Value::Int(v)), (flag.as_str(), Value::Bool(true))]);
                    filter.evaluate(&a)
                })
                .expect("one branch should match")
        };
        assert_eq!(pick(4), 0);
        assert_eq!(pick(5), 1);
        assert_eq!(pick(9), 1);
        assert_eq!(pick(10), 2);
        assert_eq!(pick(15), 3);
        assert_eq!(pick(20), 3);
    }

    #[test]
    fn step_index_matches_boundaries() {
        let stops = vec![Value::Int(5), Value::Int(10), Value::Int(15)];
        assert_eq!(step_index(&Value::Int(4), &stops), 0);
        assert_eq!(step_index(&Value::Float(5.0), &stops), 1);
        assert_eq!(step_index(&Value::Int(10), &stops), 2);
        assert_eq!(step_index(&Value::Int(20), &stops), 3);
    }

    #[test]
    fn step_parses_boolean_branches() {
        let filter = parse(json!(["step", ["zoom"], false, 14, true]));
        assert!(!filter.evaluate(&attrs(&[("$zoom", Value::Float(13.0))])));
        assert!(filter.evaluate(&attrs(&[("$zoom", Value::Float(14.0))])));
        assert!(!filter.evaluate(&Attributes::new()));
    }

    #[test]
    fn unknown_forms_do_not_parse() {
        assert_eq!(FilterTree::parse(&json!(["within", {}])), None);
        assert_eq!(FilterTree::parse(&json!("river")), None);
        assert_eq!(FilterTree::parse(&json!([])), None);
    }
}
