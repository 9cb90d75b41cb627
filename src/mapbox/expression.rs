// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/expressions/
//
// Paint and layout properties are parsed once into an `ExprTree` and evaluated
// per feature. Forms that are not understood parse to `ExprTree::Empty`, which
// evaluates to no value; the style accessors substitute the property default.

use super::color::{looks_like_color, parse_color};
use super::common::types::{Attributes, TYPE_KEY, ZOOM_KEY};
use super::filter::{step_index, FilterTree};
use super::scope::Scope;
use super::value::Value;

use log::debug;
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Modulo,
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<BinaryOperator> {
        match symbol {
            "%" => Some(BinaryOperator::Modulo),
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Subtract),
            "*" => Some(BinaryOperator::Multiply),
            "/" => Some(BinaryOperator::Divide),
            "^" => Some(BinaryOperator::Pow),
            _ => None,
        }
    }

    pub fn apply(self, lhs: &Value, rhs: &Value) -> Value {
        match self {
            BinaryOperator::Modulo => lhs.modulo(rhs),
            BinaryOperator::Add => lhs.add(rhs),
            BinaryOperator::Subtract => lhs.subtract(rhs),
            BinaryOperator::Multiply => lhs.multiply(rhs),
            BinaryOperator::Divide => lhs.divide(rhs),
            BinaryOperator::Pow => lhs.pow(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationKind {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprTree {
    Empty,
    Static(Value),
    Get(String),
    BinaryOp(BinaryOperator, Box<ExprTree>, Box<ExprTree>),
    Case(Vec<(FilterTree, ExprTree)>, Box<ExprTree>),
    Match(Box<ExprTree>, Vec<(Vec<Value>, ExprTree)>, Box<ExprTree>),
    Step(Vec<ExprTree>, Vec<Value>, Box<ExprTree>),
    Interpolate {
        kind: InterpolationKind,
        key: Box<ExprTree>,
        stops: Vec<(f64, ExprTree)>,
        factor: f64,
    },
    Let(Vec<(String, ExprTree)>, Box<ExprTree>),
}

impl ExprTree {
    pub fn parse(json: &Json) -> ExprTree {
        match json {
            Json::Array(token) => parse_array(token),
            Json::Object(_) => parse_legacy_function(json),
            _ => parse_value(json).map_or(ExprTree::Empty, ExprTree::Static),
        }
    }

    pub fn evaluate(&self, attrs: &Attributes) -> Option<Value> {
        self.evaluate_in(&Scope::new(attrs))
    }

    pub(crate) fn evaluate_in(&self, scope: &Scope<'_>) -> Option<Value> {
        match self {
            ExprTree::Empty => None,
            ExprTree::Static(value) => Some(value.clone()),
            ExprTree::Get(key) => scope
                .get(key)
                .or_else(|| pseudo_key(key).and_then(|k| scope.get(k)))
                .cloned(),
            ExprTree::BinaryOp(op, lhs, rhs) => {
                let lhs = lhs.evaluate_in(scope)?;
                let rhs = rhs.evaluate_in(scope)?;
                Some(op.apply(&lhs, &rhs))
            }
            ExprTree::Case(branches, default) => branches
                .iter()
                .find(|(filter, _)| filter.evaluate_in(scope))
                .map_or(default.as_ref(), |(_, expr)| expr)
                .evaluate_in(scope),
            ExprTree::Match(key, branches, default) => {
                let input = key.evaluate_in(scope);
                let branch = input.and_then(|input| {
                    branches
                        .iter()
                        .find(|(labels, _)| labels.iter().any(|l| input.equals(l)))
                });
                branch
                    .map_or(default.as_ref(), |(_, expr)| expr)
                    .evaluate_in(scope)
            }
            ExprTree::Step(outputs, stops, key) => {
                let input = key.evaluate_in(scope)?;
                outputs
                    .get(step_index(&input, stops))
                    .or_else(|| outputs.last())?
                    .evaluate_in(scope)
            }
            ExprTree::Interpolate {
                kind,
                key,
                stops,
                factor,
            } => {
                let input = key.evaluate_in(scope)?.as_f64()?;
                interpolate(*kind, *factor, stops, input, scope)
            }
            ExprTree::Let(bindings, body) => evaluate_let(bindings, body, scope),
        }
    }
}

// Each binding is visible to the bindings after it and to the body.
fn evaluate_let(
    bindings: &[(String, ExprTree)],
    body: &ExprTree,
    scope: &Scope<'_>,
) -> Option<Value> {
    match bindings.split_first() {
        Some(((name, expr), rest)) => {
            let inner = scope.bind(name, expr.evaluate_in(scope));
            evaluate_let(rest, body, &inner)
        }
        None => body.evaluate_in(scope),
    }
}

fn interpolate(
    kind: InterpolationKind,
    factor: f64,
    stops: &[(f64, ExprTree)],
    input: f64,
    scope: &Scope<'_>,
) -> Option<Value> {
    let (first, last) = (stops.first()?, stops.last()?);
    if stops.len() == 1 || input < first.0 {
        return first.1.evaluate_in(scope);
    }
    if input >= last.0 {
        return last.1.evaluate_in(scope);
    }

    let lower = stops.iter().rposition(|(stop, _)| *stop <= input)?;
    let (za, a) = &stops[lower];
    let (zb, b) = &stops[lower + 1];
    let rate = (input - za) / (zb - za);
    let a = a.evaluate_in(scope)?;
    if rate == 0.0 {
        return Some(a);
    }
    let b = b.evaluate_in(scope)?;
    Some(blend(kind, factor, a, &b, rate))
}

fn blend(kind: InterpolationKind, factor: f64, a: Value, b: &Value, rate: f64) -> Value {
    let interpolatable = match (&a, b) {
        (Value::Color(_), Value::Color(_)) => true,
        _ => a.is_numeric() && b.is_numeric(),
    };
    if !interpolatable {
        return a;
    }
    match kind {
        // Colors blend as packed ARGB integers, so a falling channel borrows from its neighbours.
        InterpolationKind::Linear => a.add(&b.subtract(&a).multiply(&Value::Float(rate))),
        InterpolationKind::Exponential => {
            let lower = a.multiply(&Value::Float((1.0 - rate).powf(factor)));
            let upper = b.multiply(&Value::Float(rate.powf(factor)));
            lower.add(&upper)
        }
    }
}

/// Maps the expression names `zoom` and `geometry-type` to the attribute keys
/// the decoder stores them under.
pub fn normalize_key(key: &str) -> String {
    pseudo_key(key).unwrap_or(key).to_string()
}

fn pseudo_key(key: &str) -> Option<&'static str> {
    match key {
        "zoom" => Some(ZOOM_KEY),
        "geometry-type" => Some(TYPE_KEY),
        _ => None,
    }
}

/// Parses a literal found in a style document. Strings that look like colors,
/// booleans or numbers become those kinds.
pub(crate) fn parse_value(json: &Json) -> Option<Value> {
    match json {
        Json::String(s) => Some(parse_string(s)),
        Json::Number(n) => match n.as_i64() {
            Some(v) => Some(Value::Int(v)),
            None => n.as_f64().map(Value::Float),
        },
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Array(array) if array.first().and_then(Json::as_str) == Some("literal") => {
            parse_value(array.get(1)?)
        }
        _ => None,
    }
}

fn parse_string(s: &str) -> Value {
    if looks_like_color(s) {
        if let Some(color) = parse_color(s) {
            return Value::Color(color);
        }
    }
    match s {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(v) = s.parse::<i64>() {
        return Value::Int(v);
    }
    // "inf" and "NaN" parse as floats but are names, not numbers
    if s.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(v) = s.parse::<f64>() {
            return Value::Float(v);
        }
    }
    Value::String(s.to_string())
}

fn parse_array(token: &[Json]) -> ExprTree {
    let op = match token.first().and_then(Json::as_str) {
        Some(op) => op,
        None => {
            debug!("Unsupported expression: {:?}", token);
            return ExprTree::Empty;
        }
    };
    if token.len() == 1 {
        return ExprTree::Get(normalize_key(op));
    }

    if let Some(operator) = BinaryOperator::from_symbol(op) {
        return parse_binary(operator, &token[1..]);
    }
    match op {
        "get" | "var" => token[1]
            .as_str()
            .map_or(ExprTree::Empty, |k| ExprTree::Get(k.to_string())),
        "literal" => parse_value(&token[1]).map_or(ExprTree::Empty, ExprTree::Static),
        "case" => parse_case(&token[1..]),
        "match" => parse_match(&token[1..]),
        "step" => parse_step(&token[1..]),
        "interpolate" => parse_interpolate(&token[1..]),
        "let" => parse_let(&token[1..]),
        _ => {
            debug!("Unsupported expression: {}", op);
            ExprTree::Empty
        }
    }
}

// ["+", a, b, c] folds to (a + b) + c; ["-", a] negates.
fn parse_binary(op: BinaryOperator, operands: &[Json]) -> ExprTree {
    let mut operands = operands.iter().map(ExprTree::parse);
    let first = match operands.next() {
        Some(first) => first,
        None => return ExprTree::Empty,
    };
    let mut tree = first;
    let mut folded = false;
    for rhs in operands {
        tree = ExprTree::BinaryOp(op, Box::new(tree), Box::new(rhs));
        folded = true;
    }
    if !folded && op == BinaryOperator::Subtract {
        return ExprTree::BinaryOp(
            op,
            Box::new(ExprTree::Static(Value::Int(0))),
            Box::new(tree),
        );
    }
    tree
}

// ["case", cond1, out1, cond2, out2, ..., fallback]
fn parse_case(args: &[Json]) -> ExprTree {
    let (default, pairs) = split_fallback(args);
    let mut branches = vec![];
    for pair in pairs.chunks_exact(2) {
        match FilterTree::parse(&pair[0]) {
            Some(filter) => branches.push((filter, ExprTree::parse(&pair[1]))),
            None => debug!("Dropping case branch: {}", pair[0]),
        }
    }
    ExprTree::Case(branches, Box::new(default))
}

// ["match", input, label1, out1, [label2, label3], out2, ..., fallback]
fn parse_match(args: &[Json]) -> ExprTree {
    let key = match args.first() {
        Some(key) => ExprTree::parse(key),
        None => return ExprTree::Empty,
    };
    let (default, pairs) = split_fallback(&args[1..]);
    let branches = pairs
        .chunks_exact(2)
        .map(|pair| {
            let labels = match &pair[0] {
                Json::Array(labels) => labels.iter().filter_map(parse_value).collect(),
                label => parse_value(label).into_iter().collect(),
            };
            (labels, ExprTree::parse(&pair[1]))
        })
        .collect();
    ExprTree::Match(Box::new(key), branches, Box::new(default))
}

// ["step", input, out0, stop1, out1, stop2, out2, ...]
fn parse_step(args: &[Json]) -> ExprTree {
    let (key, first) = match args {
        [key, first, ..] => (ExprTree::parse(key), ExprTree::parse(first)),
        _ => return ExprTree::Empty,
    };
    let mut outputs = vec![first];
    let mut stops = vec![];
    for pair in args[2..].chunks_exact(2) {
        if let Some(stop) = parse_value(&pair[0]) {
            stops.push(stop);
            outputs.push(ExprTree::parse(&pair[1]));
        }
    }
    ExprTree::Step(outputs, stops, Box::new(key))
}

// ["interpolate", ["linear"] | ["exponential", base], input, stop1, out1, ...]
fn parse_interpolate(args: &[Json]) -> ExprTree {
    let (curve, key) = match args {
        [curve, key, ..] => (curve, ExprTree::parse(key)),
        _ => return ExprTree::Empty,
    };
    let curve = curve.as_array().map(Vec::as_slice).unwrap_or_default();
    let (kind, factor) = match curve.first().and_then(Json::as_str) {
        Some("exponential") => (
            InterpolationKind::Exponential,
            curve.get(1).and_then(Json::as_f64).unwrap_or(1.0),
        ),
        _ => (InterpolationKind::Linear, 1.0),
    };
    let stops = args[2..]
        .chunks_exact(2)
        .filter_map(|pair| Some((pair[0].as_f64()?, ExprTree::parse(&pair[1]))))
        .collect();
    ExprTree::Interpolate {
        kind,
        key: Box::new(key),
        stops,
        factor,
    }
}

// ["let", name1, value1, name2, value2, ..., body]
fn parse_let(args: &[Json]) -> ExprTree {
    let (body, pairs) = split_fallback(args);
    let bindings = pairs
        .chunks_exact(2)
        .filter_map(|pair| Some((pair[0].as_str()?.to_string(), ExprTree::parse(&pair[1]))))
        .collect();
    ExprTree::Let(bindings, Box::new(body))
}

// {"property": "rank", "stops": [[10, 1], [14, 4]]}
fn parse_legacy_function(json: &Json) -> ExprTree {
    let stops = match json["stops"].as_array() {
        Some(stops) => stops,
        None => {
            debug!("Unsupported function object: {}", json);
            return ExprTree::Empty;
        }
    };
    let key = match json["property"].as_str() {
        Some(property) => ExprTree::Get(property.to_string()),
        None => ExprTree::Get(ZOOM_KEY.to_string()),
    };
    let stops = stops
        .iter()
        .filter_map(|stop| {
            let stop = stop.as_array()?;
            Some((stop.get(0)?.as_f64()?, ExprTree::parse(stop.get(1)?)))
        })
        .collect();
    ExprTree::Interpolate {
        kind: InterpolationKind::Linear,
        key: Box::new(key),
        stops,
        factor: 1.0,
    }
}

// Splits "pairs..., fallback" argument lists. An even-length list has no
// fallback and evaluates to no value when nothing matches.
fn split_fallback(args: &[Json]) -> (ExprTree, &[Json]) {
    match args.split_last() {
        Some((fallback, pairs)) if args.len() % 2 == 1 => (ExprTree::parse(fallback), pairs),
        _ => (ExprTree::Empty, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapbox::value::Color;
    use serde_json::json;

    fn eval(json: Json, attrs: &Attributes) -> Option<Value> {
        ExprTree::parse(&json).evaluate(attrs)
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn approx(value: Option<Value>, expected: f64) {
        let actual = value.and_then(|v| v.as_f64()).expect("numeric value");
        assert!(
            (actual - expected).abs() < 1e-9,
            "{} != {}",
            actual,
            expected
        );
    }

    #[test]
    fn literals_are_typed() {
        assert_eq!(parse_value(&json!("12")), Some(Value::Int(12)));
        assert_eq!(parse_value(&json!("1.5")), Some(Value::Float(1.5)));
        assert_eq!(parse_value(&json!("true")), Some(Value::Bool(true)));
        assert_eq!(parse_value(&json!("inf")), Some(Value::from("inf")));
        assert_eq!(
            parse_value(&json!("#ff0000")),
            Some(Value::Color(Color::rgb(255, 0, 0)))
        );
        assert_eq!(parse_value(&json!(2.5)), Some(Value::Float(2.5)));
        assert_eq!(parse_value(&json!(null)), None);
    }

    #[test]
    fn get_falls_back_to_pseudo_keys() {
        let a = attrs(&[("$zoom", Value::Float(12.0)), ("$type", Value::from("Point"))]);
        assert_eq!(eval(json!(["zoom"]), &a), Some(Value::Float(12.0)));
        assert_eq!(eval(json!(["get", "zoom"]), &a), Some(Value::Float(12.0)));
        assert_eq!(eval(json!(["geometry-type"]), &a), Some(Value::from("Point")));
        assert_eq!(eval(json!(["get", "missing"]), &a), None);
    }

    #[test]
    fn arithmetic_folds_left() {
        let a = attrs(&[("w", Value::Int(3))]);
        assert_eq!(eval(json!(["+", 1, 2, ["get", "w"]]), &a), Some(Value::Int(6)));
        assert_eq!(eval(json!(["-", 10, 2, 3]), &a), Some(Value::Int(5)));
        assert_eq!(eval(json!(["-", ["get", "w"]]), &a), Some(Value::Int(-3)));
        assert_eq!(eval(json!(["^", 2, 3]), &a), Some(Value::Int(8)));
        approx(eval(json!(["*", ["get", "w"], 0.5]), &a), 1.5);
    }

    #[test]
    fn missing_operand_propagates_no_value() {
        assert_eq!(eval(json!(["*", ["get", "w"], 2]), &Attributes::new()), None);
    }

    #[test]
    fn unknown_forms_evaluate_to_nothing() {
        let tree = ExprTree::parse(&json!(["to-rgba", "#000"]));
        assert_eq!(tree, ExprTree::Empty);
        assert_eq!(tree.evaluate(&Attributes::new()), None);
        assert_eq!(ExprTree::parse(&json!(null)), ExprTree::Empty);
    }

    #[test]
    fn case_picks_first_true_branch() {
        let expr = json!([
            "case",
            ["==", ["get", "class"], "river"], 1,
            ["has", "class"], 2,
            3
        ]);
        let class = |c: &str| eval(expr.clone(), &attrs(&[("class", Value::from(c))]));
        assert_eq!(class("river"), Some(Value::Int(1)));
        assert_eq!(class("lake"), Some(Value::Int(2)));
        assert_eq!(eval(expr, &Attributes::new()), Some(Value::Int(3)));
    }

    #[test]
    fn match_accepts_label_lists() {
        let expr = json!(["match", ["get", "vt_code"], [5101, 5103], "a", 5102, "b", "c"]);
        let pick = |code: i64| eval(expr.clone(), &attrs(&[("vt_code", Value::Int(code))]));
        assert_eq!(pick(5103), Some(Value::from("a")));
        assert_eq!(pick(5102), Some(Value::from("b")));
        assert_eq!(pick(1), Some(Value::from("c")));
        assert_eq!(eval(expr, &Attributes::new()), Some(Value::from("c")));
    }

    #[test]
    fn step_returns_branch_values() {
        let expr = json!(["step", ["zoom"], 1, 14, 2, 16, 3]);
        let at = |z: f64| eval(expr.clone(), &attrs(&[("$zoom", Value::Float(z))]));
        assert_eq!(at(13.0), Some(Value::Int(1)));
        assert_eq!(at(14.0), Some(Value::Int(2)));
        assert_eq!(at(15.9), Some(Value::Int(2)));
        assert_eq!(at(18.0), Some(Value::Int(3)));
    }

    #[test]
    fn interpolate_clamps_and_blends() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 10, 1, 20, 3]);
        let at = |z: f64| eval(expr.clone(), &attrs(&[("$zoom", Value::Float(z))]));
        approx(at(5.0), 1.0);
        approx(at(10.0), 1.0);
        approx(at(15.0), 2.0);
        approx(at(20.0), 3.0);
        approx(at(25.0), 3.0);
    }

    #[test]
    fn interpolate_single_stop_is_constant() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 10, 4]);
        for z in &[0.0, 10.0, 30.0] {
            let a = attrs(&[("$zoom", Value::Float(*z))]);
            assert_eq!(eval(expr.clone(), &a), Some(Value::Int(4)));
        }
    }

    #[test]
    fn interior_stop_is_not_blended() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 10, 1, 12, 5, 14, 9]);
        let a = attrs(&[("$zoom", Value::Int(12))]);
        assert_eq!(eval(expr, &a), Some(Value::Int(5)));
    }

    #[test]
    fn interpolate_needs_a_numeric_driver() {
        let expr = json!(["interpolate", ["linear"], ["get", "name"], 10, 1, 20, 3]);
        assert_eq!(eval(expr.clone(), &attrs(&[("name", Value::from("x"))])), None);
        assert_eq!(eval(expr, &Attributes::new()), None);
    }

    #[test]
    fn exponential_uses_factor() {
        let expr = json!(["interpolate", ["exponential", 2], ["zoom"], 0, 0, 10, 100]);
        let a = attrs(&[("$zoom", Value::Float(5.0))]);
        // 0 * 0.5^2 + 100 * 0.5^2
        approx(eval(expr, &a), 25.0);
    }

    #[test]
    fn strings_interpolate_to_lower_stop() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 10, "a", 20, "b"]);
        let a = attrs(&[("$zoom", Value::Float(15.0))]);
        assert_eq!(eval(expr, &a), Some(Value::from("a")));
    }

    #[test]
    fn colors_interpolate_linearly() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 0, "#000000", 10, "#646464"]);
        let a = attrs(&[("$zoom", Value::Float(5.0))]);
        assert_eq!(
            eval(expr, &a),
            Some(Value::Color(Color::argb(255, 50, 50, 50)))
        );
    }

    #[test]
    fn falling_colors_blend_on_packed_argb() {
        let expr = json!(["interpolate", ["linear"], ["zoom"], 0, "#646464", 10, "#000000"]);
        let a = attrs(&[("$zoom", Value::Float(5.0))]);
        assert_eq!(
            eval(expr, &a),
            Some(Value::Color(Color::argb(126, 177, 177, 178)))
        );
    }

    #[test]
    fn legacy_stops_object_interpolates_on_zoom() {
        let expr = json!({"stops": [[10, 1], [20, 3]]});
        approx(eval(expr, &attrs(&[("$zoom", Value::Float(15.0))])), 2.0);
        let expr = json!({"property": "rank", "stops": [[0, 0], [10, 10]]});
        approx(eval(expr, &attrs(&[("rank", Value::Int(4))])), 4.0);
    }

    #[test]
    fn let_does_not_leak_into_attributes() {
        let tree = ExprTree::Let(
            vec![("a".to_string(), ExprTree::Static(Value::Int(1)))],
            Box::new(ExprTree::Get("a".to_string())),
        );
        let a = Attributes::new();
        assert_eq!(tree.evaluate(&a), Some(Value::Int(1)));
        assert!(!a.contains_key("a"));
    }

    #[test]
    fn let_bindings_see_earlier_bindings() {
        let expr = json!([
            "let",
            "a", 2,
            "b", ["*", ["var", "a"], 3],
            ["+", ["var", "b"], ["get", "c"]]
        ]);
        let a = attrs(&[("c", Value::Int(1))]);
        assert_eq!(eval(expr, &a), Some(Value::Int(7)));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn let_bindings_are_visible_to_case_filters() {
        let expr = json!(["let", "k", 5, ["case", ["==", ["var", "k"], 5], "hit", "miss"]]);
        assert_eq!(eval(expr, &Attributes::new()), Some(Value::from("hit")));
    }

    #[test]
    fn line_width_by_zoom_and_code() {
        let expr = json!([
            "interpolate", ["linear"], ["zoom"],
            15, ["match", ["get", "vt_code"], [5321], 0.5, 1],
            16, ["match", ["get", "vt_code"], [5321], 2, 1]
        ]);
        let at = |z: f64, code: i64| {
            eval(
                expr.clone(),
                &attrs(&[("$zoom", Value::Float(z)), ("vt_code", Value::Int(code))]),
            )
        };
        approx(at(15.0, 5321), 0.5);
        approx(at(16.0, 5321), 2.0);
        approx(at(15.0, 1), 1.0);
    }
}
