// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/types/
//
// Every attribute read from a tile and every literal found in a style document
// ends up as a `Value`. Arithmetic between kinds that have no meaningful
// combination returns the left operand unchanged instead of failing, so an
// expression over unexpected data degrades rather than aborting the render.

use crate::config::NUMERIC_EPSILON;

use serde::Serialize;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt::{Display, Formatter, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        a: 255,
        r: 0,
        g: 0,
        b: 0,
    };

    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Color {
        Color { a, r, g, b }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::argb(255, r, g, b)
    }

    /// Packs the channels as `0xAARRGGBB`, reinterpreted as a signed integer.
    pub fn to_argb(&self) -> i32 {
        ((self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32)
            as i32
    }

    pub fn from_argb(argb: i32) -> Color {
        let v = argb as u32;
        Color {
            a: (v >> 24) as u8,
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    fn scale(&self, factor: f64) -> Color {
        let channel = |c: u8| (c as f64 * factor).trunc().max(0.0).min(255.0) as u8;
        Color {
            a: channel(self.a),
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.r,
            self.g,
            self.b,
            self.a as f64 / 255.0
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Color(Color),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Equality with numeric coercion. Any comparison involving a float is
    /// tolerant to `NUMERIC_EPSILON`.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64 - b).abs() < NUMERIC_EPSILON
            }
            (Value::Float(a), Value::Float(b)) => (a - b).abs() < NUMERIC_EPSILON,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            _ => false,
        }
    }

    /// Total ordering used by comparison filters and step stops. Kinds with no
    /// common order put the left operand first as `Greater`.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => compare_mixed(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => compare_mixed(*a, *b as f64),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Greater),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Color(a), Value::Color(b)) => a.to_argb().cmp(&b.to_argb()),
            _ => Ordering::Greater,
        }
    }

    pub fn add(&self, rhs: &Value) -> Value {
        if let Some(v) = self.numeric(rhs, |a, b| Some(a.wrapping_add(b)), |a, b| a + b) {
            return v;
        }
        match (self, rhs) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
            (Value::Color(a), Value::Color(b)) => {
                Value::Color(Color::from_argb(a.to_argb().wrapping_add(b.to_argb())))
            }
            _ => self.clone(),
        }
    }

    pub fn subtract(&self, rhs: &Value) -> Value {
        if let Some(v) = self.numeric(rhs, |a, b| Some(a.wrapping_sub(b)), |a, b| a - b) {
            return v;
        }
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && !*b),
            (Value::Color(a), Value::Color(b)) => {
                Value::Color(Color::from_argb(a.to_argb().wrapping_sub(b.to_argb())))
            }
            _ => self.clone(),
        }
    }

    pub fn multiply(&self, rhs: &Value) -> Value {
        if let Some(v) = self.numeric(rhs, |a, b| Some(a.wrapping_mul(b)), |a, b| a * b) {
            return v;
        }
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && *b),
            (Value::Color(c), Value::Int(n)) => Value::Color(c.scale(*n as f64)),
            (Value::Color(c), Value::Float(f)) => Value::Color(c.scale(*f)),
            _ => self.clone(),
        }
    }

    pub fn divide(&self, rhs: &Value) -> Value {
        if let Some(v) = self.numeric(rhs, |a, b| a.checked_div(b), |a, b| a / b) {
            return v;
        }
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && !*b),
            _ => self.clone(),
        }
    }

    pub fn modulo(&self, rhs: &Value) -> Value {
        self.numeric(rhs, |a, b| a.checked_rem(b), |a, b| a % b)
            .unwrap_or_else(|| self.clone())
    }

    pub fn pow(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match u32::try_from(*b)
                .ok()
                .and_then(|e| a.checked_pow(e))
            {
                Some(v) => Value::Int(v),
                None => Value::Float((*a as f64).powf(*b as f64)),
            },
            _ => self
                .numeric(rhs, |_, _| None, f64::powf)
                .unwrap_or_else(|| self.clone()),
        }
    }

    // Int (op) Int stays Int; a failed integer op (e.g. division by zero)
    // keeps the left operand. Any float on either side promotes to Float.
    // Returns None when either side is not numeric.
    fn numeric(
        &self,
        rhs: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Option<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => {
                Some(int_op(*a, *b).map(Value::Int).unwrap_or_else(|| self.clone()))
            }
            (Value::Int(a), Value::Float(b)) => Some(Value::Float(float_op(*a as f64, *b))),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(float_op(*a, *b as f64))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(float_op(*a, *b))),
            _ => None,
        }
    }
}

fn compare_mixed(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < NUMERIC_EPSILON {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Greater)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Color(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}
