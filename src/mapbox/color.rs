// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/types/#color
use super::value::Color;

use log::debug;

const COLOR_PREFIXES: [&str; 5] = ["#", "rgba", "rgb", "hsla", "hsl"];

/// True when a string literal should be treated as a color rather than text.
pub fn looks_like_color(value: &str) -> bool {
    COLOR_PREFIXES.iter().any(|p| value.starts_with(p))
}

pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    let color = if let Some(hex) = value.strip_prefix('#') {
        parse_hex(hex)
    } else if let Some(args) = function_args(value, "rgba") {
        parse_rgb(&args, true)
    } else if let Some(args) = function_args(value, "rgb") {
        parse_rgb(&args, false)
    } else if let Some(args) = function_args(value, "hsla") {
        parse_hsl(&args, true)
    } else if let Some(args) = function_args(value, "hsl") {
        parse_hsl(&args, false)
    } else {
        None
    };

    if color.is_none() {
        debug!("Unknown color format: {}", value);
    }
    color
}

// "rgb(1, 2, 3)" -> ["1", "2", "3"]
fn function_args<'a>(value: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let rest = value.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::argb(nibble(3)?, nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::argb(byte(6)?, byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}

fn parse_rgb(args: &[&str], with_alpha: bool) -> Option<Color> {
    if args.len() != if with_alpha { 4 } else { 3 } {
        return None;
    }
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.max(0.0).min(255.0) as u8);
    let alpha = if with_alpha { parse_alpha(args[3])? } else { 255 };
    Some(Color::argb(
        alpha,
        channel(args[0])?,
        channel(args[1])?,
        channel(args[2])?,
    ))
}

fn parse_hsl(args: &[&str], with_alpha: bool) -> Option<Color> {
    if args.len() != if with_alpha { 4 } else { 3 } {
        return None;
    }
    let percent = |s: &str| s.trim_end_matches('%').parse::<f64>().ok().map(|v| v / 100.0);
    let hue = args[0].parse::<f64>().ok()?.rem_euclid(360.0);
    let saturation = percent(args[1])?;
    let lightness = percent(args[2])?;
    let alpha = if with_alpha { parse_alpha(args[3])? } else { 255 };
    Some(from_hsl(hue, saturation, lightness, alpha))
}

fn parse_alpha(s: &str) -> Option<u8> {
    s.parse::<f64>()
        .ok()
        .map(|a| (a.max(0.0).min(1.0) * 255.0).round() as u8)
}

fn from_hsl(hue: f64, saturation: f64, lightness: f64, alpha: u8) -> Color {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |v: f64| ((v + m) * 255.0).round().max(0.0).min(255.0) as u8;
    Color::argb(alpha, to_byte(r), to_byte(g), to_byte(b))
}
