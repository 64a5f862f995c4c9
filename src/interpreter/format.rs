//! printf-style formatting of runtime values
//!
//! Supported verbs: `%v`, `%s`, `%d`, `%f` with optional `-` flag, width
//! and precision, and `%%`. Missing arguments render as `%!v(MISSING)`.

use crate::ast::types::Value;

struct Spec {
    left_align: bool,
    width: Option<usize>,
    precision: Option<usize>,
    verb: char,
}

fn parse_spec(chars: &[char], mut i: usize) -> (Option<Spec>, usize) {
    let mut left_align = false;
    while chars.get(i) == Some(&'-') {
        left_align = true;
        i += 1;
    }
    let mut width = String::new();
    while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
        width.push(*c);
        i += 1;
    }
    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut digits = String::new();
        while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
            digits.push(*c);
            i += 1;
        }
        precision = Some(digits.parse().unwrap_or(0));
    }
    match chars.get(i) {
        Some(verb) => (
            Some(Spec {
                left_align,
                width: width.parse().ok(),
                precision,
                verb: *verb,
            }),
            i + 1,
        ),
        None => (None, i),
    }
}

fn pad(text: String, spec: &Spec) -> String {
    match spec.width {
        Some(width) if text.chars().count() < width => {
            let fill = " ".repeat(width - text.chars().count());
            if spec.left_align {
                text + &fill
            } else {
                fill + &text
            }
        }
        _ => text,
    }
}

fn render(spec: &Spec, value: &Value) -> String {
    let text = match (spec.verb, value) {
        ('v' | 's', _) => value.to_string(),
        ('d', Value::Int(i)) => i.to_string(),
        ('f', Value::Int(i)) => format!("{:.*}", spec.precision.unwrap_or(6), *i as f64),
        ('f', Value::Float(f)) => format!("{:.*}", spec.precision.unwrap_or(6), f),
        (verb, other) => format!("%!{}({}={})", verb, other.type_name(), other),
    };
    pad(text, spec)
}

/// Format `format` with `args`, consuming one argument per verb.
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if chars.get(i + 1) == Some(&'%') {
            out.push('%');
            i += 2;
            continue;
        }
        let (spec, next) = parse_spec(&chars, i + 1);
        i = next;
        match spec {
            Some(spec) => match args.next() {
                Some(value) => out.push_str(&render(&spec, value)),
                None => out.push_str(&format!("%!{}(MISSING)", spec.verb)),
            },
            None => out.push_str("%!(NOVERB)"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_verbs() {
        assert_eq!(sprintf("site%v", &[Value::from("B")]), "siteB");
        assert_eq!(sprintf("%v-%v", &[Value::Int(1), Value::Float(2.0)]), "1-2");
        assert_eq!(sprintf("100%%", &[]), "100%");
    }

    #[test]
    fn test_float_precision_and_width() {
        assert_eq!(sprintf("%.2f", &[Value::Float(3.14159)]), "3.14");
        assert_eq!(sprintf("%f", &[Value::Int(2)]), "2.000000");
        assert_eq!(sprintf("[%4d]", &[Value::Int(7)]), "[   7]");
        assert_eq!(sprintf("[%-3s]", &[Value::from("a")]), "[a  ]");
    }

    #[test]
    fn test_missing_and_bad_args() {
        assert_eq!(sprintf("%v and %v", &[Value::Int(1)]), "1 and %!v(MISSING)");
        assert_eq!(sprintf("%d", &[Value::from("x")]), "%!d(string=x)");
    }

    #[test]
    fn test_vector_display() {
        assert_eq!(sprintf("%v", &[Value::FloatVector(vec![1.0, 2.5])]), "[1 2.5]");
    }
}
