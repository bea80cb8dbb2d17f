//! Type-driven literals and identifier rewriting inside expression text.

use rand::Rng;
use regex::{Captures, Regex};

use crate::names::NameStyle;

fn normalize(ty: &str) -> &str {
    match ty {
        "Integer" => "int",
        "Long" => "long",
        "Short" => "short",
        "Byte" => "byte",
        "Float" => "float",
        "Double" => "double",
        "boolean" | "Boolean" => "bool",
        "Character" => "char",
        "String" => "string",
        other => other,
    }
}

/// Value of `ty` that is safe to `return` from a dead branch.
pub fn null_element(ty: &str) -> &'static str {
    match normalize(ty) {
        "int" | "long" | "short" | "byte" => "0",
        "float" | "double" => "0.0",
        "bool" => "false",
        "char" => "'\\0'",
        "string" => "\"\"",
        _ => "null",
    }
}

/// Identity element of `+` for `ty`, if it has one.
pub fn neutral_element(ty: &str) -> Option<&'static str> {
    match normalize(ty) {
        "int" | "long" | "short" | "byte" => Some("0"),
        "float" | "double" => Some("0.0"),
        "string" => Some("\"\""),
        _ => None,
    }
}

/// Types [`random_literal`] can produce a value for.
pub const LITERAL_TYPES: &[&str] = &["int", "long", "double", "bool", "char", "string"];

/// A random literal of type `ty`, rendered as source text.
pub fn random_literal<R: Rng + ?Sized>(ty: &str, names: NameStyle, rng: &mut R) -> String {
    match normalize(ty) {
        "int" | "short" => rng.random_range(0..10_000).to_string(),
        "byte" => rng.random_range(0..128).to_string(),
        "long" => rng.random_range(0..i64::MAX).to_string(),
        "float" | "double" => format!("{:.4}", rng.random::<f64>()),
        "bool" => rng.random_bool(0.5).to_string(),
        "char" => format!("'{}'", char::from(rng.random_range(b'a'..=b'z'))),
        "string" => format!("\"{}\"", names.comment(rng)),
        _ => "null".to_string(),
    }
}

/// Byte ranges of `text` that lie outside string and char literals.
fn code_segments(text: &str) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    start = idx + c.len_utf8();
                }
            }
            None if c == '"' || c == '\'' => {
                segments.push((start, idx));
                quote = Some(c);
            }
            None => {}
        }
    }
    if quote.is_none() {
        segments.push((start, text.len()));
    }
    segments
}

fn identifier_pattern(name: &str) -> Option<Regex> {
    // The leading group stands in for a look-behind: no member access, no
    // identifier character directly before the name.
    Regex::new(&format!(r"(^|[^.\w]){}\b", regex::escape(name))).ok()
}

/// Replace free occurrences of the identifier `old` with `new`. Occurrences
/// inside string literals and after a `.` are left alone.
pub fn rename_identifier(text: &str, old: &str, new: &str) -> String {
    let Some(pattern) = identifier_pattern(old) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in code_segments(text) {
        out.push_str(&text[last..start]);
        let rewritten = pattern.replace_all(&text[start..end], |caps: &Captures| {
            format!("{}{}", &caps[1], new)
        });
        out.push_str(&rewritten);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// `true` if `name` occurs as a free identifier in `text`.
pub fn mentions(text: &str, name: &str) -> bool {
    let Some(pattern) = identifier_pattern(name) else {
        return false;
    };
    code_segments(text)
        .into_iter()
        .any(|(start, end)| pattern.is_match(&text[start..end]))
}

/// A literal found inside expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
    /// Outline type of the literal: `int`, `double`, `bool`, `char` or `string`.
    pub ty: &'static str,
}

fn literal_pattern() -> Option<Regex> {
    Regex::new(
        r#"(?P<string>"(?:[^"\\]|\\.)*")|(?P<char>'(?:[^'\\]|\\.)')|(?P<bool>\b(?:true|false)\b)|(?P<double>\b\d+\.\d+\b)|(?P<int>\b\d+\b)"#,
    )
    .ok()
}

/// Every literal in `text`, left to right. Digits inside string literals and
/// identifiers are not reported.
pub fn literal_spans(text: &str) -> Vec<LiteralSpan> {
    let Some(pattern) = literal_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            ["string", "char", "bool", "double", "int"]
                .into_iter()
                .find_map(|ty| caps.name(ty).map(|m| (m, ty)))
        })
        .map(|(m, ty)| LiteralSpan {
            start: m.start(),
            end: m.end(),
            ty,
        })
        .collect()
}

/// `lit` wrapped in an identity supplier, cast back to its type.
pub fn identity_lambda(lit: &str, ty: &str) -> String {
    format!("(({ty})((Supplier<?>)(() -> {lit})).get())")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn null_elements_per_type() {
        assert_eq!(null_element("int"), "0");
        assert_eq!(null_element("long"), "0");
        assert_eq!(null_element("double"), "0.0");
        assert_eq!(null_element("boolean"), "false");
        assert_eq!(null_element("char"), "'\\0'");
        assert_eq!(null_element("String"), "\"\"");
        assert_eq!(null_element("Widget"), "null");
    }

    #[test]
    fn neutral_elements_per_type() {
        assert_eq!(neutral_element("int"), Some("0"));
        assert_eq!(neutral_element("float"), Some("0.0"));
        assert_eq!(neutral_element("string"), Some("\"\""));
        assert_eq!(neutral_element("bool"), None);
    }

    #[test]
    fn random_literals_match_their_type() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let int: i64 = random_literal("int", NameStyle::Animal, &mut rng).parse().unwrap();
        assert!((0..10_000).contains(&int));
        let dbl: f64 = random_literal("double", NameStyle::Animal, &mut rng).parse().unwrap();
        assert!((0.0..1.0).contains(&dbl));
        let b = random_literal("bool", NameStyle::Animal, &mut rng);
        assert!(b == "true" || b == "false");
        let c = random_literal("char", NameStyle::Animal, &mut rng);
        assert!(c.starts_with('\'') && c.ends_with('\'') && c.len() == 3);
        let s = random_literal("string", NameStyle::Random, &mut rng);
        assert!(s.starts_with('"') && s.ends_with('"'));
        assert_eq!(random_literal("Widget", NameStyle::Animal, &mut rng), "null");
    }

    #[test]
    fn rename_respects_identifier_boundaries() {
        assert_eq!(rename_identifier("x + xy + y.x + x", "x", "z"), "z + xy + y.x + z");
        assert_eq!(rename_identifier("f(x,x)", "x", "z"), "f(z,z)");
        assert_eq!(rename_identifier("count", "x", "z"), "count");
    }

    #[test]
    fn rename_skips_string_literals() {
        assert_eq!(
            rename_identifier("print(\"x is\", x, 'x')", "x", "z"),
            "print(\"x is\", z, 'x')"
        );
        assert_eq!(
            rename_identifier("\"a\\\"x\" + x", "x", "z"),
            "\"a\\\"x\" + z"
        );
    }

    #[test]
    fn mentions_finds_free_identifiers_only() {
        assert!(mentions("a + b", "b"));
        assert!(!mentions("ab + c", "b"));
        assert!(!mentions("print(\"b\")", "b"));
        assert!(!mentions("o.b", "b"));
    }

    #[test]
    fn literal_spans_classify_each_literal() {
        let text = r#"f(12, 1.5, "a 3", 'c', true, x2)"#;
        let found: Vec<_> = literal_spans(text)
            .into_iter()
            .map(|l| (&text[l.start..l.end], l.ty))
            .collect();
        assert_eq!(
            found,
            vec![
                ("12", "int"),
                ("1.5", "double"),
                ("\"a 3\"", "string"),
                ("'c'", "char"),
                ("true", "bool"),
            ]
        );
        assert!(literal_spans("a + b").is_empty());
    }

    #[test]
    fn identity_lambda_keeps_the_literal() {
        assert_eq!(
            identity_lambda("7", "int"),
            "((int)((Supplier<?>)(() -> 7)).get())"
        );
    }
}
