//! POSIX-style command-line flag parsing for the argument overlay.

use std::collections::BTreeMap;

/// Parse an argument vector into flag name → raw value.
///
/// Names are stored without leading dashes. A flag with no inline value takes
/// the following token; when there is none the flag maps to `None`. Parsing
/// stops at `--`. Later occurrences of a flag replace earlier ones.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> BTreeMap<String, Option<String>> {
    let mut parsed = BTreeMap::new();

    for (idx, whole) in args.iter().enumerate() {
        let whole = whole.as_ref();
        if whole == "--" {
            break;
        }
        let mut chars = whole.chars();
        if chars.next() != Some('-') || whole.chars().count() < 2 {
            continue;
        }

        let next = args.get(idx + 1).map(|arg| arg.as_ref().to_string());
        if whole.starts_with("--") || whole.chars().count() == 2 {
            let (name, inline) = match whole.strip_prefix("--") {
                Some(long) => match long.split_once('=') {
                    Some((name, value)) => (name.to_string(), Some(value.to_string())),
                    None => (long.to_string(), None),
                },
                None => (whole[1..].to_string(), None),
            };
            parsed.insert(name, inline.or(next));
        } else {
            // Short flag bundle: each character is its own flag.
            for short in chars {
                parsed.insert(short.to_string(), next.clone());
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value<'a>(parsed: &'a BTreeMap<String, Option<String>>, name: &str) -> Option<&'a str> {
        parsed.get(name).and_then(|value| value.as_deref())
    }

    #[test]
    fn long_flags_take_inline_or_next_value() {
        let parsed = parse_args(&["--port=9090", "--env", "test"]);
        assert_eq!(value(&parsed, "port"), Some("9090"));
        assert_eq!(value(&parsed, "env"), Some("test"));
    }

    #[test]
    fn inline_value_keeps_later_equals_signs() {
        let parsed = parse_args(&["--query=a=b"]);
        assert_eq!(value(&parsed, "query"), Some("a=b"));
    }

    #[test]
    fn short_bundle_expands_each_character() {
        let parsed = parse_args(&["-vx", "on"]);
        assert_eq!(value(&parsed, "v"), Some("on"));
        assert_eq!(value(&parsed, "x"), Some("on"));
        assert!(!parsed.contains_key("vx"));
    }

    #[test]
    fn single_short_flag_takes_next_value() {
        let parsed = parse_args(&["-p", "8080"]);
        assert_eq!(value(&parsed, "p"), Some("8080"));
    }

    #[test]
    fn double_dash_stops_parsing() {
        let parsed = parse_args(&["--a=1", "--", "--b=2"]);
        assert_eq!(value(&parsed, "a"), Some("1"));
        assert!(!parsed.contains_key("b"));
    }

    #[test]
    fn trailing_flag_has_no_value() {
        let parsed = parse_args(&["positional", "--verbose"]);
        assert_eq!(parsed.get("verbose"), Some(&None));
        assert!(!parsed.contains_key("positional"));
    }
}
