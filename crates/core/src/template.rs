//! Positional message templates (`"Failed for {0}"`).
//!
//! Supports `{n}` placeholders, `{{`/`}}` escapes, and tolerates
//! `{n,align}` / `{n:spec}` suffixes (the suffix is dropped). A placeholder
//! whose index has no matching argument, or that does not parse, is emitted
//! verbatim. Formatting never fails.

/// `true` when `text` is non-blank and contains the `{0}` placeholder.
pub fn is_template(text: &str) -> bool {
    !text.trim().is_empty() && text.contains("{0}")
}

/// Substitute positional arguments into `template`.
pub fn format_positional<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        // Opening brace: look for the matching close.
        match tail.find('}') {
            Some(end) => {
                let body = &tail[1..end];
                match placeholder_index(body).and_then(|idx| args.get(idx)) {
                    Some(arg) => out.push_str(arg.as_ref()),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn placeholder_index(body: &str) -> Option<usize> {
    let index = body.split([',', ':']).next()?.trim();
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_templates() {
        assert!(is_template("Failed for {0}"));
        assert!(!is_template("E001"));
        assert!(!is_template("   "));
        assert!(!is_template("only {1}"));
    }

    #[test]
    fn substitutes_in_order() {
        assert_eq!(format_positional("Failed for {0}", &["x"]), "Failed for x");
        assert_eq!(format_positional("{1}-{0}-{1}", &["a", "b"]), "b-a-b");
    }

    #[test]
    fn handles_escapes_and_suffixes() {
        assert_eq!(format_positional("{{{0}}}", &["v"]), "{v}");
        assert_eq!(format_positional("[{0,5}] [{0:N2}]", &["7"]), "[7] [7]");
    }

    #[test]
    fn leaves_unmatched_placeholders() {
        assert_eq!(format_positional("{0} and {3}", &["one"]), "one and {3}");
        assert_eq!(format_positional("{name} {", &["x"]), "{name} {");
        assert_eq!(format_positional::<&str>("{0}", &[]), "{0}");
    }

    #[test]
    fn non_ascii_text_survives() {
        assert_eq!(format_positional("抛出的第一个错误【{0}】", &["哈哈"]), "抛出的第一个错误【哈哈】");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn text_without_braces_is_unchanged(text in "[^{}]{0,40}") {
                prop_assert_eq!(format_positional(&text, &["arg"]), text);
            }

            #[test]
            fn single_placeholder_is_replaced(prefix in "[a-z ]{0,10}", arg in "[^{}]{0,10}") {
                let template = format!("{prefix}{{0}}");
                prop_assert_eq!(format_positional(&template, &[arg.as_str()]), format!("{prefix}{arg}"));
            }
        }
    }
}
