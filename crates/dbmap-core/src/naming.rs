//! Column-name inference from field names.

use std::sync::OnceLock;

use regex::Regex;

/// An uppercase run followed by its non-uppercase tail.
const WORD_PATTERN: &str = r"([A-Z]+)([^A-Z]*)";

fn word_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(WORD_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid word pattern, column names will only be lower-cased");
                None
            }
        })
        .as_ref()
}

/// Infer a column name from a field name.
///
/// Words start at case transitions and are joined with `_` after
/// lower-casing. A run of several uppercase letters followed by lowercase
/// text gives its last letter to the next word, so acronyms stay together:
///
/// | field          | column           |
/// |----------------|------------------|
/// | `FooBar`       | `foo_bar`        |
/// | `JSONThing`    | `json_thing`     |
/// | `FooJSONThing` | `foo_json_thing` |
/// | `FooXBar`      | `foo_x_bar`      |
///
/// Text before the first uppercase letter is a word of its own, so
/// snake_case names are returned unchanged. A raw identifier prefix (`r#`)
/// is dropped.
pub fn default_column_name(field: &str) -> String {
    let field = field.strip_prefix("r#").unwrap_or(field);
    let Some(pattern) = word_pattern() else {
        return field.to_lowercase();
    };

    let mut words: Vec<String> = Vec::new();
    let first_upper = field
        .find(|c: char| c.is_ascii_uppercase())
        .unwrap_or(field.len());
    if first_upper > 0 {
        words.push(field[..first_upper].to_string());
    }

    for caps in pattern.captures_iter(&field[first_upper..]) {
        let run = caps.get(1).map_or("", |m| m.as_str());
        let tail = caps.get(2).map_or("", |m| m.as_str());
        if run.len() > 1 && !tail.is_empty() {
            let (head, last) = run.split_at(run.len() - 1);
            words.push(head.to_string());
            words.push(format!("{}{}", last, tail));
        } else {
            words.push(format!("{}{}", run, tail));
        }
    }

    let mut column = String::with_capacity(field.len() + words.len());
    for word in &words {
        // A word that already ends in `_` is its own separator.
        if !column.is_empty() && !column.ends_with('_') {
            column.push('_');
        }
        column.push_str(&word.to_lowercase());
    }
    column
}
