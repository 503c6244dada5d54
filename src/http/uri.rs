//! `{name}` placeholder expansion for request URLs.

use std::collections::BTreeMap;

/// Replaces every `{name}` in `template` with the percent-encoded value of
/// `variables[name]`. An unterminated `{` is copied through unchanged.
///
/// Fails with the name of the first placeholder that has no variable.
pub fn expand(template: &str, variables: &BTreeMap<String, String>) -> Result<String, String> {
    if !template.contains('{') {
        return Ok(template.to_string());
    }

    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find('}') else {
            expanded.push_str(&rest[open..]);
            rest = "";
            break;
        };

        let name = &after_open[..close];
        let value = variables
            .get(name)
            .ok_or_else(|| format!("no value for URI variable '{}'", name))?;
        expanded.push_str(&urlencoding::encode(value));
        rest = &after_open[close + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}
