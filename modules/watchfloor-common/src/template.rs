//! `{{var}}` templates for evidence strings, consequence narratives and headlines.
//!
//! Two passes: `{{config.*}}` variables are resolved once from the catalogue's
//! TOML tree at load time; everything else is a runtime variable filled in per
//! citizen/article by [`render`].

use anyhow::{bail, Context, Result};

enum Piece<'a> {
    Literal(&'a str),
    Var(&'a str),
}

/// Split a template into literal text and `{{var}}` references.
/// `\{{` is an escaped literal `{{`.
fn scan(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        let Some(open) = rest.find("{{") else {
            pieces.push(Piece::Literal(rest));
            break;
        };

        if open > 0 && rest.as_bytes()[open - 1] == b'\\' {
            pieces.push(Piece::Literal(&rest[..open - 1]));
            pieces.push(Piece::Literal("{{"));
            rest = &rest[open + 2..];
            continue;
        }

        if open > 0 {
            pieces.push(Piece::Literal(&rest[..open]));
        }
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            bail!("Unclosed template variable in: {template}");
        };
        pieces.push(Piece::Var(after[..close].trim()));
        rest = &after[close + 2..];
    }

    Ok(pieces)
}

/// Resolve `{{config.*}}` variables from the TOML tree; runtime vars are kept verbatim.
pub fn resolve_config_vars(template: &str, toml_value: &toml::Value) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for piece in scan(template)? {
        match piece {
            Piece::Literal(s) if s == "{{" => out.push_str("\\{{"),
            Piece::Literal(s) => out.push_str(s),
            Piece::Var(name) => match name.strip_prefix("config.") {
                Some(path) => {
                    let value = lookup_toml_path(toml_value, path)
                        .with_context(|| format!("Config variable not found: {{{{{name}}}}}"))?;
                    out.push_str(&toml_value_to_string(value));
                }
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            },
        }
    }
    Ok(out)
}

/// Fill runtime variables. Unknown variables are left as `{{name}}` so gaps are visible.
pub fn render(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let Ok(pieces) = scan(template) else {
        return template.to_string();
    };
    let mut out = String::with_capacity(template.len());
    for piece in pieces {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Var(name) => match lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            },
        }
    }
    out
}

/// Check that every runtime variable in `template` is allowed.
pub fn validate_template(template: &str, allowed: impl Fn(&str) -> bool) -> Result<()> {
    for piece in scan(template)? {
        if let Piece::Var(name) = piece {
            if name.starts_with("config.") {
                bail!("Unresolved config variable {{{{{name}}}}} in: {template}");
            }
            if !allowed(name) {
                bail!("Unknown template variable {{{{{name}}}}} in: {template}");
            }
        }
    }
    Ok(())
}

/// Walk the TOML value tree by dotted path (e.g., "world.regime").
fn lookup_toml_path<'a>(value: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
    let mut current = value;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    Some(current)
}

fn toml_value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Array(arr) => arr
            .iter()
            .map(toml_value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        toml::Value::Table(_) => "[table]".to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
    }
}
