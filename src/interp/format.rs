//! The `format` template mini-language: `{}` takes the next argument, `{N}` the N-th,
//! and `{{` / `}}` are literal braces.

use super::RuntimeError;

pub fn format_template(template: &str, args: &[String]) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => spec.push(ch),
                        None => return Err(RuntimeError::format("unclosed '{' in format template")),
                    }
                }
                let index = if spec.trim().is_empty() {
                    let i = next;
                    next += 1;
                    i
                } else {
                    spec.trim().parse::<usize>().map_err(|_| {
                        RuntimeError::format(format!("invalid placeholder '{{{spec}}}' in format template"))
                    })?
                };
                let arg = args.get(index).ok_or_else(|| {
                    RuntimeError::format(format!(
                        "placeholder {index} is out of range: {} argument(s) given",
                        args.len()
                    ))
                })?;
                out.push_str(arg);
            }
            '}' => return Err(RuntimeError::format("unmatched '}' in format template")),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// `"text"`, the form strings take inside containers.
pub fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

/// `[a, b]` from already-rendered elements.
pub fn render_array(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// `[k: v, ...]`, or `[:]` when empty.
pub fn render_object(entries: &[(String, String)]) -> String {
    if entries.is_empty() {
        return "[:]".to_string();
    }
    let body: Vec<String> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("[{}]", body.join(", "))
}

/// `Name { f: v, ... }`; a unit variant renders as its bare name.
pub fn render_instance(name: &str, fields: &[(String, String)], unit_variant: bool) -> String {
    if unit_variant {
        return name.to_string();
    }
    if fields.is_empty() {
        return format!("{name} {{}}");
    }
    let body: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{name} {{ {} }}", body.join(", "))
}
