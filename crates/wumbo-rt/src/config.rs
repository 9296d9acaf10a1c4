/// Environment variable that overrides `field` of manifest section `section`,
/// e.g. `env_key("unparse", "annotate")` is `WUMBO_UNPARSE_ANNOTATE`.
pub fn env_key(section: &str, field: &str) -> String {
    format!("WUMBO_{}_{}", to_env_key(section), to_env_key(field))
}

/// Reads a boolean override. Accepts `1/0`, `true/false`, `yes/no`, `on/off`;
/// anything else is treated as unset.
pub fn env_flag(section: &str, field: &str) -> Option<bool> {
    let raw = std::env::var(env_key(section, field)).ok()?;
    parse_flag(&raw)
}

pub fn env_string(section: &str, field: &str) -> Option<String> {
    std::env::var(env_key(section, field))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn to_env_key(name: &str) -> String {
    let mut out = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == '.' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        let is_upper = ch.is_ascii_uppercase();
        if is_upper && prev_lower {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
    }
    out
}
