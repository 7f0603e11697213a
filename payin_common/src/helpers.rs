use std::str::FromStr;

/// Interpret an optional string value as a boolean flag, falling back to `default` when the value is absent or
/// not one of the recognised spellings.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse an optional string into any `FromStr` type, falling back to `default` on absence or parse failure.
/// The caller decides whether a failed parse is worth logging.
pub fn parse_or_default<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}
