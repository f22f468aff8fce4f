// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Naming conventions used to normalize constraint names.

/// Maps a constraint name onto a dialect's naming convention.
pub type Inflection = fn(&str) -> String;

/// `maxLength`, `max-length` and `max_length` all become `max_length`.
/// Leading underscores are dropped.
pub fn underscore(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, c) in chars.iter().copied().enumerate() {
        if c == '-' {
            out.push('_');
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out.trim_start_matches('_').to_string()
}

/// `max_length`, `max-length` and `maxLength` all become `maxLength`.
pub fn lower_camel(name: &str) -> String {
    let normalized = name.replace('-', "_");
    let mut out = String::with_capacity(normalized.len());

    for (i, word) in normalized.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_forms() {
        assert_eq!(underscore("maxLength"), "max_length");
        assert_eq!(underscore("max-length"), "max_length");
        assert_eq!(underscore("max_length"), "max_length");
        assert_eq!(underscore("_type"), "type");
        assert_eq!(underscore("HTTPServer"), "http_server");
        assert_eq!(underscore("ipv4"), "ipv4");
        assert_eq!(underscore("dateTime"), "date_time");
    }

    #[test]
    fn lower_camel_forms() {
        assert_eq!(lower_camel("max_length"), "maxLength");
        assert_eq!(lower_camel("max-length"), "maxLength");
        assert_eq!(lower_camel("maxLength"), "maxLength");
        assert_eq!(lower_camel("additional_entries"), "additionalEntries");
        assert_eq!(lower_camel("type"), "type");
        assert_eq!(lower_camel("_if"), "if");
    }
}
