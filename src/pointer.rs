//! JSON Pointer algebra
//!
//! Data, schema and layout pointers are all RFC 6901 strings. A *generic*
//! pointer uses `-` in place of array indices, meaning "any list item".

use serde_json::Value;
use std::collections::HashMap;

/// Wildcard segment used by generic pointers
pub const WILDCARD: &str = "-";

// ============================================================================
// Parsing and Compiling
// ============================================================================

/// Escape one pointer segment (`~` → `~0`, `/` → `~1`)
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`]
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Strip a URI fragment marker so `#/definitions/a` reads as `/definitions/a`
fn strip_fragment(pointer: &str) -> &str {
    pointer.strip_prefix('#').unwrap_or(pointer)
}

/// Whether a string is a JSON pointer (or a `#` fragment pointer)
pub fn is_pointer(candidate: &str) -> bool {
    let p = strip_fragment(candidate);
    p.is_empty() || p.starts_with('/')
}

/// Split a pointer into unescaped segments. Returns `None` for strings that
/// are not pointers.
pub fn parse(pointer: &str) -> Option<Vec<String>> {
    let p = strip_fragment(pointer);
    if p.is_empty() {
        return Some(Vec::new());
    }
    if !p.starts_with('/') {
        return None;
    }
    Some(p[1..].split('/').map(unescape).collect())
}

/// Join segments into a pointer
pub fn compile<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", escape(s.as_ref())))
        .collect()
}

/// Join segments, replacing empty segments with `default`
pub fn compile_with_default<S: AsRef<str>>(segments: &[S], default: &str) -> String {
    segments
        .iter()
        .map(|s| {
            let s = s.as_ref();
            if s.is_empty() {
                format!("/{}", escape(default))
            } else {
                format!("/{}", escape(s))
            }
        })
        .collect()
}

/// Normalize `#/a/b` into `/a/b`; non-pointers pass through unchanged
pub fn normalize(pointer: &str) -> String {
    match parse(pointer) {
        Some(segments) => compile(&segments),
        None => pointer.to_string(),
    }
}

/// Parse a dotted object path (`user.address[0].city`, `tags[]`,
/// `map['a key']`) into segments. Empty brackets produce an empty segment,
/// which [`compile_with_default`] turns into the wildcard.
pub fn parse_object_path(path: &str) -> Vec<String> {
    if is_pointer(path) {
        return parse(path).unwrap_or_default();
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim();
                let unquoted = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                    .unwrap_or(inner);
                segments.push(unquoted.to_string());
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Last segment of a pointer, if any
pub fn to_key(pointer: &str) -> Option<String> {
    parse(pointer).and_then(|mut segments| segments.pop())
}

/// Pointer to the parent location (`/a/b` → `/a`)
pub fn parent(pointer: &str) -> Option<String> {
    let mut segments = parse(pointer)?;
    segments.pop()?;
    Some(compile(&segments))
}

/// True when `short` addresses `long` or one of its ancestors. Containment
/// is checked on segment boundaries, so `/a/b` does not contain `/a/bc`.
pub fn is_sub_pointer(short: &str, long: &str) -> bool {
    let short = strip_fragment(short);
    let long = strip_fragment(long);
    if short.is_empty() {
        return true;
    }
    long == short || (long.starts_with(short) && long[short.len()..].starts_with('/'))
}

// ============================================================================
// Value Access
// ============================================================================

/// Fetch the value at a pointer
pub fn get<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(strip_fragment(pointer))
}

/// First value found among several (value, pointer) lookups
pub fn get_first<'a>(lookups: &[(&'a Value, &str)]) -> Option<&'a Value> {
    lookups
        .iter()
        .find_map(|(value, pointer)| get(value, pointer).filter(|v| !v.is_null()))
}

/// Replace the value at an existing pointer location
pub fn set(value: &mut Value, pointer: &str, new_value: Value) -> bool {
    match value.pointer_mut(strip_fragment(pointer)) {
        Some(slot) => {
            *slot = new_value;
            true
        }
        None => false,
    }
}

/// Control flow for [`for_each_deep`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

/// Pre-order walk over every value in a tree, with each value's pointer
pub fn for_each_deep<F>(value: &Value, f: &mut F)
where
    F: FnMut(&Value, &str) -> Walk,
{
    walk_value(value, "", f);
}

fn walk_value<F>(value: &Value, pointer: &str, f: &mut F)
where
    F: FnMut(&Value, &str) -> Walk,
{
    if f(value, pointer) == Walk::SkipChildren {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk_value(child, &format!("{}/{}", pointer, escape(key)), f);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk_value(child, &format!("{}/{}", pointer, index), f);
            }
        }
        _ => {}
    }
}

/// Post-order walk: children before their parent
pub fn for_each_deep_post<F>(value: &Value, f: &mut F)
where
    F: FnMut(&Value, &str),
{
    walk_value_post(value, "", f);
}

fn walk_value_post<F>(value: &Value, pointer: &str, f: &mut F)
where
    F: FnMut(&Value, &str),
{
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk_value_post(child, &format!("{}/{}", pointer, escape(key)), f);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk_value_post(child, &format!("{}/{}", pointer, index), f);
            }
        }
        _ => {}
    }
    f(value, pointer);
}

// ============================================================================
// Pointer Conversions
// ============================================================================

/// Replace list-position indices with `-`.
///
/// `array_map` maps generic array pointers to their tuple count; an index at
/// or beyond that count is a list position.
pub fn to_generic_pointer(pointer: &str, array_map: &HashMap<String, usize>) -> String {
    let Some(mut segments) = parse(pointer) else {
        return pointer.to_string();
    };
    for i in 0..segments.len() {
        let Ok(index) = segments[i].parse::<usize>() else {
            continue;
        };
        let array_pointer = compile(&segments[..i]);
        if let Some(tuple_items) = array_map.get(&array_pointer) {
            if *tuple_items <= index {
                segments[i] = WILDCARD.to_string();
            }
        }
    }
    compile(&segments)
}

/// Project a schema pointer onto the data it describes by dropping the
/// structural keywords (`/properties/a/items` → `/a/-`).
///
/// Returns `None` for pointers into non-data parts of the schema
/// (`definitions`, `oneOf`, `additionalProperties`, ...).
pub fn to_data_pointer(schema_pointer: &str, schema: &Value) -> Option<String> {
    let segments = parse(schema_pointer)?;
    let mut data = Vec::new();
    let mut node = schema;
    let mut i = 0;

    while i < segments.len() {
        match segments[i].as_str() {
            "properties" => {
                let key = segments.get(i + 1)?;
                node = node.get("properties")?.get(key)?;
                data.push(key.clone());
                i += 2;
            }
            "items" => {
                let items = node.get("items")?;
                if let Value::Array(tuple) = items {
                    let index: usize = segments.get(i + 1)?.parse().ok()?;
                    node = tuple.get(index)?;
                    data.push(index.to_string());
                    i += 2;
                } else {
                    node = items;
                    data.push(WILDCARD.to_string());
                    i += 1;
                }
            }
            "additionalItems" => {
                node = node.get("additionalItems")?;
                data.push(WILDCARD.to_string());
                i += 1;
            }
            _ => return None,
        }
    }
    Some(compile(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_compile() {
        assert_eq!(parse("").unwrap(), Vec::<String>::new());
        assert_eq!(parse("/a/b~1c/d~0e").unwrap(), vec!["a", "b/c", "d~e"]);
        assert_eq!(parse("#/definitions/node").unwrap(), vec!["definitions", "node"]);
        assert!(parse("no-slash").is_none());
        assert_eq!(compile(&["a", "b/c"]), "/a/b~1c");
        assert_eq!(compile::<&str>(&[]), "");
    }

    #[test]
    fn test_parse_object_path() {
        assert_eq!(parse_object_path("user.address.city"), vec!["user", "address", "city"]);
        assert_eq!(parse_object_path("items[0].name"), vec!["items", "0", "name"]);
        assert_eq!(parse_object_path("tags[]"), vec!["tags", ""]);
        assert_eq!(parse_object_path("map['a key']"), vec!["map", "a key"]);
        assert_eq!(compile_with_default(&parse_object_path("tags[].label"), "-"), "/tags/-/label");
    }

    #[test]
    fn test_is_sub_pointer() {
        assert!(is_sub_pointer("", "/a"));
        assert!(is_sub_pointer("/a", "/a"));
        assert!(is_sub_pointer("/a", "/a/b"));
        assert!(!is_sub_pointer("/a/b", "/a/bc"));
        assert!(!is_sub_pointer("/a/b", "/a"));
    }

    #[test]
    fn test_to_generic_pointer() {
        let mut array_map = HashMap::new();
        array_map.insert("/list".to_string(), 0);
        array_map.insert("/pair".to_string(), 2);
        array_map.insert("".to_string(), 0);

        assert_eq!(to_generic_pointer("/list/3/name", &array_map), "/list/-/name");
        assert_eq!(to_generic_pointer("/pair/1", &array_map), "/pair/1");
        assert_eq!(to_generic_pointer("/pair/2", &array_map), "/pair/-");
        assert_eq!(to_generic_pointer("/0", &array_map), "/-");
        assert_eq!(to_generic_pointer("/other/4", &array_map), "/other/4");
    }

    #[test]
    fn test_to_data_pointer() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": { "type": "array", "items": { "type": "string" } },
                "pair": {
                    "type": "array",
                    "items": [{ "type": "string" }, { "type": "number" }],
                    "additionalItems": { "type": "boolean" }
                }
            }
        });
        assert_eq!(to_data_pointer("", &schema).unwrap(), "");
        assert_eq!(to_data_pointer("/properties/tags/items", &schema).unwrap(), "/tags/-");
        assert_eq!(to_data_pointer("/properties/pair/items/1", &schema).unwrap(), "/pair/1");
        assert_eq!(to_data_pointer("/properties/pair/additionalItems", &schema).unwrap(), "/pair/-");
        assert!(to_data_pointer("/definitions/x", &schema).is_none());
    }

    #[test]
    fn test_for_each_deep_skips_children() {
        let value = json!({ "a": { "b": 1 }, "enum": [{ "$ref": "#/x" }] });
        let mut seen = Vec::new();
        for_each_deep(&value, &mut |_, pointer| {
            seen.push(pointer.to_string());
            if pointer.ends_with("/enum") {
                Walk::SkipChildren
            } else {
                Walk::Continue
            }
        });
        assert_eq!(seen, vec!["", "/a", "/a/b", "/enum"]);
    }

    #[test]
    fn test_for_each_deep_post_visits_children_first() {
        let value = json!({ "a": [1, { "b": 2 }] });
        let mut seen = Vec::new();
        for_each_deep_post(&value, &mut |_, pointer| seen.push(pointer.to_string()));
        assert_eq!(seen, vec!["/a/0", "/a/1/b", "/a/1", "/a", ""]);
    }
}
