//! Title maps: the label/value lists behind selection controls

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used for the entry that clears an optional selection
pub const NONE_LABEL: &str = "<none>";

/// One selectable option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TitleMapItem {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl TitleMapItem {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            group: None,
        }
    }
}

/// An option, or a bucket of options sharing a group label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitleMapEntry {
    Group { group: String, items: Vec<TitleMapItem> },
    Item(TitleMapItem),
}

impl TitleMapEntry {
    fn has_empty_value(&self) -> bool {
        match self {
            TitleMapEntry::Item(item) => item.value.is_null(),
            TitleMapEntry::Group { items, .. } => items.iter().any(|i| i.value.is_null()),
        }
    }

    fn is_grouped(&self) -> bool {
        match self {
            TitleMapEntry::Item(item) => item.group.is_some(),
            TitleMapEntry::Group { .. } => true,
        }
    }
}

// ============================================================================
// Source Classification
// ============================================================================

/// The accepted title map input shapes, decided once up front
#[derive(Debug)]
enum TitleMapSource<'a> {
    /// `[{name, value, group?}]`, optionally filtered by an enum list
    Pairs {
        entries: Vec<TitleMapEntry>,
        allowed: Option<&'a [Value]>,
    },
    /// `["Label A", "Label B"]` parallel to an enum list
    ParallelNames {
        names: Vec<String>,
        values: &'a [Value],
    },
    /// `{"a": "Label A"}`, ordered by an enum list when present
    ValueKeyed {
        labels: &'a Map<String, Value>,
        order: Option<&'a [Value]>,
    },
    /// Enum values double as labels
    EnumOnly(&'a [Value]),
    /// Neither title map nor enum
    Boolean,
}

impl<'a> TitleMapSource<'a> {
    fn classify(title_map: Option<&'a Value>, enum_list: Option<&'a [Value]>) -> Self {
        match (title_map, enum_list) {
            (Some(Value::Array(entries)), Some(values))
                if !entries.is_empty() && entries.iter().all(Value::is_string) =>
            {
                TitleMapSource::ParallelNames {
                    names: entries.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                    values,
                }
            }
            (Some(Value::Array(entries)), allowed) => TitleMapSource::Pairs {
                entries: entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect(),
                allowed,
            },
            (Some(Value::Object(labels)), order) => TitleMapSource::ValueKeyed { labels, order },
            (_, Some(values)) => TitleMapSource::EnumOnly(values),
            (_, None) => TitleMapSource::Boolean,
        }
    }

    fn into_entries(self) -> Vec<TitleMapEntry> {
        match self {
            TitleMapSource::Pairs { entries, allowed: None } => entries,
            TitleMapSource::Pairs {
                entries,
                allowed: Some(allowed),
            } => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    // Enum-filtered pairs are plain options; groups do not survive
                    TitleMapEntry::Item(item) if allowed.contains(&item.value) => {
                        Some(TitleMapEntry::Item(TitleMapItem::new(item.name, item.value)))
                    }
                    _ => None,
                })
                .collect(),
            TitleMapSource::ParallelNames { names, values } => names
                .into_iter()
                .zip(values.iter())
                .map(|(name, value)| TitleMapEntry::Item(TitleMapItem::new(name, value.clone())))
                .collect(),
            TitleMapSource::ValueKeyed {
                labels,
                order: Some(order),
            } => order
                .iter()
                .filter_map(|value| {
                    let label = labels.get(&value_key(value))?;
                    Some(TitleMapEntry::Item(TitleMapItem::new(display(label), value.clone())))
                })
                .collect(),
            TitleMapSource::ValueKeyed { labels, order: None } => labels
                .iter()
                .map(|(key, label)| {
                    TitleMapEntry::Item(TitleMapItem::new(display(label), Value::String(key.clone())))
                })
                .collect(),
            TitleMapSource::EnumOnly(values) => values
                .iter()
                .map(|value| TitleMapEntry::Item(TitleMapItem::new(display(value), value.clone())))
                .collect(),
            TitleMapSource::Boolean => vec![
                TitleMapEntry::Item(TitleMapItem::new("True", Value::Bool(true))),
                TitleMapEntry::Item(TitleMapItem::new("False", Value::Bool(false))),
            ],
        }
    }
}

fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display(value: &Value) -> String {
    value_key(value)
}

// ============================================================================
// Title Map Building
// ============================================================================

/// Build the option list for a selection control.
///
/// Grouped entries are flattened into `group: name` labels when `flat_list`
/// is set, otherwise consecutive entries of one group are collected into a
/// bucket. An optional field gets a leading `<none>` entry unless some entry
/// already carries a null value.
pub fn build_title_map(
    title_map: Option<&Value>,
    enum_list: Option<&[Value]>,
    field_required: bool,
    flat_list: bool,
) -> Vec<TitleMapEntry> {
    let mut entries = TitleMapSource::classify(title_map, enum_list).into_entries();

    if entries.iter().any(TitleMapEntry::is_grouped) {
        entries = if flat_list {
            flatten_groups(entries)
        } else {
            combine_groups(entries)
        };
    }

    let has_empty_value = entries.iter().any(TitleMapEntry::has_empty_value);
    if !field_required && !has_empty_value {
        entries.insert(0, TitleMapEntry::Item(TitleMapItem::new(NONE_LABEL, Value::Null)));
    }
    entries
}

fn flatten_groups(entries: Vec<TitleMapEntry>) -> Vec<TitleMapEntry> {
    let mut flat = Vec::new();
    for entry in entries {
        match entry {
            TitleMapEntry::Group { group, items } => {
                flat.extend(items.into_iter().map(|item| {
                    TitleMapEntry::Item(TitleMapItem::new(format!("{}: {}", group, item.name), item.value))
                }));
            }
            TitleMapEntry::Item(TitleMapItem {
                name,
                value,
                group: Some(group),
            }) => flat.push(TitleMapEntry::Item(TitleMapItem::new(format!("{}: {}", group, name), value))),
            item => flat.push(item),
        }
    }
    flat
}

fn combine_groups(entries: Vec<TitleMapEntry>) -> Vec<TitleMapEntry> {
    let mut combined: Vec<TitleMapEntry> = Vec::new();
    for entry in entries {
        let (group, items) = match entry {
            TitleMapEntry::Group { group, items } => (group, items),
            TitleMapEntry::Item(TitleMapItem {
                name,
                value,
                group: Some(group),
            }) => (group, vec![TitleMapItem::new(name, value)]),
            item => {
                combined.push(item);
                continue;
            }
        };
        match combined.last_mut() {
            Some(TitleMapEntry::Group {
                group: last_group,
                items: bucket,
            }) if *last_group == group => bucket.extend(items),
            _ => combined.push(TitleMapEntry::Group { group, items }),
        }
    }
    combined
}
