//! Merging of partial schema summaries
//!
//! Contributions are folded left to right. Scalars keep the first value
//! seen, descriptions accumulate, and property lists / item schemas merge
//! recursively. The fold is therefore order-sensitive for scalar fields.

use crate::types::{SchemaProperty, SchemaSummary};

const DESCRIPTION_SEPARATOR: &str = "; ";

/// Merge contributions in order; `None` when nothing carried data
pub fn merge_summaries<I>(contributions: I) -> Option<SchemaSummary>
where
    I: IntoIterator<Item = SchemaSummary>,
{
    let mut merged = SchemaSummary::default();
    for contribution in contributions {
        merge_into(&mut merged, contribution);
    }
    fill_items_view(&mut merged);
    merged.into_option()
}

/// Fold one contribution into an accumulator
pub fn merge_into(acc: &mut SchemaSummary, next: SchemaSummary) {
    let SchemaSummary {
        schema_type,
        format,
        title,
        description,
        enum_values,
        items_type,
        items_enum,
        items_schema,
        properties,
        default,
        example,
        reference,
    } = next;

    first_wins(&mut acc.schema_type, schema_type);
    first_wins(&mut acc.format, format);
    first_wins(&mut acc.title, title);
    first_wins(&mut acc.reference, reference);
    first_wins(&mut acc.enum_values, enum_values);
    first_wins(&mut acc.items_type, items_type);
    first_wins(&mut acc.items_enum, items_enum);
    first_wins(&mut acc.default, default);
    first_wins(&mut acc.example, example);

    if let Some(description) = description {
        append_description(&mut acc.description, &description);
    }

    if let Some(items) = items_schema {
        match acc.items_schema.as_mut() {
            Some(existing) => merge_into(existing, *items),
            None => acc.items_schema = Some(items),
        }
        if let Some(existing) = acc.items_schema.as_mut() {
            fill_items_view(existing);
        }
    }

    if let Some(props) = properties.filter(|p| !p.is_empty()) {
        let existing = acc.properties.get_or_insert_with(Vec::new);
        merge_properties(existing, props);
    }
}

/// Append a description unless it is blank or already contained
pub fn append_description(acc: &mut Option<String>, next: &str) {
    let next = next.trim();
    if next.is_empty() {
        return;
    }
    let Some(current) = acc.as_mut() else {
        *acc = Some(next.to_string());
        return;
    };
    if current.contains(next) {
        return;
    }
    if !current.is_empty() {
        current.push_str(DESCRIPTION_SEPARATOR);
    }
    current.push_str(next);
}

fn first_wins<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Union by name, keeping first-seen order
fn merge_properties(existing: &mut Vec<SchemaProperty>, incoming: Vec<SchemaProperty>) {
    for prop in incoming {
        match existing.iter_mut().find(|p| p.name == prop.name) {
            Some(current) => {
                current.required |= prop.required;
                if current.description.is_none() {
                    current.description = prop.description;
                }
                if let Some(schema) = prop.schema {
                    match current.schema.as_mut() {
                        Some(current_schema) => {
                            merge_into(current_schema, schema);
                            fill_items_view(current_schema);
                        }
                        None => current.schema = Some(schema),
                    }
                }
            }
            None => existing.push(prop),
        }
    }
}

/// Derive the denormalized `itemsType` / `itemsEnum` from `itemsSchema`
fn fill_items_view(summary: &mut SchemaSummary) {
    if let Some(items) = summary.items_schema.as_deref() {
        if summary.items_type.is_none() {
            summary.items_type = items.schema_type.clone();
        }
        if summary.items_enum.is_none() {
            summary.items_enum = items.enum_values.clone();
        }
    }
}
