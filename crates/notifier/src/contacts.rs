//! Emergency contact normalization.
//!
//! Contacts arrive in whatever shape the mobile client wrote: a list or a
//! keyed map, holding bare phone strings or objects with a phone-like field.

use serde_json::Value;

/// Fields probed, in order, when a contact is an object.
pub const PHONE_FIELDS: &[&str] = &["phone", "number", "mobile"];

/// Flatten the stored `emergencyContacts` value into a list of entries.
///
/// Lists are taken as-is, maps contribute their values in stored key order,
/// a single bare string counts as one contact, and anything else yields
/// nothing.
pub fn normalize(contacts: &Value) -> Vec<&Value> {
    match contacts {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        Value::String(_) => vec![contacts],
        _ => Vec::new(),
    }
}

/// Resolve the phone number for a single contact entry.
pub fn resolve_phone(contact: &Value) -> Option<String> {
    match contact {
        Value::Object(fields) => PHONE_FIELDS
            .iter()
            .find_map(|field| fields.get(*field).and_then(phone_value)),
        other => phone_value(other),
    }
}

/// Resolve every reachable phone number, in stored order.
pub fn recipients(contacts: &Value) -> Vec<String> {
    normalize(contacts)
        .into_iter()
        .filter_map(|contact| {
            let phone = resolve_phone(contact);
            if phone.is_none() {
                tracing::info!(contact = %contact, "Skipping contact without phone");
            }
            phone
        })
        .collect()
}

/// A usable phone number from a scalar: trimmed non-empty strings, or
/// numbers rendered in decimal.
pub fn phone_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
