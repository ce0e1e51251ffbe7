//! # Canonical Signing Strings
//!
//! The platform authenticates requests with a digest over a canonical
//! rendering of the request's fields. Both sides must produce byte-identical
//! strings, so the rules here are rigid:
//!
//! 1. Drop the `sign` field, whatever its value.
//! 2. Drop fields whose value is the empty string. Absence is the signal for
//!    "omit"; `"0"` is a value like any other.
//! 3. Sort the remaining names by plain byte order (not locale order).
//! 4. Render `name=value`, join with `&`, append `&key=<secret>`.
//!
//! A record with no signable fields canonicalizes to `key=<secret>`. That is
//! degenerate but well-defined, so it is not an error.
//!
//! Values must already be in their final wire form. Nothing here formats
//! numbers or rounds money: amounts are integer fen before they get here.

use std::collections::BTreeMap;

use crate::config::{KEY_FIELD, SIGN_FIELD};

/// A flat field-name to wire-value mapping.
///
/// Backed by a `BTreeMap`, whose `String` ordering is byte-wise, so
/// iteration order is already the canonical order. Insertion order never
/// matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningRecord {
    fields: BTreeMap<String, String>,
}

impl SigningRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.fields.insert(name.into(), value.to_string());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Value of a field, or `""` when absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// The `sign` field, if present.
    pub fn signature(&self) -> Option<&str> {
        self.get(SIGN_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in byte-wise name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fields that take part in signing, in canonical order.
    pub fn signable_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter(|(name, value)| *name != SIGN_FIELD && !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SigningRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A request or response shape with a fixed list of wire fields.
///
/// Implementors list every field they put on the wire, under its exact
/// platform name, already rendered as text. Optional fields render as `""`
/// and drop out of both the signature and the XML body.
pub trait Signable {
    fn signing_fields(&self) -> Vec<(&'static str, String)>;

    /// Flatten into a [`SigningRecord`], skipping empty values.
    fn to_record(&self) -> SigningRecord {
        self.signing_fields()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}

/// Render the canonical signing string for `record` under `secret`.
///
/// The result embeds the secret. Hash it and drop it; never log it.
pub fn canonicalize(record: &SigningRecord, secret: &str) -> String {
    let mut out = String::with_capacity(64 * record.len() + secret.len());
    for (name, value) in record.signable_fields() {
        out.push_str(name);
        out.push('=');
        out.push_str(value);
        out.push('&');
    }
    out.push_str(KEY_FIELD);
    out.push('=');
    out.push_str(secret);
    out
}
