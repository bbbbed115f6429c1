use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// A record reachable by one or more lookup keys.
pub trait Keyed {
    /// The key that identifies this record in its registry.
    fn primary_key(&self) -> &str;

    /// Other keys the record may be looked up by. Empty strings are ignored.
    fn alternate_keys(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Records in source order, plus a map from every key variant to the owning record.
///
/// A record whose primary key repeats an earlier one replaces it in place (last inserted wins).
/// Alternate keys are claimed only after all primary keys, so they never shadow another record's
/// primary key; between alternate keys the last record wins.
#[derive(Debug, Clone)]
pub struct RecordIndex<T> {
    records: Vec<T>,
    keys: HashMap<String, usize>,
}

impl<T: Keyed> RecordIndex<T> {
    pub fn build(source: impl IntoIterator<Item = T>) -> Self {
        let mut records: Vec<T> = Vec::new();
        let mut keys = HashMap::new();

        for record in source {
            let key = normalize_key(record.primary_key());
            match keys.get(&key) {
                Some(&position) => records[position] = record,
                None => {
                    keys.insert(key, records.len());
                    records.push(record);
                }
            }
        }

        let mut alternates = Vec::new();
        for (position, record) in records.iter().enumerate() {
            for key in record.alternate_keys() {
                if !key.trim().is_empty() {
                    alternates.push((normalize_key(key), position));
                }
            }
        }
        let primary_keys = keys.clone();
        for (key, position) in alternates {
            if !primary_keys.contains_key(&key) {
                keys.insert(key, position);
            }
        }

        RecordIndex { records, keys }
    }

    /// The record owning `key`. Case-insensitive; short numeric keys are zero-padded to three
    /// digits, so `"36"` finds ISO numeric code `036`.
    pub fn get(&self, key: &str) -> Result<&T> {
        self.keys
            .get(&normalize_key(key))
            .map(|&position| &self.records[position])
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(&normalize_key(key))
    }
}

impl<T> RecordIndex<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Serialized as the plain record sequence; keys are derivable from the records.
impl<T: Serialize> Serialize for RecordIndex<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

pub(crate) fn normalize_key(key: &str) -> String {
    let key = key.trim();
    if !key.is_empty() && key.len() < 3 && key.bytes().all(|b| b.is_ascii_digit()) {
        format!("{key:0>3}")
    } else {
        key.to_lowercase()
    }
}
