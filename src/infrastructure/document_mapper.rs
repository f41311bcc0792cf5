use crate::domain::models::{DayKey, DayStatus, DayStatusMap};
use std::collections::BTreeMap;

pub const DAYS_FIELD: &str = "days";

/// A Firestore REST document. Only string and map values are modelled; any
/// other value kind deserializes with both fields unset.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FirestoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FirestoreValue {
    #[serde(rename = "stringValue", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(rename = "mapValue", default, skip_serializing_if = "Option::is_none")]
    pub map_value: Option<FirestoreMapValue>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FirestoreMapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct FirestoreErrorEnvelope {
    pub error: Option<FirestoreErrorBody>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct FirestoreErrorBody {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl FirestoreValue {
    fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            map_value: None,
        }
    }
}

/// Builds a document whose `days` map holds the given raw entries.
pub fn days_document<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> FirestoreDocument
where
    K: Into<String>,
    V: Into<String>,
{
    let fields = entries
        .into_iter()
        .map(|(key, value)| (key.into(), FirestoreValue::string(value)))
        .collect();
    let mut document = FirestoreDocument::default();
    document.fields.insert(
        DAYS_FIELD.to_string(),
        FirestoreValue {
            string_value: None,
            map_value: Some(FirestoreMapValue { fields }),
        },
    );
    document
}

/// Reads `days` from a document, keeping only well-formed keys marked `japan`.
pub fn decode_day_statuses(document: &FirestoreDocument) -> DayStatusMap {
    let Some(days) = document
        .fields
        .get(DAYS_FIELD)
        .and_then(|value| value.map_value.as_ref())
    else {
        return DayStatusMap::new();
    };

    days.fields
        .iter()
        .filter_map(|(raw_key, value)| {
            let status = value.string_value.as_deref().and_then(DayStatus::parse)?;
            let key = DayKey::parse(raw_key).ok()?;
            Some((key, status))
        })
        .collect()
}

pub fn encode_day_status(key: DayKey, status: DayStatus) -> FirestoreDocument {
    days_document([(key.to_string(), status.as_str())])
}

/// Field path addressing one day inside `days`. Day keys contain `-`, so the
/// segment has to be back-quoted.
pub fn day_field_path(key: DayKey) -> String {
    format!("{DAYS_FIELD}.`{key}`")
}
