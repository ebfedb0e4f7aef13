//! Typed views over the API payloads the traversals navigate.
//!
//! Payloads are archived exactly as received (as [`serde_json::Value`]);
//! these structs only pick out the fields needed to decide what to fetch
//! next. Unknown fields are ignored and most fields are optional because the
//! service omits them freely.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use super::error::ArchiveError;
use super::variant::PhotoVariant;

/// Deserializes a typed view from a payload, naming `context` on failure.
///
/// # Errors
///
/// [`ArchiveError::Shape`] when required fields are missing or mistyped.
pub fn view<T: DeserializeOwned>(value: &Value, context: &str) -> Result<T, ArchiveError> {
    T::deserialize(value).map_err(|e| ArchiveError::shape(context, e))
}

/// An identifier the service sends as either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(pub String);

impl ItemId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected string or number id, got {other}"
            ))),
        }
    }
}

/// Seconds since the epoch, sent as a number or a numeric string.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ==================== Messages ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<MessageSummary>,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub next_page_start: Option<i64>,
    #[serde(default)]
    pub last_record_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub message_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "timestamp")]
    pub post_date: Option<i64>,
    #[serde(default)]
    pub attachments_info: Vec<AttachmentFile>,
}

// ==================== Attachments ====================

/// A file attached to a message or listed under an attachment record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFile {
    pub file_id: ItemId,
    pub filename: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub photo_info: Vec<PhotoVariant>,
    #[serde(default, deserialize_with = "timestamp")]
    pub modification_date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentList {
    #[serde(default)]
    pub attachments: Vec<AttachmentSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSummary {
    pub attachment_id: ItemId,
    #[serde(default, deserialize_with = "timestamp")]
    pub modification_date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub files: Vec<AttachmentFile>,
}

// ==================== Files ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    #[serde(default)]
    pub dir_entries: Vec<DirEntry>,
    /// Entry count as reported by the service; known to be off at times.
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    #[serde(rename = "type")]
    pub kind: i64,
    pub file_name: String,
    #[serde(default, rename = "downloadURL")]
    pub download_url: Option<String>,
    #[serde(default, rename = "pathURI")]
    pub path_uri: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_time: Option<i64>,
}

impl DirEntry {
    pub const FILE: i64 = 0;
    pub const DIRECTORY: i64 = 1;
}

// ==================== Photos ====================

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub album_id: ItemId,
    #[serde(default)]
    pub album_name: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub modification_date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub photo_id: ItemId,
    #[serde(default)]
    pub photo_name: String,
    #[serde(default)]
    pub photo_info: Vec<PhotoVariant>,
    #[serde(default, deserialize_with = "timestamp")]
    pub creation_date: Option<i64>,
}

// ==================== Databases ====================

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseList {
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub table_id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub date_last_modified: Option<i64>,
}

// ==================== Links ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkListing {
    #[serde(default)]
    pub num_link: u64,
    #[serde(default)]
    pub num_dir: u64,
    #[serde(default)]
    pub dirs: Vec<LinkFolder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkFolder {
    pub folder: String,
}

// ==================== About / calendar ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    #[serde(default)]
    pub entity_id: Option<ItemId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub group_home_page: Option<HomePage>,
    #[serde(default)]
    pub group_cover_photo: Option<CoverPhoto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    #[serde(default)]
    pub photo_info: Option<Vec<PhotoVariant>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverPhoto {
    #[serde(default)]
    pub has_cover_image: bool,
    #[serde(default)]
    pub photo_info: Vec<PhotoVariant>,
}

/// The error body of the deliberately failing calendar handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRejection {
    pub calendar_error: CalendarError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarError {
    #[serde(default)]
    pub wssid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarWindow {
    pub events: CalendarEvents,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvents {
    #[serde(default)]
    pub count: u64,
}

// ==================== Polls / members ====================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub survey_id: ItemId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(default, deserialize_with = "timestamp")]
    pub date_created: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub members: Vec<Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id_accepts_number_and_string() {
        let a: ItemId = serde_json::from_value(json!(42)).unwrap();
        let b: ItemId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(a.as_str(), "42");
        assert_eq!(b.to_string(), "abc");
        assert!(serde_json::from_value::<ItemId>(json!(null)).is_err());
    }

    #[test]
    fn test_timestamp_accepts_number_string_and_absent() {
        let poll: Poll = serde_json::from_value(json!({"dateCreated": 1_200_000_000})).unwrap();
        assert_eq!(poll.date_created, Some(1_200_000_000));

        let poll: Poll = serde_json::from_value(json!({"dateCreated": "1300000000"})).unwrap();
        assert_eq!(poll.date_created, Some(1_300_000_000));

        let poll: Poll = serde_json::from_value(json!({})).unwrap();
        assert_eq!(poll.date_created, None);

        let poll: Poll = serde_json::from_value(json!({"dateCreated": null})).unwrap();
        assert_eq!(poll.date_created, None);
    }

    #[test]
    fn test_dir_entry_renamed_fields() {
        let entry: DirEntry = serde_json::from_value(json!({
            "type": 1,
            "fileName": "Docs",
            "pathURI": "%2FDocs",
            "createdTime": 5
        }))
        .unwrap();
        assert_eq!(entry.kind, DirEntry::DIRECTORY);
        assert_eq!(entry.path_uri.as_deref(), Some("%2FDocs"));
        assert_eq!(entry.download_url, None);
    }

    #[test]
    fn test_view_reports_context() {
        let err = view::<MessageSummary>(&json!({"nope": 1}), "message listing").unwrap_err();
        assert!(err.to_string().contains("message listing"));
    }
}
