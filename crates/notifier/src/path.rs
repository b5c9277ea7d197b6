//! Object path contract for SOS recordings.
//!
//! Recordings are uploaded as
//! `sos_recordings/{uid}/Triggered_on_{dateFolder}/{filename}`. Every file
//! under one `Triggered_on_` folder belongs to the same SOS session.

const ROOT_SEGMENT: &str = "sos_recordings";
const SESSION_PREFIX: &str = "Triggered_on_";

/// A validated recording path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingPath {
    pub uid: String,
    pub date_folder: String,
}

impl RecordingPath {
    /// Parse an object path. Returns `None` for anything outside the contract.
    pub fn parse(object_path: &str) -> Option<Self> {
        let segments: Vec<&str> = object_path.split('/').collect();
        if segments.len() < 4 || segments[0] != ROOT_SEGMENT {
            return None;
        }

        let date_folder = segments[2].strip_prefix(SESSION_PREFIX)?;

        Some(Self {
            uid: segments[1].to_string(),
            date_folder: date_folder.to_string(),
        })
    }

    /// Prefix shared by every file of this session, with trailing slash.
    pub fn group_prefix(&self) -> String {
        format!(
            "{}/{}/{}{}/",
            ROOT_SEGMENT, self.uid, SESSION_PREFIX, self.date_folder
        )
    }
}
