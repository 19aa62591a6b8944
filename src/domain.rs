use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::InstallError;

/// Steam app id of Stormworks; workshop content lives under `.../content/573090`.
pub const STORMWORKS_APP_ID: &str = "573090";

/// File the game reads from a vehicle workshop item folder.
pub const VEHICLE_FILE_NAME: &str = "vehicle.xml";

static ID_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"id=(\d+)").unwrap());

/// Numeric Steam Workshop item id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkshopId(String);

impl WorkshopId {
    /// Pulls an item id out of a workshop URL (`...?id=12345`) or a bare numeric id.
    ///
    /// The `id=<digits>` parameter wins when present anywhere in the input; otherwise the
    /// whole input, trimmed, must be digits.
    pub fn extract(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        if let Some(captures) = ID_PARAM.captures(input) {
            return Some(Self(captures[1].to_string()));
        }
        let trimmed = input.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Some(Self(trimmed.to_string()));
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkshopId {
    type Err = InstallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::extract(value).ok_or_else(|| InstallError::InvalidItemId(value.to_string()))
    }
}

/// The three form inputs captured for a single install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub workshop_dir: Utf8PathBuf,
    pub item_input: String,
    pub source_url: String,
}

impl InstallRequest {
    pub fn new(
        workshop_dir: impl Into<Utf8PathBuf>,
        item_input: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            workshop_dir: workshop_dir.into(),
            item_input: item_input.into(),
            source_url: source_url.into(),
        }
    }

    pub fn has_all_inputs(&self) -> bool {
        !self.workshop_dir.as_str().is_empty()
            && !self.item_input.is_empty()
            && !self.source_url.is_empty()
    }
}

pub fn item_dir(workshop_dir: &Utf8Path, id: &WorkshopId) -> Utf8PathBuf {
    workshop_dir.join(id.as_str())
}

pub fn vehicle_path(workshop_dir: &Utf8Path, id: &WorkshopId) -> Utf8PathBuf {
    item_dir(workshop_dir, id).join(VEHICLE_FILE_NAME)
}

/// Whether a chosen folder looks like the Stormworks workshop content folder.
pub fn looks_like_workshop_dir(path: &Utf8Path) -> bool {
    path.file_name() == Some(STORMWORKS_APP_ID) || path.as_str() == STORMWORKS_APP_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_id_parameter() {
        let id = WorkshopId::extract("https://steamcommunity.com/sharedfiles/filedetails/?id=12345")
            .unwrap();
        assert_eq!(id.as_str(), "12345");

        let id = WorkshopId::extract("999 ?id=42&searchtext=").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn extract_rejects_other_shapes() {
        for input in ["abc", "", "id=", "12a34", "   ", "id=abc"] {
            assert!(WorkshopId::extract(input).is_none(), "input {input:?}");
        }
    }

    #[test]
    fn vehicle_path_layout() {
        let id: WorkshopId = "3000111222".parse().unwrap();
        let path = vehicle_path(Utf8Path::new("/steam/content/573090"), &id);
        assert!(path.ends_with("573090/3000111222/vehicle.xml"));
    }

    #[test]
    fn workshop_dir_heuristic() {
        assert!(looks_like_workshop_dir(Utf8Path::new(
            "/home/user/.steam/steam/steamapps/workshop/content/573090"
        )));
        assert!(looks_like_workshop_dir(Utf8Path::new("573090")));
        assert!(!looks_like_workshop_dir(Utf8Path::new("/home/user/Downloads")));
    }
}
