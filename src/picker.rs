use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::domain::STORMWORKS_APP_ID;

/// Minimal directory browser backing the "Browse..." action.
#[derive(Debug, Clone)]
pub struct DirPicker {
    cwd: Utf8PathBuf,
    entries: Vec<String>,
    selected: usize,
    error: Option<String>,
}

impl DirPicker {
    pub fn open(start: &Utf8Path) -> Self {
        let mut picker = Self {
            cwd: start.to_path_buf(),
            entries: Vec::new(),
            selected: 0,
            error: None,
        };
        picker.refresh();
        picker
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    /// Enters the highlighted subdirectory.
    pub fn descend(&mut self) {
        if let Some(name) = self.entries.get(self.selected) {
            self.cwd = self.cwd.join(name);
            self.refresh();
        }
    }

    pub fn ascend(&mut self) {
        let Some(parent) = self.cwd.parent().map(Utf8Path::to_path_buf) else {
            return;
        };
        let left = self.cwd.file_name().map(str::to_string);
        self.cwd = parent;
        self.refresh();
        if let Some(left) = left {
            self.selected = self
                .entries
                .iter()
                .position(|name| *name == left)
                .unwrap_or(0);
        }
    }

    fn refresh(&mut self) {
        self.selected = 0;
        match list_subdirs(&self.cwd) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(dir = %self.cwd, "cannot list directory: {err}");
                self.entries = Vec::new();
                self.error = Some(err.to_string());
            }
        }
    }
}

fn list_subdirs(dir: &Utf8Path) -> std::io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir.as_std_path())?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect::<Vec<_>>();
    names.sort_by_key(|name| name.to_lowercase());
    Ok(names)
}

/// Usual Steam workshop content locations for Stormworks, in probe order.
pub fn common_workshop_dirs(home: Option<&Utf8Path>) -> Vec<Utf8PathBuf> {
    let mut candidates = vec![
        Utf8PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps\workshop\content")
            .join(STORMWORKS_APP_ID),
        Utf8PathBuf::from(r"C:\Program Files\Steam\steamapps\workshop\content")
            .join(STORMWORKS_APP_ID),
    ];
    if let Some(home) = home {
        candidates.push(
            home.join(".steam/steam/steamapps/workshop/content")
                .join(STORMWORKS_APP_ID),
        );
        candidates.push(
            home.join(".local/share/Steam/steamapps/workshop/content")
                .join(STORMWORKS_APP_ID),
        );
    }
    candidates
}

/// First existing Steam location, else the home directory, else the working directory.
pub fn default_start_dir() -> Utf8PathBuf {
    let home = BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).ok());
    first_existing(&common_workshop_dirs(home.as_deref()))
        .or(home)
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

fn first_existing(candidates: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    candidates
        .iter()
        .find(|path| path.as_std_path().is_dir())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_into_and_out_of_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("573090/111")).unwrap();
        fs::create_dir_all(root.join("Other")).unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();

        let mut picker = DirPicker::open(&root);
        assert_eq!(picker.entries(), ["573090", "Other"]);

        picker.descend();
        assert_eq!(picker.cwd(), root.join("573090").as_path());
        assert_eq!(picker.entries(), ["111"]);

        picker.ascend();
        assert_eq!(picker.cwd(), root.as_path());
        assert_eq!(picker.selected(), 0);

        picker.move_down();
        picker.move_down();
        assert_eq!(picker.selected(), 1);
        picker.move_up();
        picker.move_up();
        assert_eq!(picker.selected(), 0);
    }

    #[test]
    fn unreadable_directory_is_reported() {
        let picker = DirPicker::open(Utf8Path::new("/definitely/not/here/573090"));
        assert!(picker.entries().is_empty());
        assert!(picker.error().is_some());
    }

    #[test]
    fn probes_home_steam_locations() {
        let temp = tempfile::tempdir().unwrap();
        let home = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let steam = home.join(".local/share/Steam/steamapps/workshop/content/573090");
        fs::create_dir_all(&steam).unwrap();

        let candidates = common_workshop_dirs(Some(home.as_path()));
        assert_eq!(first_existing(&candidates), Some(steam));
    }
}
