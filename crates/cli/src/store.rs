use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use prosper_core::{ApplicationError, HouseholdId, Profile, ProfileStore};

/// One pretty-printed JSON file per household under `root`.
#[derive(Clone, Debug)]
pub struct FileProfileStore {
    root: PathBuf,
}

impl FileProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, household: &HouseholdId) -> PathBuf {
        let file_name: String = household
            .0
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl ProfileStore for FileProfileStore {
    fn load_latest(&self, household: &HouseholdId) -> Result<Option<Profile>, ApplicationError> {
        read_profile(&self.path_for(household))
    }

    fn save(
        &self,
        household: &HouseholdId,
        profile: Profile,
        expected_version: u64,
    ) -> Result<(), ApplicationError> {
        let path = self.path_for(household);
        let actual = read_profile(&path)?.map_or(0, |stored| stored.version());
        if actual != expected_version {
            return Err(ApplicationError::VersionConflict {
                household: household.clone(),
                expected: expected_version,
                actual,
            });
        }

        fs::create_dir_all(&self.root).map_err(|error| {
            ApplicationError::Persistence(format!(
                "could not create store directory `{}`: {error}",
                self.root.display()
            ))
        })?;
        let rendered = serde_json::to_string_pretty(&profile).map_err(|error| {
            ApplicationError::Persistence(format!("could not serialize profile: {error}"))
        })?;
        fs::write(&path, rendered + "\n").map_err(|error| {
            ApplicationError::Persistence(format!("could not write `{}`: {error}", path.display()))
        })
    }
}

fn read_profile(path: &Path) -> Result<Option<Profile>, ApplicationError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(ApplicationError::Persistence(format!(
                "could not read `{}`: {error}",
                path.display()
            )))
        }
    };
    serde_json::from_str(&raw).map(Some).map_err(|error| {
        ApplicationError::Persistence(format!("`{}` is not a valid profile: {error}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use prosper_core::{ApplicationError, HouseholdId, Profile, ProfileStore, SlotKey};

    use super::FileProfileStore;

    #[test]
    fn saves_and_reloads_profiles_with_version_checks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileProfileStore::new(dir.path().join("households"));
        let household = HouseholdId("smith family".to_owned());

        assert_eq!(store.load_latest(&household).expect("empty load"), None);

        let profile = Profile::new().with_number(SlotKey::RentMonthly, 900.0);
        store.save(&household, profile.clone(), 0).expect("first save");
        assert!(store.path_for(&household).ends_with("smith_family.json"));
        assert_eq!(store.load_latest(&household).expect("load"), Some(profile.clone()));

        let conflict = store.save(&household, profile, 5).expect_err("stale version");
        assert!(matches!(conflict, ApplicationError::VersionConflict { expected: 5, actual: 0, .. }));
    }
}
