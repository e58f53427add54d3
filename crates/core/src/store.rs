use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::profile::{HouseholdId, Profile};
use crate::errors::ApplicationError;

/// Latest-profile storage owned by the host application.
///
/// `save` is an optimistic write: it succeeds only while the stored version
/// still equals `expected_version` (0 when nothing is stored yet).
pub trait ProfileStore: Send + Sync {
    fn load_latest(&self, household: &HouseholdId) -> Result<Option<Profile>, ApplicationError>;

    fn save(
        &self,
        household: &HouseholdId,
        profile: Profile,
        expected_version: u64,
    ) -> Result<(), ApplicationError>;
}

#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<HouseholdId, Profile>>>,
}

impl InMemoryProfileStore {
    pub fn with_profile(self, household: HouseholdId, profile: Profile) -> Self {
        match self.profiles.write() {
            Ok(mut profiles) => {
                profiles.insert(household, profile);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(household, profile);
            }
        }
        self
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn load_latest(&self, household: &HouseholdId) -> Result<Option<Profile>, ApplicationError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| ApplicationError::Persistence("profile store lock poisoned".to_owned()))?;
        Ok(profiles.get(household).cloned())
    }

    fn save(
        &self,
        household: &HouseholdId,
        profile: Profile,
        expected_version: u64,
    ) -> Result<(), ApplicationError> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| ApplicationError::Persistence("profile store lock poisoned".to_owned()))?;

        let actual = profiles.get(household).map_or(0, Profile::version);
        if actual != expected_version {
            return Err(ApplicationError::VersionConflict {
                household: household.clone(),
                expected: expected_version,
                actual,
            });
        }

        profiles.insert(household.clone(), profile);
        Ok(())
    }
}
