use super::IdentityPlatform;
use crate::errors::PlatformError;
use crate::models::ProfileDocument;
use std::collections::{HashMap, HashSet};

/// In-memory platform that records every call.
#[derive(Debug, Default)]
pub struct FakePlatform {
    /// email -> uid
    pub identities: HashMap<String, String>,
    /// uid -> document
    pub profiles: HashMap<String, ProfileDocument>,
    pub create_identity_calls: usize,
    pub create_profile_calls: usize,
    pub deleted: Vec<String>,
    /// Emails whose identity creation fails with a generic error.
    pub fail_identity_for: HashSet<String>,
    /// Emails whose profile write fails.
    pub fail_profile_for: HashSet<String>,
    next_uid: u32,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityPlatform for FakePlatform {
    fn create_identity(
        &mut self,
        email: &str,
        _password: &str,
        _display_name: &str,
    ) -> Result<String, PlatformError> {
        self.create_identity_calls += 1;
        if self.identities.contains_key(email) {
            return Err(PlatformError::EmailExists);
        }
        if self.fail_identity_for.contains(email) {
            return Err(PlatformError::IdentityCreate("INTERNAL_ERROR".to_string()));
        }
        self.next_uid += 1;
        let uid = format!("uid-{}", self.next_uid);
        self.identities.insert(email.to_string(), uid.clone());
        Ok(uid)
    }

    fn create_profile_document(
        &mut self,
        uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), PlatformError> {
        self.create_profile_calls += 1;
        if self.fail_profile_for.contains(&profile.email) {
            return Err(PlatformError::ProfileWrite("PERMISSION_DENIED".to_string()));
        }
        self.profiles.insert(uid.to_string(), profile.clone());
        Ok(())
    }

    fn delete_identity(&mut self, uid: &str) -> Result<(), PlatformError> {
        self.identities.retain(|_, v| v != uid);
        self.deleted.push(uid.to_string());
        Ok(())
    }
}
