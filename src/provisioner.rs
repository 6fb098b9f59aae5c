use crate::errors::PlatformError;
use crate::models::{InputRecord, NormalizedUser, ProfileDocument, ProvisionOutcome};
use crate::platform::IdentityPlatform;
use crate::validator;
use tracing::{error, info, warn};

/// Temporary password handed to every created account.
///
/// SECURITY: this is one shared literal for every user in every run, not a
/// per-user secret. Anyone holding one credentials report can sign in as any
/// account that has not yet changed its password.
pub const TEMP_PASSWORD: &str = "RefractiveFoundations";

pub struct Provisioner<P: IdentityPlatform> {
    platform: P,
    rollback_orphans: bool,
}

impl<P: IdentityPlatform> Provisioner<P> {
    /// Creates a new `Provisioner` over the given platform handle.
    pub fn new(platform: P) -> Self {
        Provisioner {
            platform,
            rollback_orphans: false,
        }
    }

    /// Deletes the identity again when its profile write fails.
    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_orphans = enabled;
        self
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Validates one input row and provisions it if the row is acceptable.
    pub fn process(&mut self, record: &InputRecord) -> ProvisionOutcome {
        match validator::normalize(record) {
            Ok(user) => self.provision(&user),
            Err(e) => {
                let outcome = validator::rejected_outcome(record, &e);
                warn!(email = %outcome.email, "Invalid email format");
                outcome
            }
        }
    }

    /// Creates the identity and the profile document for one user.
    ///
    /// A failed profile write leaves the identity in place unless rollback
    /// is enabled.
    pub fn provision(&mut self, user: &NormalizedUser) -> ProvisionOutcome {
        let display_name = user.display_name();

        let uid = match self
            .platform
            .create_identity(&user.email, TEMP_PASSWORD, &display_name)
        {
            Ok(uid) => uid,
            Err(e @ PlatformError::EmailExists) => {
                warn!(email = %user.email, "User already exists");
                return ProvisionOutcome::failed(user, e.to_string());
            }
            Err(e) => {
                error!(email = %user.email, error = %e, "Failed to create user");
                return ProvisionOutcome::failed(user, e.to_string());
            }
        };
        info!(email = %user.email, uid = %uid, "Created identity");

        let profile = ProfileDocument::new(&uid, user);
        if let Err(e) = self.platform.create_profile_document(&uid, &profile) {
            error!(email = %user.email, uid = %uid, error = %e, "Failed to write profile document");
            if self.rollback_orphans {
                self.rollback(&uid);
            }
            return ProvisionOutcome::failed(user, e.to_string());
        }
        info!(email = %user.email, "Created profile document");

        ProvisionOutcome::created(user, uid, TEMP_PASSWORD.to_string())
    }

    fn rollback(&mut self, uid: &str) {
        match self.platform.delete_identity(uid) {
            Ok(()) => info!(uid = %uid, "Deleted orphaned identity"),
            Err(e) => error!(uid = %uid, error = %e, "Failed to delete orphaned identity"),
        }
    }
}
