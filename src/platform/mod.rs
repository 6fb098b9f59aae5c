use crate::errors::PlatformError;
use crate::models::ProfileDocument;

pub mod credentials;
pub mod firebase;
#[cfg(test)]
pub mod testing;

/// The two side effects the provisioner needs from the identity platform,
/// plus the delete used to undo an identity whose profile never landed.
pub trait IdentityPlatform {
    /// Creates an identity and returns its uid.
    fn create_identity(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, PlatformError>;

    /// Writes (overwrites) the profile document for `uid`.
    fn create_profile_document(
        &mut self,
        uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), PlatformError>;

    fn delete_identity(&mut self, uid: &str) -> Result<(), PlatformError>;
}
