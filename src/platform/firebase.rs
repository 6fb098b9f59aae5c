//! Firebase Authentication and Cloud Firestore over their REST APIs.

use super::credentials::{metadata_project_id, AccessToken, Credentials};
use super::IdentityPlatform;
use crate::config::PlatformSettings;
use crate::errors::{PlatformError, ProvisionError};
use crate::models::ProfileDocument;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_derive::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Field the document store stamps with the commit time.
const DATE_JOINED_FIELD: &str = "dateJoined";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct FirebaseClient {
    http: Client,
    credentials: Credentials,
    token: AccessToken,
    project_id: String,
    collection: String,
    auth_base: String,
    firestore_base: String,
}

impl FirebaseClient {
    /// Resolves credentials, fetches a first access token and settles the
    /// project id. Any failure here is fatal for the run.
    pub fn connect(settings: &PlatformSettings) -> Result<Self, ProvisionError> {
        let init = |e: PlatformError| ProvisionError::PlatformInit(e.to_string());

        let http = Client::builder().build().map_err(|e| init(e.into()))?;
        let credentials = if settings.emulators_only() {
            Credentials::Emulator
        } else {
            Credentials::load(settings.service_account.as_deref()).map_err(init)?
        };
        let token = credentials.fetch_token(&http).map_err(init)?;

        let project_id = match settings
            .project_id
            .clone()
            .or_else(|| credentials.project_id())
        {
            Some(id) => id,
            None if matches!(credentials, Credentials::MetadataServer) => {
                metadata_project_id(&http).map_err(init)?
            }
            None => {
                return Err(ProvisionError::PlatformInit(
                    "Unable to determine the project id; pass --project-id".to_string(),
                ))
            }
        };

        let auth_base = match &settings.auth_emulator_host {
            Some(host) => format!("http://{}/identitytoolkit.googleapis.com/v1", host),
            None => IDENTITY_TOOLKIT_URL.to_string(),
        };
        let firestore_base = match &settings.firestore_emulator_host {
            Some(host) => format!("http://{}/v1", host),
            None => FIRESTORE_URL.to_string(),
        };

        debug!(project_id = %project_id, auth = %auth_base, firestore = %firestore_base, "Firebase client ready");

        Ok(FirebaseClient {
            http,
            credentials,
            token,
            project_id,
            collection: settings.collection.clone(),
            auth_base,
            firestore_base,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns a valid bearer token, refreshing it if it is about to expire.
    fn bearer(&mut self) -> Result<String, PlatformError> {
        if !self.token.is_fresh() {
            debug!("Refreshing access token");
            self.token = self.credentials.fetch_token(&self.http)?;
        }
        Ok(self.token.value.clone())
    }

    fn post(&mut self, url: String) -> Result<RequestBuilder, PlatformError> {
        let token = self.bearer()?;
        let mut request = self.http.post(url).bearer_auth(token);
        if let Some(project) = self.credentials.quota_project() {
            request = request.header("x-goog-user-project", project);
        }
        Ok(request)
    }

    fn document_name(&self, uid: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, self.collection, uid
        )
    }
}

impl IdentityPlatform for FirebaseClient {
    fn create_identity(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, PlatformError> {
        let url = format!("{}/projects/{}/accounts", self.auth_base, self.project_id);
        let body = SignUpRequest {
            email,
            password,
            display_name,
        };
        let response = self.post(url)?.json(&body).send()?;
        if !response.status().is_success() {
            return Err(identity_error(&error_message(response)));
        }
        let created: SignUpResponse = response.json()?;
        Ok(created.local_id)
    }

    fn create_profile_document(
        &mut self,
        uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/projects/{}/databases/(default)/documents:commit",
            self.firestore_base, self.project_id
        );
        let body = commit_body(&self.document_name(uid), profile);
        let response = self.post(url)?.json(&body).send()?;
        if !response.status().is_success() {
            return Err(PlatformError::ProfileWrite(error_message(response)));
        }
        Ok(())
    }

    fn delete_identity(&mut self, uid: &str) -> Result<(), PlatformError> {
        let url = format!(
            "{}/projects/{}/accounts:delete",
            self.auth_base, self.project_id
        );
        let response = self.post(url)?.json(&json!({ "localId": uid })).send()?;
        if !response.status().is_success() {
            return Err(PlatformError::IdentityDelete(error_message(response)));
        }
        Ok(())
    }
}

/// Pulls the API error message out of a failed response.
fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => body.error.message,
        Err(_) if text.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, text.trim()),
    }
}

fn identity_error(message: &str) -> PlatformError {
    if message.starts_with("EMAIL_EXISTS") || message.starts_with("DUPLICATE_EMAIL") {
        PlatformError::EmailExists
    } else {
        PlatformError::IdentityCreate(message.to_string())
    }
}

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn bool_value(b: bool) -> Value {
    json!({ "booleanValue": b })
}

fn string_array(items: &[String]) -> Value {
    if items.is_empty() {
        return json!({ "arrayValue": {} });
    }
    let values: Vec<Value> = items.iter().map(|s| string_value(s)).collect();
    json!({ "arrayValue": { "values": values } })
}

fn optional_string(value: &Option<String>) -> Value {
    match value {
        Some(s) => string_value(s),
        None => json!({ "nullValue": null }),
    }
}

/// Encodes a profile as Firestore typed fields. `dateJoined` is left out
/// because it is set by a server transform.
pub fn profile_fields(profile: &ProfileDocument) -> Map<String, Value> {
    let prefs = &profile.notification_preferences;
    let mut fields = Map::new();
    fields.insert("credential".into(), string_value(&profile.credential));
    fields.insert("email".into(), string_value(&profile.email));
    fields.insert("firstName".into(), string_value(&profile.first_name));
    fields.insert("lastName".into(), string_value(&profile.last_name));
    fields.insert("position".into(), string_value(&profile.position));
    fields.insert("specialty".into(), string_value(&profile.specialty));
    fields.insert("state".into(), string_value(&profile.state));
    fields.insert("suffix".into(), string_value(&profile.suffix));
    fields.insert("uid".into(), string_value(&profile.uid));
    fields.insert("avatarUrl".into(), optional_string(&profile.avatar_url));
    fields.insert(
        "exchangeUsername".into(),
        string_value(&profile.exchange_username),
    );
    fields.insert("favoriteLenses".into(), string_array(&profile.favorite_lenses));
    fields.insert("savedPosts".into(), string_array(&profile.saved_posts));
    fields.insert(
        "practiceLocation".into(),
        string_value(&profile.practice_location),
    );
    fields.insert("practiceName".into(), string_value(&profile.practice_name));
    fields.insert(
        "hasCompletedOnboarding".into(),
        bool_value(profile.has_completed_onboarding),
    );
    fields.insert(
        "notificationPreferences".into(),
        json!({ "mapValue": { "fields": {
            "comments": bool_value(prefs.comments),
            "directMessages": bool_value(prefs.direct_messages),
            "posts": bool_value(prefs.posts),
            "mentions": bool_value(prefs.mentions),
        }}}),
    );
    fields
}

/// A single full-overwrite write plus the server timestamp transform.
fn commit_body(document_name: &str, profile: &ProfileDocument) -> Value {
    json!({
        "writes": [{
            "update": {
                "name": document_name,
                "fields": profile_fields(profile),
            },
            "updateTransforms": [{
                "fieldPath": DATE_JOINED_FIELD,
                "setToServerValue": "REQUEST_TIME",
            }],
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedUser;
    use rstest::rstest;

    fn profile() -> ProfileDocument {
        let user = NormalizedUser {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@x.com".to_string(),
            practice_name: "Acme".to_string(),
        };
        ProfileDocument::new("uid-1", &user)
    }

    #[test]
    fn test_profile_fields_exact_set() {
        let fields = profile_fields(&profile());
        let mut keys: Vec<_> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "avatarUrl",
                "credential",
                "email",
                "exchangeUsername",
                "favoriteLenses",
                "firstName",
                "hasCompletedOnboarding",
                "lastName",
                "notificationPreferences",
                "position",
                "practiceLocation",
                "practiceName",
                "savedPosts",
                "specialty",
                "state",
                "suffix",
                "uid",
            ]
        );
    }

    #[test]
    fn test_profile_field_values() {
        let fields = profile_fields(&profile());
        assert_eq!(fields["avatarUrl"], json!({ "nullValue": null }));
        assert_eq!(fields["specialty"], json!({ "stringValue": "General Ophthalmology" }));
        assert_eq!(fields["favoriteLenses"], json!({ "arrayValue": {} }));
        assert_eq!(fields["hasCompletedOnboarding"], json!({ "booleanValue": false }));
        assert_eq!(fields["credential"], json!({ "stringValue": "" }));
        assert_eq!(
            fields["notificationPreferences"]["mapValue"]["fields"]["directMessages"],
            json!({ "booleanValue": true })
        );
    }

    #[test]
    fn test_commit_body_sets_date_joined_on_server() {
        let body = commit_body("projects/p/databases/(default)/documents/users/uid-1", &profile());
        let write = &body["writes"][0];
        assert_eq!(
            write["update"]["name"],
            "projects/p/databases/(default)/documents/users/uid-1"
        );
        assert!(write["update"]["fields"].get("dateJoined").is_none());
        assert_eq!(write["updateTransforms"][0]["fieldPath"], "dateJoined");
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
    }

    #[rstest]
    #[case("EMAIL_EXISTS", true)]
    #[case("DUPLICATE_EMAIL", true)]
    #[case("EMAIL_EXISTS : The email address is already in use", true)]
    #[case("INVALID_PASSWORD : too weak", false)]
    #[case("PERMISSION_DENIED", false)]
    fn test_identity_error_classification(#[case] message: &str, #[case] exists: bool) {
        let err = identity_error(message);
        assert_eq!(matches!(err, PlatformError::EmailExists), exists);
        if exists {
            assert_eq!(err.to_string(), "Email already exists");
        } else {
            assert_eq!(err.to_string(), message);
        }
    }
}
