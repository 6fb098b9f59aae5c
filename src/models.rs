use serde_derive::{Deserialize, Serialize};

/// Columns every input file must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["first_name", "last_name", "email", "practice_name"];

/// Specialty assigned to every new profile until the user edits it.
pub const DEFAULT_SPECIALTY: &str = "General Ophthalmology";

/// One raw input row, keyed by column name.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct InputRecord {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub practice_name: Option<String>,
}

/// A data row the CSV layer could not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableRow {
    pub line: u64,
    pub error: String,
}

/// One data row of the input file, in file order.
pub type InputRow = Result<InputRecord, UnreadableRow>;

/// A cleaned input row, ready for provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub practice_name: String,
}

impl NormalizedUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Created { uid: String, temp_password: String },
    Failed { error: String },
}

/// Result of processing one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub email: String,
    pub name: String,
    pub practice_name: String,
    pub status: OutcomeStatus,
}

impl ProvisionOutcome {
    pub fn created(user: &NormalizedUser, uid: String, temp_password: String) -> Self {
        ProvisionOutcome {
            email: user.email.clone(),
            name: user.display_name(),
            practice_name: user.practice_name.clone(),
            status: OutcomeStatus::Created { uid, temp_password },
        }
    }

    pub fn failed(user: &NormalizedUser, error: impl Into<String>) -> Self {
        ProvisionOutcome {
            email: user.email.clone(),
            name: user.display_name(),
            practice_name: user.practice_name.clone(),
            status: OutcomeStatus::Failed {
                error: error.into(),
            },
        }
    }

    /// Failed outcome for a row that could not be decoded. The email slot
    /// carries the line number since no address was read.
    pub fn unreadable(row: &UnreadableRow) -> Self {
        ProvisionOutcome {
            email: format!("(line {})", row.line),
            name: String::new(),
            practice_name: String::new(),
            status: OutcomeStatus::Failed {
                error: format!("Could not read row: {}", row.error),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Created { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error } => Some(error),
            OutcomeStatus::Created { .. } => None,
        }
    }

    #[cfg(test)]
    pub fn uid(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Created { uid, .. } => Some(uid),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    /// Projects a successful outcome into a credentials report row.
    pub fn to_credentials_row(&self) -> Option<CredentialsRow> {
        match &self.status {
            OutcomeStatus::Created { uid, temp_password } => Some(CredentialsRow {
                name: self.name.clone(),
                email: self.email.clone(),
                temp_password: temp_password.clone(),
                practice_name: self.practice_name.clone(),
                uid: uid.clone(),
            }),
            OutcomeStatus::Failed { .. } => None,
        }
    }
}

/// One line of the credentials report. Field order is the column order.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CredentialsRow {
    pub name: String,
    pub email: String,
    pub temp_password: String,
    pub practice_name: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPreferences {
    pub comments: bool,
    pub direct_messages: bool,
    pub posts: bool,
    pub mentions: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        NotificationPreferences {
            comments: true,
            direct_messages: true,
            posts: true,
            mentions: true,
        }
    }
}

/// The profile document stored under `users/{uid}`.
///
/// Downstream readers depend on this exact field set and these defaults.
/// `dateJoined` is not stored here; the document store stamps it on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDocument {
    pub credential: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub specialty: String,
    pub state: String,
    pub suffix: String,
    pub uid: String,
    pub avatar_url: Option<String>,
    pub exchange_username: String,
    pub favorite_lenses: Vec<String>,
    pub saved_posts: Vec<String>,
    pub practice_location: String,
    pub practice_name: String,
    pub has_completed_onboarding: bool,
    pub notification_preferences: NotificationPreferences,
}

impl ProfileDocument {
    pub fn new(uid: &str, user: &NormalizedUser) -> Self {
        ProfileDocument {
            credential: String::new(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            position: String::new(),
            specialty: DEFAULT_SPECIALTY.to_string(),
            state: String::new(),
            suffix: String::new(),
            uid: uid.to_string(),
            avatar_url: None,
            exchange_username: String::new(),
            favorite_lenses: Vec::new(),
            saved_posts: Vec::new(),
            practice_location: String::new(),
            practice_name: user.practice_name.clone(),
            has_completed_onboarding: false,
            notification_preferences: NotificationPreferences::default(),
        }
    }
}
