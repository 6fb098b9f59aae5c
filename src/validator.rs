use crate::errors::ProvisionError;
use crate::models::{InputRecord, NormalizedUser, ProvisionOutcome};

/// Trims and lower-cases the raw fields without checking them.
fn clean(record: &InputRecord) -> NormalizedUser {
    NormalizedUser {
        first_name: record.first_name.trim().to_string(),
        last_name: record.last_name.trim().to_string(),
        email: record.email.trim().to_lowercase(),
        practice_name: record
            .practice_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Only checks for an `@` and a `.` somewhere in the address.
pub fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// Normalizes one input row, rejecting it if the email looks malformed.
pub fn normalize(record: &InputRecord) -> Result<NormalizedUser, ProvisionError> {
    let user = clean(record);
    if !is_plausible_email(&user.email) {
        return Err(ProvisionError::InvalidEmail);
    }
    Ok(user)
}

/// Builds the failed outcome for a row that never reached the platform.
pub fn rejected_outcome(record: &InputRecord, error: &ProvisionError) -> ProvisionOutcome {
    ProvisionOutcome::failed(&clean(record), error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(first: &str, last: &str, email: &str, practice: Option<&str>) -> InputRecord {
        InputRecord {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            practice_name: practice.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let user = normalize(&record("  Jane ", "Doe  ", "  JANE@X.com ", Some(" Acme "))).unwrap();
        assert_eq!(user.first_name, "Jane");
        assert_eq!(user.last_name, "Doe");
        assert_eq!(user.email, "jane@x.com");
        assert_eq!(user.practice_name, "Acme");
    }

    #[test]
    fn test_missing_practice_name_becomes_empty() {
        let user = normalize(&record("Jane", "Doe", "jane@x.com", None)).unwrap();
        assert_eq!(user.practice_name, "");
    }

    #[rstest]
    #[case("not-an-email")] // No @ or .
    #[case("jane@example")] // No .
    #[case("jane.example.com")] // No @
    #[case("")]
    fn test_invalid_email_rejected(#[case] email: &str) {
        let rec = record("Bad", "Row", email, Some("Acme"));
        let err = normalize(&rec).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidEmail));

        let outcome = rejected_outcome(&rec, &err);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("Invalid email format"));
        assert_eq!(outcome.name, "Bad Row");
    }

    #[rstest]
    #[case("a@b.c")]
    #[case("x.y@z")] // Weak check: the dot may come before the @
    fn test_weak_check_accepts(#[case] email: &str) {
        assert!(is_plausible_email(email));
    }
}
