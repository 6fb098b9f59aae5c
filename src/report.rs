use crate::csv_handler;
use crate::errors::ProvisionError;
use crate::models::ProvisionOutcome;
use std::io::{self, Write};
use std::path::Path;
use tracing::error;

/// How many successful users the summary lists by name.
const SHOWN_SUCCESSES: usize = 5;

/// Prints the end-of-run summary of successes and failures.
pub fn print_summary<W: Write>(outcomes: &[ProvisionOutcome], mut out: W) -> io::Result<()> {
    let (successful, failed): (Vec<_>, Vec<_>) =
        outcomes.iter().partition(|o| o.is_success());
    let rule = "=".repeat(50);

    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "BULK USER CREATION SUMMARY")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "Successfully created: {} users", successful.len())?;
    writeln!(out, "Failed: {} users", failed.len())?;
    writeln!(out, "Total processed: {} users", outcomes.len())?;

    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed Users:")?;
        for outcome in &failed {
            writeln!(
                out,
                "   - {} - {}",
                outcome.email,
                outcome.error().unwrap_or("Unknown error")
            )?;
        }
    }

    if !successful.is_empty() {
        writeln!(out)?;
        writeln!(out, "Successful Users:")?;
        for outcome in successful.iter().take(SHOWN_SUCCESSES) {
            writeln!(out, "   - {} - {}", outcome.email, outcome.name)?;
        }
        if successful.len() > SHOWN_SUCCESSES {
            writeln!(out, "   ... and {} more", successful.len() - SHOWN_SUCCESSES)?;
        }
    }

    Ok(())
}

/// Saves the credentials report, then prints the summary and closing notes.
///
/// The report is written first so the uids of created accounts survive a
/// failing `out`; a print failure is only logged.
pub fn finish_run<W: Write>(
    outcomes: &[ProvisionOutcome],
    output_path: &Path,
    mut out: W,
) -> Result<Option<usize>, ProvisionError> {
    let saved = csv_handler::write_credentials_report(outcomes, output_path);

    let printed = print_summary(outcomes, &mut out)
        .and_then(|_| print_report_status(&saved, output_path, &mut out))
        .and_then(|_| print_closing(&mut out));
    if let Err(e) = printed {
        error!("Failed to print summary: {}", e);
    }

    saved
}

fn print_report_status<W: Write>(
    saved: &Result<Option<usize>, ProvisionError>,
    output_path: &Path,
    mut out: W,
) -> io::Result<()> {
    match saved {
        Ok(Some(count)) => {
            writeln!(
                out,
                "Credentials report saved to: {} ({} users)",
                output_path.display(),
                count
            )?;
            writeln!(out, "Share this file securely with users for their login credentials")
        }
        Ok(None) => writeln!(
            out,
            "No users were created successfully. No credentials report generated."
        ),
        // Reported by the caller.
        Err(_) => Ok(()),
    }
}

fn print_closing<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Bulk user creation completed!")?;
    writeln!(out, "Remember to securely distribute the credentials to users")?;
    writeln!(out, "Users should change their passwords on first login")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedUser;
    use rstest::rstest;

    fn user(i: usize) -> NormalizedUser {
        NormalizedUser {
            first_name: format!("User{}", i),
            last_name: "Test".to_string(),
            email: format!("user{}@x.com", i),
            practice_name: String::new(),
        }
    }

    /// Writer whose every write fails, like a closed stdout.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_report_saved_even_if_summary_cannot_be_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_credentials.csv");
        let outcomes = vec![ProvisionOutcome::created(&user(1), "uid-1".into(), "pw".into())];

        let saved = finish_run(&outcomes, &path, BrokenPipe).unwrap();

        assert_eq!(saved, Some(1));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("user1@x.com"));
        assert!(content.contains("uid-1"));
    }

    #[test]
    fn test_finish_run_prints_report_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_credentials.csv");
        let outcomes = vec![
            ProvisionOutcome::created(&user(1), "uid-1".into(), "pw".into()),
            ProvisionOutcome::failed(&user(2), "Email already exists"),
        ];
        let mut buf = Vec::new();

        finish_run(&outcomes, &path, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let summary_at = text.find("BULK USER CREATION SUMMARY").unwrap();
        let saved_at = text.find("Credentials report saved to:").unwrap();
        assert!(summary_at < saved_at);
        assert!(text.contains("Bulk user creation completed!"));
    }

    #[test]
    fn test_finish_run_without_successes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_credentials.csv");
        let outcomes = vec![ProvisionOutcome::failed(&user(1), "Invalid email format")];
        let mut buf = Vec::new();

        assert_eq!(finish_run(&outcomes, &path, &mut buf).unwrap(), None);
        assert!(!path.exists());
        assert!(String::from_utf8(buf)
            .unwrap()
            .contains("No credentials report generated."));
    }

    fn render(outcomes: &[ProvisionOutcome]) -> String {
        let mut buf = Vec::new();
        print_summary(outcomes, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_summary_counts_and_failures() {
        let outcomes = vec![
            ProvisionOutcome::created(&user(1), "uid-1".into(), "pw".into()),
            ProvisionOutcome::failed(&user(2), "Email already exists"),
        ];
        let text = render(&outcomes);

        assert!(text.contains("Successfully created: 1 users"));
        assert!(text.contains("Failed: 1 users"));
        assert!(text.contains("Total processed: 2 users"));
        assert!(text.contains("   - user2@x.com - Email already exists"));
        assert!(text.contains("   - user1@x.com - User1 Test"));
    }

    #[rstest]
    #[case(5, None)]
    #[case(6, Some("   ... and 1 more"))]
    #[case(12, Some("   ... and 7 more"))]
    fn test_summary_truncates_successes(#[case] count: usize, #[case] tail: Option<&str>) {
        let outcomes: Vec<_> = (1..=count)
            .map(|i| ProvisionOutcome::created(&user(i), format!("uid-{}", i), "pw".into()))
            .collect();
        let text = render(&outcomes);

        assert!(text.contains("user5@x.com"));
        assert!(!text.contains("user6@x.com"));
        assert!(!text.contains("Failed Users:"));
        match tail {
            Some(line) => assert!(text.contains(line)),
            None => assert!(!text.contains("more")),
        }
    }
}
