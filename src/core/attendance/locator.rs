use super::types::AttendanceRecord;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Finds the session-opening record for `(email, date)` in a ledger snapshot.
///
/// The snapshot is scanned in store order and the first match wins. Rows are
/// only ever appended, so later matches are sibling task rows of the same
/// session.
pub fn locate<'a>(
    email: &str,
    date: &str,
    snapshot: &'a [AttendanceRecord],
) -> (Option<&'a AttendanceRecord>, Option<usize>) {
    let email = normalize_email(email);
    let date = date.trim();
    match snapshot
        .iter()
        .find(|r| normalize_email(&r.employee_email) == email && r.date.trim() == date)
    {
        Some(record) => (Some(record), record.ledger_position),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: usize, email: &str, date: &str, task: &str) -> AttendanceRecord {
        AttendanceRecord {
            employee_email: email.into(),
            date: date.into(),
            task_name: task.into(),
            ledger_position: Some(position),
            ..AttendanceRecord::default()
        }
    }

    #[test]
    fn first_match_wins() {
        let snapshot = vec![
            row(2, "b@x.com", "2026-03-02", "other person"),
            row(3, "a@x.com", "2026-03-02", "first"),
            row(4, "a@x.com", "2026-03-02", "sibling"),
        ];
        let (record, position) = locate("a@x.com", "2026-03-02", &snapshot);
        assert_eq!(record.map(|r| r.task_name.as_str()), Some("first"));
        assert_eq!(position, Some(3));
    }

    #[test]
    fn email_match_is_case_and_whitespace_insensitive() {
        let snapshot = vec![row(2, " A@X.com ", "2026-03-02", "t")];
        let (record, position) = locate("a@x.COM", " 2026-03-02", &snapshot);
        assert!(record.is_some());
        assert_eq!(position, Some(2));
    }

    #[test]
    fn other_dates_do_not_match() {
        let snapshot = vec![row(2, "a@x.com", "2026-03-01", "yesterday")];
        assert_eq!(locate("a@x.com", "2026-03-02", &snapshot), (None, None));
        assert_eq!(locate("a@x.com", "2026-03-02", &[]), (None, None));
    }
}
