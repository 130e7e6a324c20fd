
use std::sync::Arc;

use crate::core::access::AccessGate;
use crate::core::attendance::{AttendanceRequest, AttendanceService, TaskEntry};
use crate::core::clock::FixedClock;
use crate::core::store::{MemoryWorkbook, Worksheet};

pub(super) const EMAIL: &str = "a@x.com";
pub(super) const OFFICE_IP: &str = "10.0.0.5";

pub(super) struct Harness {
    pub store: MemoryWorkbook,
    pub clock: Arc<FixedClock>,
    pub service: AttendanceService,
}

/// Memory workbook with headers, two registered employees and an
/// office allow-list of 10.0.0.0/24. The clock reads 09:00 in Dhaka.
pub(super) async fn harness() -> Harness {
    let store = MemoryWorkbook::new();
    let workbook = store.workbook();
    workbook.ensure_headers().await.unwrap();
    for row in [
        ["17", "Ash Rahman", "Ash", "a@x.com", "ash@corp.example", "42"],
        ["19", "Bea Khan", "Bea", "bea@x.com", "bea@corp.example", ""],
    ] {
        workbook
            .directory
            .append_row(row.iter().map(|c| c.to_string()).collect())
            .await
            .unwrap();
    }
    let clock = Arc::new(FixedClock::at(
        "2026-03-02T03:00:00Z",
        chrono_tz::Asia::Dhaka,
    ));
    let gate = AccessGate::from_config(Some(&["10.0.0.0/24".to_string()])).unwrap();
    let service = AttendanceService::new(&workbook, gate, clock.clone());
    Harness {
        store,
        clock,
        service,
    }
}

pub(super) fn task(company: &str, name: &str) -> TaskEntry {
    TaskEntry {
        task_for: company.to_string(),
        task_name: name.to_string(),
        task_details: format!("{} details", name),
        my_role: "engineer".to_string(),
    }
}

pub(super) fn checkin(email: &str) -> AttendanceRequest {
    AttendanceRequest {
        email: email.to_string(),
        action: "checkin".to_string(),
        tasks: Vec::new(),
    }
}

pub(super) fn checkout(email: &str, tasks: Vec<TaskEntry>) -> AttendanceRequest {
    AttendanceRequest {
        email: email.to_string(),
        action: "checkout".to_string(),
        tasks,
    }
}

/// Ledger data rows, header excluded.
pub(super) async fn ledger_rows(h: &Harness) -> Vec<Vec<String>> {
    h.store.ledger.snapshot().await.into_iter().skip(1).collect()
}
