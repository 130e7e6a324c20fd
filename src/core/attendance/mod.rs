//! Attendance sessions: the check-in/check-out state machine and the
//! positional ledger writes that realize it.
//!
//! One request runs gate → identity → lock → snapshot → locate → plan →
//! companies → ledger. The session lock for (email, date) is held from the
//! ledger read until the last ledger write, so two requests for the same
//! session in this process never interleave.

mod error;
mod ledger;
mod locator;
mod locks;
mod machine;
mod types;

#[cfg(test)]
mod tests;

pub use error::{AttendanceError, ErrorKind};
pub use ledger::{LedgerColumn, LedgerMutation, LedgerWriter};
pub use locator::{locate, normalize_email};
pub use locks::SessionLocks;
pub use machine::{
    LedgerPlan, OTHER_COMPANY, TransitionInput, company_key, is_registrable_company, plan,
};
pub use types::{
    Action, AttendanceRecord, CHECKED_IN, CHECKED_OUT, EmployeeProfile, SessionState, TaskEntry,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::access::AccessGate;
use crate::core::clock::Clock;
use crate::core::companies::CompanyRegistry;
use crate::core::directory::IdentityResolver;
use crate::core::store::Workbook;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceOutcome {
    pub status: String,
    pub time: String,
    pub ip: String,
    pub office_email: String,
}

#[derive(Clone)]
pub struct AttendanceService {
    gate: AccessGate,
    directory: IdentityResolver,
    companies: CompanyRegistry,
    ledger: LedgerWriter,
    clock: Arc<dyn Clock>,
    locks: SessionLocks,
}

impl AttendanceService {
    pub fn new(workbook: &Workbook, gate: AccessGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate,
            directory: IdentityResolver::new(workbook.directory.clone()),
            companies: CompanyRegistry::new(workbook.companies.clone()),
            ledger: LedgerWriter::new(workbook.ledger.clone()),
            clock,
            locks: SessionLocks::new(),
        }
    }

    pub fn directory(&self) -> &IdentityResolver {
        &self.directory
    }

    pub fn companies(&self) -> &CompanyRegistry {
        &self.companies
    }

    /// Rejects callers outside the configured networks.
    pub fn admit(&self, remote_ip: &str) -> Result<(), AttendanceError> {
        if self.gate.allowed(remote_ip) {
            Ok(())
        } else {
            Err(AttendanceError::DisallowedOrigin(remote_ip.to_string()))
        }
    }

    pub async fn record(
        &self,
        request: &AttendanceRequest,
        remote_ip: &str,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let request_id = Uuid::new_v4();
        let result = self.transition(request_id, request, remote_ip).await;
        if let Err(e) = &result {
            match e.kind() {
                ErrorKind::Upstream => error!(
                    "[{}] {} for '{}' failed: {}",
                    request_id,
                    request.action.trim(),
                    request.email.trim(),
                    e
                ),
                _ => warn!(
                    "[{}] {} for '{}' rejected: {}",
                    request_id,
                    request.action.trim(),
                    request.email.trim(),
                    e
                ),
            }
        }
        result
    }

    async fn transition(
        &self,
        request_id: Uuid,
        request: &AttendanceRequest,
        remote_ip: &str,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        self.admit(remote_ip)?;
        let action = Action::parse(&request.action)?;
        let email = normalize_email(&request.email);
        if email.is_empty() {
            return Err(AttendanceError::MissingEmail);
        }

        let employee = self.directory.resolve(&email).await?;
        let stamp = self.clock.stamp();

        let _session = self.locks.acquire(&email, &stamp.date).await;
        debug!("[{}] Holding session lock for {} on {}", request_id, email, stamp.date);

        let snapshot = self
            .ledger
            .snapshot()
            .await
            .map_err(AttendanceError::read("master records"))?;
        let (current, _) = locate(&email, &stamp.date, &snapshot);

        let plan = plan(TransitionInput {
            action,
            employee: &employee,
            stamp: &stamp,
            remote_ip,
            tasks: &request.tasks,
            current,
        })?;

        for company in &plan.companies {
            self.companies
                .add(company)
                .await
                .map_err(AttendanceError::write("add company"))?;
        }

        let what = match action {
            Action::CheckIn => "insert check-in",
            Action::CheckOut => "update checkout",
        };
        self.ledger
            .apply(&plan.mutations)
            .await
            .map_err(AttendanceError::write(what))?;

        info!(
            "[{}] {} {} on {} at {} from {} ({} ledger writes)",
            request_id,
            email,
            action.as_str(),
            stamp.date,
            stamp.time,
            remote_ip,
            plan.mutations.len()
        );

        Ok(AttendanceOutcome {
            status: match plan.target {
                SessionState::CheckedOut => "checked_out",
                _ => "checked_in",
            }
            .to_string(),
            time: stamp.time,
            ip: remote_ip.to_string(),
            office_email: employee.office_email,
        })
    }
}
