use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::core::attendance::EmployeeProfile;
use crate::core::companies::CompanyRegistry;
use crate::core::config::ServiceConfig;
use crate::core::directory::IdentityResolver;
use crate::core::store::Workbook;
use crate::core::terminal::{self, print_info, print_row, print_success, print_warn};

async fn open(config: &ServiceConfig) -> Result<Workbook> {
    let workbook = Workbook::open(&config.store, &config.sheets)?;
    workbook
        .ensure_headers()
        .await
        .context("Failed to prepare worksheets")?;
    Ok(workbook)
}

pub async fn list_employees(config: &ServiceConfig) -> Result<()> {
    let workbook = open(config).await?;
    let employees = IdentityResolver::new(workbook.directory.clone())
        .list()
        .await
        .context("Failed to read employee directory")?;
    if employees.is_empty() {
        print_info("No employees registered.");
        return Ok(());
    }
    for e in &employees {
        let score = e.score.map(|s| format!(" score {}", s)).unwrap_or_default();
        print_row(
            &e.email,
            &format!("{} ({}) #{} {}{}", e.full_name, e.nickname, e.id, e.office_email, score),
        );
    }
    terminal::print_status("Employees", &employees.len().to_string());
    Ok(())
}

pub async fn list_companies(config: &ServiceConfig) -> Result<()> {
    let workbook = open(config).await?;
    let companies = CompanyRegistry::new(workbook.companies.clone())
        .list()
        .await
        .context("Failed to read companies")?;
    if companies.is_empty() {
        print_info("No companies registered.");
        return Ok(());
    }
    for (i, name) in companies.iter().enumerate() {
        print_row(&format!("{}", i + 1), name);
    }
    Ok(())
}

/// Parses a roster file: a JSON array of employee objects.
pub(crate) fn parse_roster(raw: &str) -> Result<Vec<EmployeeProfile>> {
    let employees: Vec<EmployeeProfile> =
        serde_json::from_str(raw).context("Roster must be a JSON array of employees")?;
    Ok(employees)
}

/// Appends employees whose email is not yet in the directory. Returns
/// `(added, skipped)`.
pub(crate) async fn import_into(
    directory: &IdentityResolver,
    employees: &[EmployeeProfile],
) -> Result<(usize, usize)> {
    let mut known: HashSet<String> = directory
        .list()
        .await
        .context("Failed to read employee directory")?
        .into_iter()
        .map(|e| e.email.trim().to_lowercase())
        .collect();

    let (mut added, mut skipped) = (0, 0);
    for employee in employees {
        let key = employee.email.trim().to_lowercase();
        if key.is_empty() || !known.insert(key) {
            skipped += 1;
            continue;
        }
        let employee = EmployeeProfile {
            email: employee.email.trim().to_string(),
            ..employee.clone()
        };
        directory
            .append(&employee)
            .await
            .with_context(|| format!("Failed to add {}", employee.email))?;
        added += 1;
    }
    Ok((added, skipped))
}

pub async fn import(config: &ServiceConfig, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read roster {}", file.display()))?;
    let employees = parse_roster(&raw)?;
    let workbook = open(config).await?;
    let directory = IdentityResolver::new(workbook.directory.clone());

    let (added, skipped) = import_into(&directory, &employees).await?;
    print_success(&format!("Imported {} employees", added));
    if skipped > 0 {
        print_warn(&format!(
            "Skipped {} entries with a blank or already registered email",
            skipped
        ));
    }
    Ok(())
}
