use axum::{Json, extract::State};

use crate::core::attendance::{AttendanceError, EmployeeProfile};

use super::super::AppState;

pub async fn get_companies(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AttendanceError> {
    let companies = state
        .service
        .companies()
        .list()
        .await
        .map_err(AttendanceError::read("companies"))?;
    Ok(Json(serde_json::json!({ "companies": companies })))
}

pub async fn get_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeProfile>>, AttendanceError> {
    let employees = state
        .service
        .directory()
        .list()
        .await
        .map_err(AttendanceError::read("employees"))?;
    Ok(Json(employees))
}
