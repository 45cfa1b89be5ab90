use actix_web::{HttpResponse, post, web};
use devwatch_service::database::{DeviceStatus, NewDevice};
use devwatch_service::{RefreshReport, RegisterDevice};
use serde::Serialize;
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route web::resource("/checkDeviceStatusManual").route(web::route().to(check_device_status_manual)),
    route add_device,
}

#[derive(Debug, Serialize)]
pub struct CheckedDevice {
    pub name: String,
    pub ip: String,
    pub status: DeviceStatus,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CheckedDevice>>,
}

impl From<RefreshReport> for RefreshResponse {
    fn from(report: RefreshReport) -> Self {
        if report.devices_found == 0 {
            return Self { message: "No devices found".to_string(), results: None };
        }

        let results: Vec<CheckedDevice> = report
            .results
            .into_iter()
            .map(|check| CheckedDevice { name: check.name, ip: check.ip, status: check.status })
            .collect();

        Self { message: format!("Checked {} devices", results.len()), results: Some(results) }
    }
}

#[derive(Debug, Serialize)]
pub struct AddDeviceResponse {
    pub message: String,
    pub id: String,
    pub device: NewDevice,
}

/// Run a refresh cycle on demand. Any method, the body is ignored.
pub async fn check_device_status_manual(
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!("Manual device status check triggered");

    let report = state.refresher.refresh().await.inspect_err(|e| {
        error!("Error in manual check: {e}");
    })?;

    Ok(HttpResponse::Ok().json(RefreshResponse::from(report)))
}

/// Register a device. An empty body counts as a request with no fields.
#[post("/addDevice")]
pub async fn add_device(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request: RegisterDevice = if body.iter().all(u8::is_ascii_whitespace) {
        RegisterDevice::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let device = request.validate()?;
    let id = state.repository.insert(&device).await.inspect_err(|e| {
        error!("Error adding device: {e}");
    })?;

    info!(device_id = %id, name = %device.name, ip = %device.ip, "Device added");
    Ok(HttpResponse::Ok().json(AddDeviceResponse {
        message: "Device added successfully".to_string(),
        id,
        device,
    }))
}
