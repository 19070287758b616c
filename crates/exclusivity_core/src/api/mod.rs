//! Request/response envelopes for the exclusivity endpoints.
//!
//! # Responsibility
//! - Decode JSON bodies for cell, clear and bulk requests.
//! - Map service outcomes to HTTP status codes.
//!
//! Routing is out of scope; a host server deserializes with these types,
//! calls `ExclusivityService` and answers with the mapped status.

use crate::model::cell::{CellAction, ClearOutcome, DimensionTuple};
use crate::service::exclusivity_service::{CellSetResult, ExclusivityError};
use crate::service::import::{BulkRow, ImportError, ImportReport};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const STATUS_OK: u16 = 200;
pub const STATUS_MULTI_STATUS: u16 = 207;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// `POST /exclusivity/cell`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRequest {
    pub entity_key: String,
    #[serde(default)]
    pub dimension_tuple: DimensionTuple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellResponse {
    pub action: CellAction,
    pub attribute_name: String,
}

impl From<CellSetResult> for CellResponse {
    fn from(value: CellSetResult) -> Self {
        Self {
            action: value.action,
            attribute_name: value.attribute_name,
        }
    }
}

/// `POST /exclusivity/cell/clear`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub entity_key: String,
    pub attribute_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearResponse {
    pub success: bool,
}

/// `POST /exclusivity/bulk`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub rows: Vec<BulkRow>,
}

/// Body returned with every 4xx/5xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Body is not valid JSON for the endpoint.
    Malformed(serde_json::Error),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed request body: {err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> u16 {
        STATUS_BAD_REQUEST
    }
}

pub fn parse_cell_request(body: &str) -> Result<CellRequest, ApiError> {
    serde_json::from_str(body).map_err(ApiError::Malformed)
}

pub fn parse_clear_request(body: &str) -> Result<ClearRequest, ApiError> {
    serde_json::from_str(body).map_err(ApiError::Malformed)
}

/// Decodes a bulk body. An empty `rows` array is left for the service to
/// reject so the message names the field.
pub fn parse_bulk_request(body: &str) -> Result<BulkRequest, ApiError> {
    serde_json::from_str(body).map_err(ApiError::Malformed)
}

/// 200 when every row succeeded, 207 when any row failed.
pub fn bulk_status(report: &ImportReport) -> u16 {
    if report.all_succeeded() {
        STATUS_OK
    } else {
        STATUS_MULTI_STATUS
    }
}

pub fn import_error_status(err: &ImportError) -> u16 {
    match err {
        ImportError::Malformed(_) | ImportError::MissingHeaders(_) | ImportError::Csv(_) => {
            STATUS_BAD_REQUEST
        }
        ImportError::Transport(_) => STATUS_INTERNAL_ERROR,
    }
}

pub fn exclusivity_error_status(err: &ExclusivityError) -> u16 {
    match err {
        ExclusivityError::InvalidTuple(_) | ExclusivityError::AttributeUnknown { .. } => {
            STATUS_BAD_REQUEST
        }
        ExclusivityError::EntityNotFound { .. } => STATUS_NOT_FOUND,
        ExclusivityError::Repo(_) => STATUS_INTERNAL_ERROR,
    }
}

/// Clear answers 404 when the cell row was never written.
pub fn clear_outcome_status(outcome: ClearOutcome) -> u16 {
    match outcome {
        ClearOutcome::Cleared => STATUS_OK,
        ClearOutcome::NotFound => STATUS_NOT_FOUND,
    }
}
