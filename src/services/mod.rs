//! Services Layer
//!
//! This module contains pure business logic extracted from HTTP handlers.
//! Services speak `ServiceError`, never HTTP status codes.

pub mod budget_service;
pub mod group_expense_service;
pub mod group_service;
pub mod loan_service;
pub mod recurring;
pub mod report_service;
pub mod savings_service;
pub mod subscription_service;

use std::fmt;

use crate::domain::DomainError;

/// Error type for service operations
#[derive(Debug)]
pub enum ServiceError {
    Database(String),
    NotFound,
    Validation(String),
    Forbidden(String),
    InvalidState(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Database(msg) => write!(f, "Database error: {}", msg),
            ServiceError::NotFound => write!(f, "Not found"),
            ServiceError::Validation(msg) => write!(f, "{}", msg),
            ServiceError::Forbidden(msg) => write!(f, "{}", msg),
            ServiceError::InvalidState(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Database(e.to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::Database(msg) => ServiceError::Database(msg),
            DomainError::Internal(msg) => ServiceError::Database(msg),
        }
    }
}
