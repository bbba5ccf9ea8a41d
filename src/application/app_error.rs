use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Checkout session not found")]
    SessionNotFound,

    #[error("Checkout session not completed")]
    SessionIncomplete,

    #[error("Plan is unknown or inactive")]
    InvalidPlan,

    #[error("Invalid customer data: {0}")]
    InvalidCustomerData(String),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Payment provider not configured")]
    ProviderNotConfigured,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidSignature,
    PaymentNotConfirmed,
    InvalidPlan,
    InvalidCustomerData,
    PaymentProviderUnavailable,
    ProviderNotConfigured,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::PaymentNotConfirmed => "PAYMENT_NOT_CONFIRMED",
            ErrorCode::InvalidPlan => "INVALID_PLAN",
            ErrorCode::InvalidCustomerData => "INVALID_CUSTOMER_DATA",
            ErrorCode::PaymentProviderUnavailable => "PAYMENT_PROVIDER_UNAVAILABLE",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::Forbidden => ErrorCode::Forbidden,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::SessionNotFound | AppError::SessionIncomplete => {
                ErrorCode::PaymentNotConfirmed
            }
            AppError::InvalidPlan => ErrorCode::InvalidPlan,
            AppError::InvalidCustomerData(_) => ErrorCode::InvalidCustomerData,
            AppError::ProviderUnavailable(_) => ErrorCode::PaymentProviderUnavailable,
            AppError::ProviderNotConfigured => ErrorCode::ProviderNotConfigured,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
