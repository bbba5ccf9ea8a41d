pub mod app_error;
pub mod dictionaries;
pub mod jwt;
pub mod language;
pub mod ports;
pub mod use_cases;
pub mod validators;
