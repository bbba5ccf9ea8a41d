use once_cell::sync::Lazy;
use serde_json::Value;

use crate::application::{app_error::ErrorCode, language::UserLanguage};

static RAW_PT: &str = include_str!("../../dictionaries/pt.json");
static RAW_EN: &str = include_str!("../../dictionaries/en.json");

static DICT_PT: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(RAW_PT).expect("failed to parse pt dictionary json"));
static DICT_EN: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(RAW_EN).expect("failed to parse en dictionary json"));

/// Looks up a dotted path. Missing keys fall back to the path itself.
pub fn t(lang: UserLanguage, path: &str) -> String {
    let dict = match lang {
        UserLanguage::Pt => &*DICT_PT,
        UserLanguage::En => &*DICT_EN,
    };
    let mut cursor = dict;
    for segment in path.split('.') {
        if let Some(v) = cursor.get(segment) {
            cursor = v;
        } else {
            return path.to_string();
        }
    }
    cursor.as_str().unwrap_or(path).to_string()
}

pub fn error_message(lang: UserLanguage, code: ErrorCode) -> String {
    t(lang, &format!("errors.{}", code.as_str()))
}

/// Message for an `InvalidCustomerData` field (`tax_id`, `phone`, ...).
/// Unknown fields get the generic error text.
pub fn customer_field_message(lang: UserLanguage, field: &str) -> String {
    let path = format!("customer_data.{}", field);
    let message = t(lang, &path);
    if message == path {
        error_message(lang, ErrorCode::InvalidCustomerData)
    } else {
        message
    }
}

/// Banner copy for the professional dashboard (`none`, `active`, `expired`).
pub fn subscription_banner(lang: UserLanguage, status: &str) -> String {
    t(lang, &format!("subscription.{}", status))
}
