use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 255;
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_PRICE: f64 = 999_999.99;
pub const MAX_STOCK: i32 = 9999;

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && EMAIL_RE.is_match(email)
}

pub fn email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Formato de email inválido".to_string()))
    }
}

pub fn password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "La contraseña no puede exceder {MAX_PASSWORD_LEN} caracteres"
        )));
    }
    Ok(())
}

/// Names of catalog entries and people: 2..=100 characters after trimming.
pub fn name(field: &str, value: &str) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "{field} debe tener entre {MIN_NAME_LEN} y {MAX_NAME_LEN} caracteres"
        )));
    }
    Ok(())
}

pub fn price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest("El precio debe ser mayor a 0".to_string()));
    }
    if price > MAX_PRICE {
        return Err(AppError::BadRequest(format!(
            "El precio no puede exceder {MAX_PRICE}"
        )));
    }
    Ok(())
}

pub fn stock(stock: i32) -> Result<(), AppError> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(AppError::BadRequest(format!(
            "El stock debe estar entre 0 y {MAX_STOCK}"
        )));
    }
    Ok(())
}

/// Trimmed value, or `None` when blank.
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
