use crate::server::response::ApiError;

const MAX_BUSINESS_NAME_LEN: usize = 100;
const MAX_PRODUCT_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;
const MAX_SLUG_LEN: usize = 50;

fn validate_display_text(name: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.chars().count() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if name.chars().any(char::is_control) {
        return Err(format!("{entity} name cannot contain control characters"));
    }
    Ok(())
}

pub fn validate_business_name(name: &str) -> Result<(), ApiError> {
    validate_display_text(name, "Business", MAX_BUSINESS_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_product_name(name: &str) -> Result<(), ApiError> {
    validate_display_text(name, "Product", MAX_PRODUCT_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("Email cannot exceed {MAX_EMAIL_LEN} characters"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Email must contain '@'".to_string());
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Email address is not valid".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Email cannot contain whitespace".to_string());
    }
    Ok(())
}

pub fn validate_money(value: f64, field: &str) -> Result<(), ApiError> {
    if !value.is_finite() {
        return Err(ApiError::bad_request(format!("{field} must be a number")));
    }
    if value < 0.0 {
        return Err(ApiError::bad_request(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Lower-case, hyphen-separated form of a business name. Falls back to
/// `business` when nothing usable is left.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let mut slug: String = slug.trim_end_matches('-').chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "business".to_string()
    } else {
        slug
    }
}
