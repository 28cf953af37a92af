//! Input validation for tenant identity fields

use crate::error::VetError;

/// Validate a tenant display name (1-100 characters after trimming)
pub fn validate_tenant_name(name: &str) -> Result<(), VetError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 100 {
        return Err(VetError::Validation(
            "Tenant name must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate a tenant slug.
///
/// Slugs are URL-facing: 1-50 characters, lowercase letters, digits, and
/// hyphens, with no leading/trailing or consecutive hyphens.
pub fn validate_slug(slug: &str) -> Result<(), VetError> {
    if slug.is_empty() || slug.len() > 50 {
        return Err(VetError::Validation(
            "Tenant slug must be between 1 and 50 characters".to_string(),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(VetError::Validation(
            "Slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(VetError::Validation(
            "Slug cannot start or end with a hyphen".to_string(),
        ));
    }

    if slug.contains("--") {
        return Err(VetError::Validation(
            "Slug cannot contain consecutive hyphens".to_string(),
        ));
    }

    Ok(())
}
