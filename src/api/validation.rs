use super::ApiError;

pub fn validate_id(id: i32, what: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            what, id
        )));
    }
    Ok(id)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(ApiError::validation(format!("Invalid email: {}", trimmed)));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::validation(format!("Invalid email: {}", trimmed)));
    }

    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(password)
}

pub fn validate_name<'a>(name: &'a str, what: &str) -> Result<&'a str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} name cannot be empty", what)));
    }

    if trimmed.len() > 100 {
        return Err(ApiError::validation(format!(
            "{} name must be 100 characters or less",
            what
        )));
    }

    Ok(trimmed)
}

pub fn validate_question(question: &str) -> Result<&str, ApiError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Question cannot be empty"));
    }
    Ok(trimmed)
}

pub fn validate_scopes(scopes: &[String]) -> Result<(), ApiError> {
    if scopes.is_empty() {
        return Err(ApiError::validation(
            "At least one permission scope is required",
        ));
    }

    if let Some(bad) = scopes.iter().find(|s| s.trim().is_empty()) {
        return Err(ApiError::validation(format!(
            "Invalid permission scope: '{}'",
            bad
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "team").is_ok());
        assert!(validate_id(0, "team").is_err());
        assert!(validate_id(-5, "team").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@example.com").is_ok());
        assert_eq!(validate_email("  ops@example.com ").unwrap(), "ops@example.com");
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ops@nodot").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ops  ", "Team").unwrap(), "Ops");
        assert!(validate_name("   ", "Team").is_err());
        assert!(validate_name(&"a".repeat(101), "Team").is_err());
    }

    #[test]
    fn test_validate_scopes() {
        assert!(validate_scopes(&["query:read".to_string()]).is_ok());
        assert!(validate_scopes(&[]).is_err());
        assert!(validate_scopes(&[" ".to_string()]).is_err());
    }
}
