use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid email format".to_string()))
    }
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_address() {
        assert!(validate_email("candidate@example.com").is_ok());
    }

    #[test]
    fn rejects_missing_domain_dot() {
        assert!(validate_email("candidate@localhost").is_err());
        assert!(validate_email("no-at-sign.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn password_length_is_checked_in_chars() {
        assert!(validate_password_len("пароль12").is_ok());
        assert!(validate_password_len("short7!").is_err());
    }
}
