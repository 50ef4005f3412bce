//! Client-side checks for the sign-up and sign-in forms.
//!
//! Failures here stay with the caller: nothing is sent to the identity
//! provider and no notice is raised.

use std::sync::OnceLock;

use regex::Regex;

use crate::error_handling::types::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("invalid email pattern: {}", e))
    })
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingField("Email"));
    }
    if !email_pattern().is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_sign_in(form: &SignInForm) -> Result<(), ValidationError> {
    validate_email(&form.email)?;
    if form.password.is_empty() {
        return Err(ValidationError::MissingField("Password"));
    }
    Ok(())
}

/// Checks fields in form order: name, email, photo URL, password.
pub fn validate_sign_up(form: &SignUpForm) -> Result<(), ValidationError> {
    if form.display_name.trim().is_empty() {
        return Err(ValidationError::MissingField("Name"));
    }
    validate_email(&form.email)?;
    let avatar = form.avatar_url.trim();
    if !avatar.is_empty() && !(avatar.starts_with("http://") || avatar.starts_with("https://")) {
        return Err(ValidationError::InvalidAvatarUrl);
    }
    if form.password.is_empty() {
        return Err(ValidationError::MissingField("Password"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up() -> SignUpForm {
        SignUpForm {
            email: "runner@example.com".into(),
            password: "secret1".into(),
            display_name: "Runner".into(),
            avatar_url: "https://img.example.com/r.png".into(),
        }
    }

    #[test]
    fn test_valid_sign_up() {
        assert_eq!(validate_sign_up(&sign_up()), Ok(()));
    }

    #[test]
    fn test_missing_name_reported_first() {
        let form = SignUpForm {
            display_name: " ".into(),
            email: String::new(),
            ..sign_up()
        };
        assert_eq!(validate_sign_up(&form), Err(ValidationError::MissingField("Name")));
    }

    #[test]
    fn test_bad_email() {
        for email in ["runner", "runner@", "run ner@example.com", "runner@example"] {
            let form = SignInForm {
                email: email.into(),
                password: "x".into(),
            };
            assert_eq!(validate_sign_in(&form), Err(ValidationError::InvalidEmail), "{}", email);
        }
    }

    #[test]
    fn test_short_password() {
        let form = SignUpForm {
            password: "abc".into(),
            ..sign_up()
        };
        assert_eq!(
            validate_sign_up(&form),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
    }

    #[test]
    fn test_avatar_must_be_http() {
        let form = SignUpForm {
            avatar_url: "ftp://x/y.png".into(),
            ..sign_up()
        };
        assert_eq!(validate_sign_up(&form), Err(ValidationError::InvalidAvatarUrl));
        let no_avatar = SignUpForm {
            avatar_url: String::new(),
            ..sign_up()
        };
        assert!(validate_sign_up(&no_avatar).is_ok());
    }

    #[test]
    fn test_sign_in_requires_password() {
        let form = SignInForm {
            email: "runner@example.com".into(),
            password: String::new(),
        };
        assert_eq!(validate_sign_in(&form), Err(ValidationError::MissingField("Password")));
    }
}
