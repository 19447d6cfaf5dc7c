pub mod validation;

pub use validation::{FieldErrors, LoginForm, RegistrationForm};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::api::models::{LoginRequest, RegisterRequest};
use crate::api::{ApiError, ChatBackend};

pub const REGISTER_FAILED_MSG: &str = "Error en registro";
pub const LOGIN_FAILED_MSG: &str = "Error en inicio de sesión";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    /// Blocked client-side; nothing was sent.
    Invalid(FieldErrors),
    Rejected(String),
    /// Accepted; `next` is where the page navigates to.
    Accepted { next: &'static str },
}

fn rejection(error: ApiError, fallback: &str) -> FormOutcome {
    debug!("Form submission failed: {}", error);
    match error {
        ApiError::Unauthorized(Some(message))
        | ApiError::Rejected {
            message: Some(message),
            ..
        } => FormOutcome::Rejected(message),
        _ => FormOutcome::Rejected(fallback.to_string()),
    }
}

pub async fn submit_registration<B: ChatBackend + ?Sized>(
    backend: &B,
    form: &RegistrationForm,
    csrf_token: Option<&str>,
    today: NaiveDate,
) -> FormOutcome {
    if let Err(errors) = form.validate(today) {
        return FormOutcome::Invalid(errors);
    }

    let request = RegisterRequest {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        dob: form.dob.trim().to_string(),
        password: form.password.clone(),
    };

    match backend.register(&request, csrf_token).await {
        Ok(()) => {
            info!("Registered {}", request.username);
            FormOutcome::Accepted { next: "/login" }
        }
        Err(e) => rejection(e, REGISTER_FAILED_MSG),
    }
}

pub async fn submit_login<B: ChatBackend + ?Sized>(
    backend: &B,
    form: &LoginForm,
    csrf_token: Option<&str>,
) -> FormOutcome {
    if let Err(errors) = form.validate() {
        return FormOutcome::Invalid(errors);
    }

    let request = LoginRequest {
        identifier: form.identifier.trim().to_string(),
        password: form.password.clone(),
    };

    match backend.login(&request, csrf_token).await {
        Ok(()) => {
            info!("Logged in as {}", request.identifier);
            FormOutcome::Accepted { next: "/chat" }
        }
        Err(e) => rejection(e, LOGIN_FAILED_MSG),
    }
}
