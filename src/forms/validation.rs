use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{6,}$").expect("valid username pattern"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

pub const USERNAME_MSG: &str = "Mínimo 6, solo letras y números";
pub const EMAIL_MSG: &str = "Formato de correo inválido";
pub const FIRST_NAME_MSG: &str = "Ingresa tus nombres";
pub const LAST_NAME_MSG: &str = "Ingresa tus apellidos";
pub const DOB_MSG: &str = "Debes ser mayor de 18 años";
pub const PASSWORD_MSG: &str = "Mínimo 8, incluye mayúscula, minúscula y dígito";
pub const LOGIN_ID_MSG: &str = "Ingresa tu email o usuario";
pub const LOGIN_PASSWORD_MSG: &str = "Ingresa tu contraseña";

pub const MIN_AGE_YEARS: i32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Username,
    Email,
    FirstName,
    LastName,
    Dob,
    Password,
    LoginId,
    LoginPassword,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Dob => "dob",
            Field::Password => "password",
            Field::LoginId => "identifier",
            Field::LoginPassword => "password",
        };
        f.write_str(name)
    }
}

/// Inline error messages keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }
}

pub fn validate_username(value: &str) -> bool {
    USERNAME_RE.is_match(value)
}

pub fn validate_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn validate_not_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn validate_password(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().count() >= 8
}

/// Latest birth date that is at least 18 years old on `today`.
pub fn adult_cutoff(today: NaiveDate) -> NaiveDate {
    let year = today.year() - MIN_AGE_YEARS;
    // 29 February rolls over to 1 March when the target year is not a leap year.
    NaiveDate::from_ymd_opt(year, today.month(), today.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(today)
}

/// `value` is a `YYYY-MM-DD` date on or before the 18-year cutoff.
pub fn validate_dob(value: &str, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        Ok(dob) => dob <= adult_cutoff(today),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub password: String,
}

impl RegistrationForm {
    /// Checks every field and reports all failures at once.
    pub fn validate(&self, today: NaiveDate) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if !validate_username(self.username.trim()) {
            errors.insert(Field::Username, USERNAME_MSG);
        }
        if !validate_email(self.email.trim()) {
            errors.insert(Field::Email, EMAIL_MSG);
        }
        if !validate_not_empty(&self.first_name) {
            errors.insert(Field::FirstName, FIRST_NAME_MSG);
        }
        if !validate_not_empty(&self.last_name) {
            errors.insert(Field::LastName, LAST_NAME_MSG);
        }
        if !validate_dob(&self.dob, today) {
            errors.insert(Field::Dob, DOB_MSG);
        }
        if !validate_password(&self.password) {
            errors.insert(Field::Password, PASSWORD_MSG);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

impl LoginForm {
    /// Stops at the first missing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.identifier.trim().is_empty() {
            errors.insert(Field::LoginId, LOGIN_ID_MSG);
        } else if self.password.is_empty() {
            errors.insert(Field::LoginPassword, LOGIN_PASSWORD_MSG);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
