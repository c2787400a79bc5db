//! Authentication module for filevault.
//!
//! This module provides password hashing, input validation,
//! user registration and login.

mod password;
mod registration;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{
    authenticate, register, RegistrationError, RegistrationRequest, INVALID_CREDENTIALS,
};
pub use validation::ValidationError;
