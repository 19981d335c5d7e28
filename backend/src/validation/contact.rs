use db_connector::models::users::User;

use crate::error::FieldErrors;

use super::{EmailRule, PhoneRule};

/// Validate the contact channels a recovery code could be delivered through.
///
/// Returns the normalized email and phone plus the accumulated field errors.
/// A value that does not match the one stored for the user is reported as
/// `mismatch` and cleared, so an unverified contact never propagates. When
/// no user is known both returned values are cleared; the caller then falls
/// through to the faked-success branch.
pub fn validate_contact(
    user: Option<&User>,
    email: Option<String>,
    phone: Option<String>,
    email_rule: &EmailRule,
    phone_rule: &PhoneRule,
) -> (Option<String>, Option<String>, FieldErrors) {
    let mut errors = FieldErrors::new();
    let mut email = email;
    let mut phone = phone;

    if phone.is_none() && email.is_none() {
        errors.set("contact", "required");
    } else if let Some(user) = user {
        if user.phone.is_none() && user.email.is_none() {
            errors.set("contact", "empty");
        }
    }

    if let Some(value) = phone.as_deref() {
        if !phone_rule.is_valid(value) {
            errors.set("phone", "invalid");
        } else if let Some(user) = user {
            let cleaned = phone_rule.clean(value);
            let stored = user.phone.as_deref().map(|stored| phone_rule.clean(stored));

            if stored.as_deref() == Some(cleaned.as_str()) {
                phone = Some(cleaned);
            } else {
                errors.set("phone", "mismatch");
                phone = None;
            }
        }
    }

    if let Some(value) = email.as_deref() {
        if !email_rule.is_valid(value) {
            errors.set("email", "invalid");
        } else if let Some(user) = user {
            let cleaned = email_rule.clean(value);
            let stored = user.email.as_deref().map(|stored| email_rule.clean(stored));

            if stored.as_deref() == Some(cleaned.as_str()) {
                email = Some(cleaned);
            } else {
                errors.set("email", "mismatch");
                email = None;
            }
        }
    }

    // A channel the user has nothing stored for is never used for delivery,
    // and without a known user there is nothing to deliver at all.
    if let Some(user) = user {
        if user.email.is_none() {
            email = None;
        }
        if user.phone.is_none() {
            phone = None;
        }
    } else {
        email = None;
        phone = None;
    }

    (email, phone, errors)
}
