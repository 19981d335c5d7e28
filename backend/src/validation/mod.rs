mod contact;
mod email;
mod phone;

pub use contact::validate_contact;
pub use email::EmailRule;
pub use phone::PhoneRule;
