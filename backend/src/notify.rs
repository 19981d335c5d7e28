use askama::Template;
use db_connector::models::{recoveries::Recovery, users::User};
use lettre::{message::header::ContentType, Message, SmtpTransport, Transport};

use crate::utils::format_date_time;

/// Out-of-band delivery of a recovery code. The handlers only depend on
/// this trait, so the transport can be swapped per deployment and faked in
/// tests. Returns whether the code was handed to the transport.
pub trait CodeNotifier: Send + Sync {
    fn send_recovery_code(
        &self,
        user: &User,
        recovery: &Recovery,
        email: Option<&str>,
        phone: Option<&str>,
        lang: &str,
    ) -> bool;
}

#[derive(Template)]
#[template(path = "recovery_code_en.html")]
struct RecoveryCodeENTemplate<'a> {
    name: &'a str,
    code: &'a str,
    expiration: &'a str,
}

#[derive(Template)]
#[template(path = "recovery_code_de.html")]
struct RecoveryCodeDETemplate<'a> {
    name: &'a str,
    code: &'a str,
    expiration: &'a str,
}

/// Email delivery via SMTP. Phone delivery needs an SMS gateway and is not
/// part of this transport; a deployment using phone recovery plugs in its
/// own `CodeNotifier`.
pub struct SmtpNotifier {
    pub mailer: SmtpTransport,
    pub sender_email: String,
    pub sender_name: String,
}

impl SmtpNotifier {
    fn send_mail(&self, to: &str, subject: &str, body: String) -> bool {
        let from = match format!("{} <{}>", self.sender_name, self.sender_email).parse() {
            Ok(from) => from,
            Err(err) => {
                log::error!("Invalid sender address: {}", err);
                return false;
            }
        };
        let to = match to.parse() {
            Ok(to) => to,
            Err(err) => {
                log::error!("Invalid recipient address: {}", err);
                return false;
            }
        };

        let mail = match Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
        {
            Ok(mail) => mail,
            Err(err) => {
                log::error!("Failed to build recovery mail: {}", err);
                return false;
            }
        };

        match self.mailer.send(&mail) {
            Ok(_) => {
                log::debug!("Sent recovery code mail.");
                true
            }
            Err(err) => {
                log::error!("Failed to send recovery code mail: {}", err);
                false
            }
        }
    }
}

impl CodeNotifier for SmtpNotifier {
    fn send_recovery_code(
        &self,
        user: &User,
        recovery: &Recovery,
        email: Option<&str>,
        phone: Option<&str>,
        lang: &str,
    ) -> bool {
        let email = match email {
            Some(email) => email,
            None => {
                if phone.is_some() {
                    log::warn!("No SMS transport configured, cannot deliver recovery code");
                }
                return false;
            }
        };

        let expiration = format_date_time(recovery.expiration);

        let (body, subject) = match lang {
            "de" | "de-DE" => {
                let template = RecoveryCodeDETemplate {
                    name: &user.name,
                    code: &recovery.code,
                    expiration: &expiration,
                };
                match template.render() {
                    Ok(body) => (body, "Konto-Wiederherstellung"),
                    Err(err) => {
                        log::error!("Failed to render recovery mail template: {}", err);
                        return false;
                    }
                }
            }
            _ => {
                let template = RecoveryCodeENTemplate {
                    name: &user.name,
                    code: &recovery.code,
                    expiration: &expiration,
                };
                match template.render() {
                    Ok(body) => (body, "Account recovery"),
                    Err(err) => {
                        log::error!("Failed to render recovery mail template: {}", err);
                        return false;
                    }
                }
            }
        };

        self.send_mail(email, subject, body)
    }
}
