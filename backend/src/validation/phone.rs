/// Phone format rule. Which notations are accepted is deployment
/// configuration: NANP numbers (optional leading 1 plus ten digits),
/// E.164 numbers (`+` and 8 to 15 digits), and human formatting
/// (spaces, dots, dashes, parentheses) that is stripped before matching.
pub struct PhoneRule {
    allow_nanp: bool,
    allow_e164: bool,
    allow_formatting: bool,
}

impl PhoneRule {
    pub fn new(allow_nanp: bool, allow_e164: bool, allow_formatting: bool) -> Self {
        Self {
            allow_nanp,
            allow_e164,
            allow_formatting,
        }
    }

    pub fn is_valid(&self, value: &str) -> bool {
        let value = value.trim();
        let value = if self.allow_formatting {
            strip_formatting(value)
        } else {
            value.to_string()
        };

        (self.allow_nanp && is_nanp(&value)) || (self.allow_e164 && is_e164(&value))
    }

    /// Canonical form used for storage comparison: bare digits for NANP
    /// (leading 1 dropped), `+` plus digits for E.164.
    pub fn clean(&self, value: &str) -> String {
        let value = strip_formatting(value.trim());

        if let Some(digits) = value.strip_prefix('+') {
            return format!("+{}", digits);
        }

        if value.len() == 11 {
            if let Some(digits) = value.strip_prefix('1') {
                return digits.to_string();
            }
        }

        value
    }
}

fn strip_formatting(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect()
}

fn is_nanp(value: &str) -> bool {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let digits = match value.len() {
        10 => value,
        11 => match value.strip_prefix('1') {
            Some(rest) => rest,
            None => return false,
        },
        _ => return false,
    };

    // Area code and exchange may not start with 0 or 1.
    matches!(digits.as_bytes()[0], b'2'..=b'9') && matches!(digits.as_bytes()[3], b'2'..=b'9')
}

fn is_e164(value: &str) -> bool {
    let digits = match value.strip_prefix('+') {
        Some(digits) => digits,
        None => return false,
    };

    (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
