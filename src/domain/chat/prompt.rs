//! Validated input of one chat send.

use crate::domain::foundation::ValidationError;

/// Timezone used when the caller does not send one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Prompt text plus the IANA timezone the upstream renders timestamps in.
///
/// Length is not limited here; the upstream may reject long prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    text: String,
    timezone: String,
}

impl ChatPrompt {
    pub fn new(text: impl Into<String>, timezone: Option<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("prompt"));
        }

        let timezone = match timezone {
            Some(tz) if !tz.trim().is_empty() => tz.trim().to_string(),
            _ => DEFAULT_TIMEZONE.to_string(),
        };
        if timezone.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::invalid_format(
                "timezone",
                "expected an IANA timezone name such as Europe/Berlin",
            ));
        }

        Ok(Self { text, timezone })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}
