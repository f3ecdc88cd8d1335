use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output language for narrative fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    pub fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ko => "ko",
        }
    }

    /// Upper-case language name used inside instruction preambles.
    pub fn instruction_name(self) -> &'static str {
        match self {
            Self::En => "ENGLISH",
            Self::Ko => "KOREAN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ko => "Korean",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ko" | "kr" | "korean" => Ok(Self::Ko),
            other => Err(format!("unsupported locale '{other}' (expected en or ko)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Locale;

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert_eq!(" kr ".parse::<Locale>(), Ok(Locale::Ko));
        assert_eq!("korean".parse::<Locale>(), Ok(Locale::Ko));
    }

    #[test]
    fn rejects_unknown_tags() {
        let err = "fr".parse::<Locale>().unwrap_err();
        assert_eq!(err, "unsupported locale 'fr' (expected en or ko)");
    }

    #[test]
    fn serializes_as_lowercase_tag() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&Locale::Ko)?, "\"ko\"");
        assert_eq!(Locale::Ko.to_string(), "ko");
        Ok(())
    }
}
