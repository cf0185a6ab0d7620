use regex::{Regex, RegexBuilder};

use crate::error::Error;

/// File-name suffixes of server-side scripts and native executables.
pub const SUSPICIOUS_EXTENSIONS: &str =
    r"\.(php|php[0-9]|phtml|pl|py|cgi|asp|aspx|exe|sh|bash|cmd)$";

/// Case-insensitive match of a file name against a trailing dotted suffix.
#[derive(Debug, Clone)]
pub struct SuspiciousPattern {
    regex: Regex,
}

impl SuspiciousPattern {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Build a pattern from bare extensions such as `["php", "cgi"]`.
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self, Error> {
        let alternation: Vec<String> = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();

        if alternation.is_empty() {
            return Err(Error::Other("no suspicious extensions given".to_string()));
        }

        Self::new(&format!(r"\.({})$", alternation.join("|")))
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

impl Default for SuspiciousPattern {
    fn default() -> Self {
        let regex = RegexBuilder::new(SUSPICIOUS_EXTENSIONS)
            .case_insensitive(true)
            .build()
            .expect("built-in suspicious extension pattern is valid");
        Self { regex }
    }
}
