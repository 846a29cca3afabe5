use std::fmt;

/// A Telegram chat identifier. Private chats are positive integers, groups are negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatId(String);

impl ChatId {
    pub fn parse(s: String) -> Result<ChatId, String> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        let is_numeric = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
        if !is_numeric || trimmed.parse::<i64>().is_err() {
            return Err(format!("'{}' is not a valid chat id, it must be numeric.", s));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses a comma-separated recipient list, skipping blank entries.
    pub fn parse_list(list: &str) -> Result<Vec<ChatId>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| ChatId::parse(id.to_string()))
            .collect()
    }
}

impl AsRef<str> for ChatId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<String> for ChatId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ChatId::parse(value)
    }
}

impl From<ChatId> for String {
    fn from(id: ChatId) -> Self {
        id.0
    }
}
