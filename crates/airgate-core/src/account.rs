use secrecy::SecretString;
use url::Url;

/// An upstream API account
///
/// Treated as immutable for the duration of a request; the store hands out
/// owned copies.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub base_url: Url,
    pub api_key: SecretString,
    pub enabled: bool,
    /// Comma-separated provider family tags, e.g. `claude`
    pub ext: Option<String>,
    /// Seconds since the Unix epoch
    pub updated_at: u64,
}

impl Account {
    /// Whether the account may be sent a provider family's native requests
    pub fn supports_family(&self, family: &str) -> bool {
        self.ext.as_deref().is_some_and(|ext| {
            ext.split(',')
                .map(str::trim)
                .any(|tag| tag.eq_ignore_ascii_case(family))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(ext: Option<&str>) -> Account {
        Account {
            id: 1,
            name: "primary".to_owned(),
            base_url: Url::parse("https://api.example.com").unwrap(),
            api_key: SecretString::from("sk-test"),
            enabled: true,
            ext: ext.map(str::to_owned),
            updated_at: 0,
        }
    }

    #[test]
    fn family_tags() {
        assert!(account(Some("claude")).supports_family("claude"));
        assert!(account(Some("gemini, Claude")).supports_family("claude"));
        assert!(!account(Some("claudeish")).supports_family("claude"));
        assert!(!account(None).supports_family("claude"));
    }
}
