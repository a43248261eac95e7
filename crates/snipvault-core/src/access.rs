//! Allow-list gating for writes and private snippets.

use std::collections::HashSet;

/// Decides which usernames may write and see private snippets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed: HashSet<String>,
}

impl AccessPolicy {
    /// Build a policy from an allow-list. An empty list authorizes everyone
    /// who is signed in.
    pub fn from_allow_list<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: users
                .into_iter()
                .map(|u| u.as_ref().trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Whether `username` may write. Anonymous callers never may.
    pub fn is_authorized(&self, username: Option<&str>) -> bool {
        match username {
            None => false,
            Some(_) if self.allowed.is_empty() => true,
            Some(user) => self.allowed.contains(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_never_authorized() {
        assert!(!AccessPolicy::default().is_authorized(None));
        assert!(!AccessPolicy::from_allow_list(["alice"]).is_authorized(None));
    }

    #[test]
    fn test_empty_list_allows_any_user() {
        let policy = AccessPolicy::from_allow_list(Vec::<String>::new());
        assert!(policy.is_open());
        assert!(policy.is_authorized(Some("anyone")));
    }

    #[test]
    fn test_membership() {
        let policy = AccessPolicy::from_allow_list([" alice ", "", "bob"]);
        assert!(!policy.is_open());
        assert!(policy.is_authorized(Some("alice")));
        assert!(policy.is_authorized(Some("bob")));
        assert!(!policy.is_authorized(Some("mallory")));
    }
}
