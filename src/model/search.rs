use serde::Serialize;

use crate::model::User;

pub fn matches(user: &User, term: &str) -> bool {
    let lower = term.to_lowercase();
    user.name.to_lowercase().contains(&lower)
        || user.email.to_lowercase().contains(&lower)
        || user.user_id.to_string().contains(term)
}

/// Keeps the input order. An empty term keeps everything.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    users.iter().filter(|user| matches(user, term)).collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyState {
    NoUsers,
    NoMatches,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoUsers => "No users are registered yet",
            EmptyState::NoMatches => "No users match the search",
        }
    }
}

/// The filtered rows plus what a table needs around them.
#[derive(Debug, PartialEq, Eq)]
pub struct Listing<'a> {
    pub term: &'a str,
    pub total: usize,
    pub users: Vec<&'a User>,
    pub empty: Option<EmptyState>,
}

impl<'a> Listing<'a> {
    pub fn new(users: &'a [User], term: &'a str) -> Self {
        let filtered = filter_users(users, term);
        let empty = match (users.is_empty(), filtered.is_empty()) {
            (true, _) => Some(EmptyState::NoUsers),
            (false, true) => Some(EmptyState::NoMatches),
            (false, false) => None,
        };
        Self {
            term,
            total: users.len(),
            users: filtered,
            empty,
        }
    }

    pub fn summary(&self) -> String {
        format!("Showing {} of {} users", self.users.len(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<User> {
        vec![
            User::new("a", 3, "Alice", "alice@example.com"),
            User::new("b", 13, "Bob", "bob@example.com"),
            User::new("c", 7, "Carol", "a3@x.com"),
        ]
    }

    fn ids(users: &[&User]) -> Vec<u64> {
        users.iter().map(|u| u.user_id).collect()
    }

    #[test]
    fn should_keep_everything_for_empty_term() {
        let users = sample();
        assert_eq!(ids(&filter_users(&users, "")), vec![3, 13, 7]);
    }

    #[test]
    fn should_match_digits_in_user_id_or_email() {
        let users = sample();
        assert_eq!(ids(&filter_users(&users, "3")), vec![3, 13, 7]);
    }

    #[test]
    fn should_ignore_case_on_name_and_email() {
        let users = sample();
        assert_eq!(ids(&filter_users(&users, "ALI")), vec![3]);
        assert_eq!(ids(&filter_users(&users, "BOB@EXAMPLE")), vec![13]);
    }

    #[test]
    fn should_match_substrings_in_the_middle() {
        let users = sample();
        assert_eq!(ids(&filter_users(&users, "aro")), vec![7]);
        assert_eq!(ids(&filter_users(&users, "example.com")), vec![3, 13]);
    }

    #[test]
    fn should_report_no_users() {
        let listing = Listing::new(&[], "anything");
        assert_eq!(listing.empty, Some(EmptyState::NoUsers));
        assert_eq!(listing.summary(), "Showing 0 of 0 users");
    }

    #[test]
    fn should_report_no_matches() {
        let users = sample();
        let listing = Listing::new(&users, "zzz");
        assert_eq!(listing.empty, Some(EmptyState::NoMatches));
        assert_eq!(listing.total, 3);
        assert!(listing.users.is_empty());
    }

    #[test]
    fn should_summarize_shown_and_total() {
        let users = sample();
        let listing = Listing::new(&users, "bob");
        assert_eq!(listing.empty, None);
        assert_eq!(listing.summary(), "Showing 1 of 3 users");
    }
}
