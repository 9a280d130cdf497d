//! Admin search box: one query, one kind of result.

use serde::Serialize;

use super::{DeskStore, Topic, User};
use crate::error::DeskError;

/// Upper bound on topics returned by a text search.
pub const SEARCH_LIMIT: i64 = 100;

/// How a raw query is first interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    TicketId(i64),
    Text(String),
}

/// Result of a search. At most one slot is populated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Topic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

impl SearchResults {
    fn topics(topics: Vec<Topic>) -> Self {
        Self {
            topics: Some(topics),
            ..Default::default()
        }
    }

    fn user(user: User) -> Self {
        Self {
            user: Some(user),
            ..Default::default()
        }
    }

    fn users(users: Vec<User>) -> Self {
        Self {
            users: Some(users),
            ..Default::default()
        }
    }
}

pub fn classify(query: &str) -> Result<SearchQuery, DeskError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(DeskError::validation("search query cannot be empty"));
    }
    if query.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = query.parse() {
            return Ok(SearchQuery::TicketId(id));
        }
    }
    Ok(SearchQuery::Text(query.to_string()))
}

/// Run a search with precedence: ticket id, exact user name, partial user
/// match, then topic subject/body text.
pub fn dispatch(store: &dyn DeskStore, query: &str) -> Result<SearchResults, DeskError> {
    let text = match classify(query)? {
        SearchQuery::TicketId(id) => {
            if let Some(topic) = store.get_topic(id)? {
                return Ok(SearchResults::topics(vec![topic]));
            }
            id.to_string()
        }
        SearchQuery::Text(text) => text,
    };

    let mut exact = store.users_named(&text)?;
    if exact.len() == 1 {
        return Ok(SearchResults::user(exact.remove(0)));
    }

    let mut partial = store.users_matching(&text)?;
    match partial.len() {
        0 => {}
        1 => return Ok(SearchResults::user(partial.remove(0))),
        _ => return Ok(SearchResults::users(partial)),
    }

    Ok(SearchResults::topics(store.search_topics(&text, SEARCH_LIMIT)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::{NewTicket, NewUser, SqliteDeskStore, UserRole};

    fn seeded() -> SqliteDeskStore {
        let store = SqliteDeskStore::in_memory().unwrap();
        let admin = store
            .create_user(NewUser {
                name: "Admin User".to_string(),
                email: "admin@test.com".to_string(),
                role: UserRole::Admin,
            })
            .unwrap();
        for (name, email) in [
            ("Scott Smith", "scott.smith@test.com"),
            ("Scott Jones", "scott.jones@test.com"),
            ("Great Scott", "gs@test.com"),
        ] {
            store
                .create_user(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    role: UserRole::User,
                })
                .unwrap();
        }
        store
            .create_ticket(
                NewTicket {
                    requester_name: "Scott Smith".to_string(),
                    requester_email: "scott.smith@test.com".to_string(),
                    subject: "Pending private topic".to_string(),
                    body: "A question about refunds".to_string(),
                    forum_id: 1,
                    private: true,
                    submitted_by_requester: false,
                },
                &admin,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(" 42 ").unwrap(), SearchQuery::TicketId(42));
        assert_eq!(
            classify("Admin User").unwrap(),
            SearchQuery::Text("Admin User".to_string())
        );
        assert_eq!(classify("4a").unwrap(), SearchQuery::Text("4a".to_string()));
        assert!(classify("   ").is_err());
    }

    #[test]
    fn test_classify_overflowing_number_is_text() {
        let huge = "99999999999999999999999";
        assert_eq!(classify(huge).unwrap(), SearchQuery::Text(huge.to_string()));
    }

    #[test]
    fn test_numeric_query_finds_ticket() {
        let store = seeded();
        let results = dispatch(&store, "1").unwrap();
        assert_eq!(results.topics.unwrap().len(), 1);
        assert!(results.user.is_none());
        assert!(results.users.is_none());
    }

    #[test]
    fn test_unknown_numeric_id_falls_through_to_text() {
        let store = seeded();
        let results = dispatch(&store, "999").unwrap();
        assert_eq!(results.topics.unwrap().len(), 0);
        assert!(results.user.is_none());
    }

    #[test]
    fn test_exact_name_finds_single_user() {
        let store = seeded();
        let results = dispatch(&store, "admin user").unwrap();
        assert_eq!(results.user.unwrap().email, "admin@test.com");
        assert!(results.topics.is_none());
        assert!(results.users.is_none());
    }

    #[test]
    fn test_partial_name_finds_many_users() {
        let store = seeded();
        let results = dispatch(&store, "scott").unwrap();
        assert!(results.topics.is_none());
        assert!(results.user.is_none());
        assert_eq!(results.users.unwrap().len(), 3);
    }

    #[test]
    fn test_single_partial_match_fills_user_slot() {
        let store = seeded();
        let results = dispatch(&store, "jones").unwrap();
        assert_eq!(results.user.unwrap().name, "Scott Jones");
        assert!(results.users.is_none());
    }

    #[test]
    fn test_subject_text_finds_topics() {
        let store = seeded();
        let results = dispatch(&store, "Pending private topic").unwrap();
        assert_eq!(results.topics.unwrap().len(), 1);
        assert!(results.user.is_none());

        let results = dispatch(&store, "refunds").unwrap();
        assert_eq!(results.topics.unwrap().len(), 1);
    }

    #[test]
    fn test_non_ascii_names_match_in_any_case() {
        let store = seeded();
        store
            .create_user(NewUser {
                name: "Émile Zola".to_string(),
                email: "ez@test.com".to_string(),
                role: UserRole::User,
            })
            .unwrap();

        for query in ["Émile", "émile", "ÉMILE", "zola"] {
            let results = dispatch(&store, query).unwrap();
            assert_eq!(
                results.user.map(|u| u.email).as_deref(),
                Some("ez@test.com"),
                "query {:?}",
                query
            );
        }

        let results = dispatch(&store, "ÉMILE ZOLA").unwrap();
        assert_eq!(results.user.unwrap().name, "Émile Zola");
    }
}
