//! Testing utilities: a recording mailer and seed data shaped like the
//! admin fixtures (an admin, three "Scott" users, tickets in every status,
//! and a small knowledge base).
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_core::testing::{fixtures, MockMailer};
//!
//! let store = SqliteDeskStore::in_memory()?;
//! let seed = fixtures::seed_desk(&store)?;
//! assert_eq!(seed.topics.len(), 7);
//! ```

mod mock_mailer;

pub use mock_mailer::MockMailer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::desk::{
        DeskStore, NewReply, NewTicket, NewUser, StatusChange, Topic, User, UserRole,
    };
    use crate::error::DeskError;
    use crate::knowledge::{Category, Doc, KnowledgeStore, NewDoc};

    /// Ids of the seeded records, in creation order.
    #[derive(Debug, Clone)]
    pub struct SeededDesk {
        /// "Admin User", the first admin.
        pub admin: User,
        /// "Scott Smith", requester of topics 1 to 6.
        pub scott_smith: User,
        /// "Scott Jones", requester of topic 7.
        pub scott_jones: User,
        /// "Scott Green", an agent.
        pub scott_green: User,
        /// Topics 1 to 7.
        pub topics: Vec<Topic>,
    }

    pub fn new_user(name: &str, email: &str, role: UserRole) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            role,
        }
    }

    /// A ticket opened by an agent for `email`.
    pub fn new_ticket(name: &str, email: &str, subject: &str) -> NewTicket {
        NewTicket {
            requester_name: name.to_string(),
            requester_email: email.to_string(),
            subject: subject.to_string(),
            body: format!("{} body text", subject),
            forum_id: 1,
            private: true,
            submitted_by_requester: false,
        }
    }

    /// Seed users and tickets.
    ///
    /// | id | subject | status | notes |
    /// |----|---------|--------|-------|
    /// | 1 | Pending private topic | pending | unassigned |
    /// | 2 | Open private topic | open | |
    /// | 3 | Closed private topic | closed | assigned to Scott Green |
    /// | 4 | Spam topic | spam | |
    /// | 5 | Another pending topic | pending | |
    /// | 6 | New private topic | open | never viewed |
    /// | 7 | Question from Scott Jones | open | |
    pub fn seed_desk(store: &dyn DeskStore) -> Result<SeededDesk, DeskError> {
        let admin = store.create_user(new_user("Admin User", "admin@test.com", UserRole::Admin))?;
        let scott_smith =
            store.create_user(new_user("Scott Smith", "scott.smith@test.com", UserRole::User))?;
        let scott_jones =
            store.create_user(new_user("Scott Jones", "scott.jones@test.com", UserRole::User))?;
        let scott_green =
            store.create_user(new_user("Scott Green", "scott.green@test.com", UserRole::Agent))?;

        let smith = |subject: &str| new_ticket(&scott_smith.name, &scott_smith.email, subject);

        let t1 = store.create_ticket(smith("Pending private topic"), &admin)?.topic;
        let t2 = store.create_ticket(smith("Open private topic"), &admin)?.topic;
        let t3 = store.create_ticket(smith("Closed private topic"), &admin)?.topic;
        let t4 = store.create_ticket(smith("Spam topic"), &admin)?.topic;
        let t5 = store.create_ticket(smith("Another pending topic"), &admin)?.topic;
        let mut fresh = smith("New private topic");
        fresh.submitted_by_requester = true;
        let t6 = store.create_ticket(fresh, &admin)?.topic;
        let mut question = new_ticket(
            &scott_jones.name,
            &scott_jones.email,
            "Question from Scott Jones",
        );
        question.private = false;
        let t7 = store.create_ticket(question, &admin)?.topic;

        for id in [t2.id, t7.id] {
            store.add_reply(NewReply {
                topic_id: id,
                author_id: admin.id,
                body: "Thanks, looking into it.".to_string(),
                internal: false,
                change_status: None,
            })?;
        }
        store.assign(&[t3.id], scott_green.id, &admin)?;
        store.change_status(&[t3.id], StatusChange::Close, &admin)?;
        store.change_status(&[t4.id], StatusChange::Spam, &admin)?;

        let mut topics = Vec::new();
        for id in [t1.id, t2.id, t3.id, t4.id, t5.id, t6.id, t7.id] {
            if let Some(topic) = store.get_topic(id)? {
                topics.push(topic);
            }
        }

        Ok(SeededDesk {
            admin,
            scott_smith,
            scott_jones,
            scott_green,
            topics,
        })
    }

    /// Seed four categories and four docs in the first category.
    pub fn seed_knowledge(
        store: &dyn KnowledgeStore,
    ) -> Result<(Vec<Category>, Vec<Doc>), DeskError> {
        let mut categories = Vec::new();
        for name in ["Getting Started", "Accounts", "Billing", "Troubleshooting"] {
            categories.push(store.create_category(name)?);
        }
        let mut docs = Vec::new();
        for title in ["Installing", "Signing in", "Resetting a password", "Contacting us"] {
            docs.push(store.create_doc(NewDoc {
                category_id: categories[0].id,
                title: title.to_string(),
                body: format!("How to go about {}.", title.to_lowercase()),
            })?);
        }
        Ok((categories, docs))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::desk::{SqliteDeskStore, TicketStatus, TopicFilter};
        use crate::knowledge::SqliteKnowledgeStore;

        #[test]
        fn test_seed_desk_shape() {
            let store = SqliteDeskStore::in_memory().unwrap();
            let seed = seed_desk(&store).unwrap();

            assert_eq!(seed.topics.len(), 7);
            let statuses: Vec<TicketStatus> =
                seed.topics.iter().map(|t| t.current_status).collect();
            assert_eq!(
                statuses,
                vec![
                    TicketStatus::Pending,
                    TicketStatus::Open,
                    TicketStatus::Closed,
                    TicketStatus::Spam,
                    TicketStatus::Pending,
                    TicketStatus::Open,
                    TicketStatus::Open,
                ]
            );
            assert!(!seed.topics[5].viewed);
            assert_eq!(seed.topics[2].assigned_user_id, Some(seed.scott_green.id));
            assert_eq!(
                store
                    .count_topics(&TopicFilter::new().with_user(seed.scott_smith.id))
                    .unwrap(),
                6
            );
        }

        #[test]
        fn test_seed_knowledge_shape() {
            let store = SqliteKnowledgeStore::in_memory().unwrap();
            let (categories, docs) = seed_knowledge(&store).unwrap();
            assert_eq!(categories.len(), 4);
            assert_eq!(docs.len(), 4);
            assert!(docs.iter().all(|d| d.category_id == categories[0].id));
        }
    }
}
