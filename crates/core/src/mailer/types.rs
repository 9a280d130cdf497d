use serde::Serialize;

use crate::desk::{Post, Topic, User};

/// A rendered outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Ticket the message is about, if any.
    pub topic_id: Option<i64>,
}

impl MailMessage {
    /// Notification sent to the requester when a ticket is opened for them.
    pub fn new_ticket(from: &str, requester: &User, topic: &Topic, post: &Post) -> Self {
        Self {
            from: from.to_string(),
            to: requester.email.clone(),
            subject: format!("[#{}] {}", topic.id, topic.subject),
            body: format!(
                "Hi {},\n\nA support ticket has been opened for you.\n\n{}\n",
                requester.name, post.body
            ),
            topic_id: Some(topic.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::{PostKind, TicketStatus, UserRole};
    use chrono::Utc;

    #[test]
    fn test_new_ticket_message() {
        let now = Utc::now();
        let user = User {
            id: 2,
            name: "Scott Smith".to_string(),
            email: "scott.smith@test.com".to_string(),
            role: UserRole::User,
            created_at: now,
        };
        let topic = Topic {
            id: 12,
            subject: "Printer on fire".to_string(),
            user_id: 2,
            forum_id: 1,
            current_status: TicketStatus::Pending,
            assigned_user_id: None,
            private: true,
            viewed: true,
            created_at: now,
            updated_at: now,
        };
        let post = Post {
            id: 30,
            topic_id: 12,
            user_id: 2,
            body: "It is still burning".to_string(),
            kind: PostKind::Initial,
            created_at: now,
        };

        let message = MailMessage::new_ticket("desk@example.com", &user, &topic, &post);
        assert_eq!(message.to, "scott.smith@test.com");
        assert_eq!(message.subject, "[#12] Printer on fire");
        assert!(message.body.contains("It is still burning"));
        assert_eq!(message.topic_id, Some(12));
    }
}
