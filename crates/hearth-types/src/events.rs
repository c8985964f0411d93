use serde::{Deserialize, Serialize};

use crate::models::{Approval, Message, Rule};

/// The three persisted collections a gateway client can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Rules,
    Messages,
    Approvals,
}

/// Events sent over the WebSocket gateway. Payloads are change deltas;
/// clients treat them as refetch triggers rather than a replicated log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { name: String, admin: bool },

    /// A rule was added to the board
    RuleCreated { rule: Rule },

    /// A rule's title, content or order changed
    RuleUpdated { rule: Rule },

    /// A rule was removed
    RuleDeleted { id: String },

    /// A housemate sent the administrator a message
    MessageCreated { message: Message },

    /// A single message was marked read
    MessageRead { id: String },

    /// The whole inbox was marked read
    AllMessagesRead { count: u64 },

    /// A user accepted the current rules
    ApprovalRecorded { approval: Approval },

    /// Global reset: all sessions are now invalid
    DataReset { generation: i64 },
}

impl GatewayEvent {
    /// Returns the collection this event is scoped to. Events that return
    /// `None` are global and delivered to every connected client.
    pub fn collection(&self) -> Option<Collection> {
        match self {
            Self::RuleCreated { .. } | Self::RuleUpdated { .. } | Self::RuleDeleted { .. } => {
                Some(Collection::Rules)
            }
            Self::MessageCreated { .. }
            | Self::MessageRead { .. }
            | Self::AllMessagesRead { .. } => Some(Collection::Messages),
            Self::ApprovalRecorded { .. } => Some(Collection::Approvals),
            // Ready and DataReset are global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Choose which collections to receive change events for.
    /// Replaces the previous subscription set.
    Subscribe { collections: Vec<Collection> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_global() {
        assert_eq!(GatewayEvent::DataReset { generation: 2 }.collection(), None);
    }

    #[test]
    fn rule_events_are_scoped_to_rules() {
        let event = GatewayEvent::RuleDeleted { id: "r1".into() };
        assert_eq!(event.collection(), Some(Collection::Rules));
    }
}
