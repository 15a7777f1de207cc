//! Relationship (friendship) models.
//!
//! A single row represents the current state of the directed relationship
//! between two user identities. At most one row exists per unordered pair;
//! restarts after a terminal state replace the row rather than reusing it, so
//! the persisted direction does not always reflect who currently holds which
//! role (see the auto-accept path).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Canceled,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Blocked => "blocked",
        }
    }

    /// Terminal states can be restarted by a fresh request, which replaces
    /// the row instead of resurrecting it.
    pub fn is_restartable(self) -> bool {
        matches!(self, Self::Rejected | Self::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    pub fn is_requester(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id
    }

    pub fn is_receiver(&self, user_id: Uuid) -> bool {
        self.receiver_id == user_id
    }
}

/// The relationship-status view returned to a caller, including which side of
/// the row the caller occupies. `self` and `none` are virtual states with no
/// backing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_requester: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_receiver: Option<bool>,
}

/// An incoming pending request, carrying enough of the requester's profile
/// to render an inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: Uuid,
    pub requester: super::UserSummary,
    pub created_at: DateTime<Utc>,
}

impl RelationshipView {
    pub fn own_profile() -> Self {
        Self {
            status: "self",
            id: None,
            is_requester: None,
            is_receiver: None,
        }
    }

    pub fn none() -> Self {
        Self {
            status: "none",
            id: None,
            is_requester: None,
            is_receiver: None,
        }
    }

    pub fn of(friendship: &Friendship, actor: Uuid) -> Self {
        Self {
            status: friendship.status.as_str(),
            id: Some(friendship.id),
            is_requester: friendship.is_requester(actor).then_some(true),
            is_receiver: friendship.is_receiver(actor).then_some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending_row(requester: Uuid, receiver: Uuid) -> Friendship {
        let now = Utc::now();
        Friendship {
            id: Uuid::from_u128(0xF00D),
            requester_id: requester,
            receiver_id: receiver,
            status: FriendshipStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn view_reports_each_side_of_a_pending_row() {
        let alice = Uuid::from_u128(0xA);
        let bob = Uuid::from_u128(0xB);
        let row = pending_row(alice, bob);

        let view = RelationshipView::of(&row, alice);
        assert_eq!(view.status, "pending");
        assert_eq!(view.id, Some(row.id));
        assert_eq!(view.is_requester, Some(true));
        assert_eq!(view.is_receiver, None);

        let view = RelationshipView::of(&row, bob);
        assert_eq!(view.status, "pending");
        assert_eq!(view.is_requester, None);
        assert_eq!(view.is_receiver, Some(true));
    }

    #[test]
    fn serialized_view_omits_the_absent_role() {
        let alice = Uuid::from_u128(0xA);
        let bob = Uuid::from_u128(0xB);
        let value =
            serde_json::to_value(RelationshipView::of(&pending_row(alice, bob), alice)).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["isRequester"], true);
        assert!(value.get("isReceiver").is_none());
    }

    #[test]
    fn virtual_states_carry_no_row() {
        let own = RelationshipView::own_profile();
        assert_eq!(own.status, "self");
        assert_eq!(own.id, None);

        let none = RelationshipView::none();
        assert_eq!(none.status, "none");
        assert_eq!(none.id, None);
        assert_eq!(none.is_requester, None);
    }
}
