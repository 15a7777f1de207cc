//! Relationship state machine.
//!
//! Every mutation is decided by a pure planner over the current pair row and
//! then applied inside a single transaction that holds a row lock on that
//! pair. Two requests racing on the same pair therefore serialize: the second
//! one re-reads the row the first one wrote (or, for concurrent first
//! requests, trips the unordered-pair unique index and reports a conflict).

use std::sync::Arc;

use courtside_query::pagination::{Page, PageParams};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{FriendshipRepository, UserDirectory};
use crate::models::{FriendRequestView, Friendship, FriendshipStatus, RelationshipView, UserSummary};
use crate::{Error, Result};

/// The write a planner decided on. `None`-plan cases surface as errors
/// instead, so applying a plan always touches the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Insert a fresh row.
    Create {
        requester_id: Uuid,
        receiver_id: Uuid,
        status: FriendshipStatus,
    },
    /// Move an existing row to a new status.
    SetStatus { id: Uuid, status: FriendshipStatus },
    /// Delete a terminal row and insert a fresh one in its place. Restarts
    /// deliberately reset `created_at` and the stored direction.
    Replace {
        delete_id: Uuid,
        requester_id: Uuid,
        receiver_id: Uuid,
        status: FriendshipStatus,
    },
    /// Rewrite an existing row as a block held by `blocker_id`.
    Block {
        id: Uuid,
        blocker_id: Uuid,
        blocked_id: Uuid,
    },
    /// Remove the row entirely.
    Delete { id: Uuid },
}

/// Decide what sending a friend request does, given the current pair row.
///
/// A pending request in the opposite direction is auto-accepted rather than
/// duplicated. The row keeps its stored direction in that case; role checks
/// on later operations go through the row, not through who "asked first".
pub fn plan_send_request(
    actor: Uuid,
    receiver: Uuid,
    existing: Option<&Friendship>,
) -> Result<Plan> {
    if actor == receiver {
        return Err(Error::invalid_operation(
            "Cannot send a friend request to yourself",
        ));
    }

    let Some(existing) = existing else {
        return Ok(Plan::Create {
            requester_id: actor,
            receiver_id: receiver,
            status: FriendshipStatus::Pending,
        });
    };

    // A settled pair restarts with a fresh row, not a resurrection.
    if existing.status.is_restartable() {
        return Ok(Plan::Replace {
            delete_id: existing.id,
            requester_id: actor,
            receiver_id: receiver,
            status: FriendshipStatus::Pending,
        });
    }

    match existing.status {
        FriendshipStatus::Accepted => Err(Error::conflict("Already friends with this user")),
        FriendshipStatus::Blocked => {
            Err(Error::conflict("Cannot send a friend request to this user"))
        }
        _ => {
            // Pending. A duplicate from the same side conflicts; the other
            // side asking back auto-accepts.
            if existing.is_requester(actor) {
                Err(Error::conflict("Friend request already sent"))
            } else {
                Ok(Plan::SetStatus {
                    id: existing.id,
                    status: FriendshipStatus::Accepted,
                })
            }
        }
    }
}

/// Accepting is reserved for the receiver of a pending request.
pub fn plan_accept(actor: Uuid, existing: Option<&Friendship>) -> Result<Plan> {
    respond_to_request(actor, existing, FriendshipStatus::Accepted)
}

/// Rejecting is reserved for the receiver of a pending request.
pub fn plan_reject(actor: Uuid, existing: Option<&Friendship>) -> Result<Plan> {
    respond_to_request(actor, existing, FriendshipStatus::Rejected)
}

fn respond_to_request(
    actor: Uuid,
    existing: Option<&Friendship>,
    status: FriendshipStatus,
) -> Result<Plan> {
    let existing = existing.ok_or_else(|| Error::not_found("Friend request not found"))?;
    if existing.status != FriendshipStatus::Pending {
        return Err(Error::invalid_operation("Friend request is not pending"));
    }
    if !existing.is_receiver(actor) {
        return Err(Error::invalid_operation(
            "Only the receiver can respond to a friend request",
        ));
    }
    Ok(Plan::SetStatus {
        id: existing.id,
        status,
    })
}

/// Canceling is reserved for the sender of a pending request.
pub fn plan_cancel(actor: Uuid, existing: Option<&Friendship>) -> Result<Plan> {
    let existing = existing.ok_or_else(|| Error::not_found("Friend request not found"))?;
    if existing.status != FriendshipStatus::Pending {
        return Err(Error::invalid_operation("Friend request is not pending"));
    }
    if !existing.is_requester(actor) {
        return Err(Error::invalid_operation(
            "Only the sender can cancel a friend request",
        ));
    }
    Ok(Plan::SetStatus {
        id: existing.id,
        status: FriendshipStatus::Canceled,
    })
}

/// Unfriending deletes the accepted row so a fresh request can start over.
pub fn plan_remove_friend(existing: Option<&Friendship>) -> Result<Plan> {
    let existing = existing.ok_or_else(|| Error::not_found("Friendship not found"))?;
    if existing.status != FriendshipStatus::Accepted {
        return Err(Error::invalid_operation("Not friends with this user"));
    }
    Ok(Plan::Delete { id: existing.id })
}

/// Blocking overrides whatever relationship exists. The blocker always ends
/// up as the row's requester so unblock stays a role check.
pub fn plan_block(actor: Uuid, target: Uuid, existing: Option<&Friendship>) -> Result<Plan> {
    if actor == target {
        return Err(Error::invalid_operation("Cannot block yourself"));
    }

    match existing {
        None => Ok(Plan::Create {
            requester_id: actor,
            receiver_id: target,
            status: FriendshipStatus::Blocked,
        }),
        Some(existing) => Ok(Plan::Block {
            id: existing.id,
            blocker_id: actor,
            blocked_id: target,
        }),
    }
}

/// Only the user who placed a block can lift it. Lifting deletes the row;
/// the pair returns to having no relationship.
pub fn plan_unblock(actor: Uuid, existing: Option<&Friendship>) -> Result<Plan> {
    let existing = existing.ok_or_else(|| Error::not_found("Block not found"))?;
    if existing.status != FriendshipStatus::Blocked {
        return Err(Error::invalid_operation("This user is not blocked"));
    }
    if !existing.is_requester(actor) {
        return Err(Error::invalid_operation("Only the blocker can unblock"));
    }
    Ok(Plan::Delete { id: existing.id })
}

pub struct FriendshipService {
    friendships: FriendshipRepository,
    users: Arc<dyn UserDirectory>,
}

impl FriendshipService {
    pub fn new(friendships: FriendshipRepository, users: Arc<dyn UserDirectory>) -> Self {
        Self { friendships, users }
    }

    fn pool(&self) -> &PgPool {
        self.friendships.pool()
    }

    async fn require_user(&self, id: Uuid) -> Result<()> {
        self.users
            .find_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Apply a plan on an open transaction connection.
    async fn apply(
        &self,
        conn: &mut sqlx::PgConnection,
        plan: Plan,
    ) -> Result<Option<Friendship>> {
        match plan {
            Plan::Create {
                requester_id,
                receiver_id,
                status,
            } => {
                let row = self
                    .friendships
                    .insert(conn, requester_id, receiver_id, status)
                    .await
                    .map_err(map_pair_conflict)?;
                Ok(Some(row))
            }
            Plan::SetStatus { id, status } => {
                Ok(Some(self.friendships.set_status(conn, id, status).await?))
            }
            Plan::Replace {
                delete_id,
                requester_id,
                receiver_id,
                status,
            } => {
                self.friendships.delete(conn, delete_id).await?;
                let row = self
                    .friendships
                    .insert(conn, requester_id, receiver_id, status)
                    .await
                    .map_err(map_pair_conflict)?;
                Ok(Some(row))
            }
            Plan::Block {
                id,
                blocker_id,
                blocked_id,
            } => Ok(Some(
                self.friendships
                    .force_block(conn, id, blocker_id, blocked_id)
                    .await?,
            )),
            Plan::Delete { id } => {
                self.friendships.delete(conn, id).await?;
                Ok(None)
            }
        }
    }

    pub async fn send_request(&self, actor: Uuid, receiver: Uuid) -> Result<Friendship> {
        if actor == receiver {
            return Err(Error::invalid_operation(
                "Cannot send a friend request to yourself",
            ));
        }
        self.require_user(receiver).await?;

        let mut tx = self.pool().begin().await?;
        let existing = self
            .friendships
            .find_pair_for_update(&mut *tx, actor, receiver)
            .await?;
        let plan = plan_send_request(actor, receiver, existing.as_ref())?;
        let row = self.apply(&mut *tx, plan).await?;
        tx.commit().await?;

        let row = row.ok_or_else(|| Error::Internal("send request produced no row".to_string()))?;
        tracing::info!(
            friendship_id = %row.id,
            status = row.status.as_str(),
            "friend request processed"
        );
        Ok(row)
    }

    pub async fn accept(&self, actor: Uuid, request_id: Uuid) -> Result<Friendship> {
        self.respond(actor, request_id, plan_accept).await
    }

    pub async fn reject(&self, actor: Uuid, request_id: Uuid) -> Result<Friendship> {
        self.respond(actor, request_id, plan_reject).await
    }

    pub async fn cancel(&self, actor: Uuid, request_id: Uuid) -> Result<Friendship> {
        self.respond(actor, request_id, plan_cancel).await
    }

    async fn respond(
        &self,
        actor: Uuid,
        request_id: Uuid,
        plan_fn: fn(Uuid, Option<&Friendship>) -> Result<Plan>,
    ) -> Result<Friendship> {
        let mut tx = self.pool().begin().await?;
        let existing = self
            .friendships
            .find_by_id_for_update(&mut *tx, request_id)
            .await?;
        let plan = plan_fn(actor, existing.as_ref())?;
        let row = self.apply(&mut *tx, plan).await?;
        tx.commit().await?;
        row.ok_or_else(|| Error::Internal("response produced no row".to_string()))
    }

    pub async fn remove_friend(&self, actor: Uuid, other: Uuid) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        let existing = self
            .friendships
            .find_pair_for_update(&mut *tx, actor, other)
            .await?;
        let plan = plan_remove_friend(existing.as_ref())?;
        self.apply(&mut *tx, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn block(&self, actor: Uuid, target: Uuid) -> Result<Friendship> {
        if actor == target {
            return Err(Error::invalid_operation("Cannot block yourself"));
        }
        self.require_user(target).await?;

        let mut tx = self.pool().begin().await?;
        let existing = self
            .friendships
            .find_pair_for_update(&mut *tx, actor, target)
            .await?;
        let plan = plan_block(actor, target, existing.as_ref())?;
        let row = self.apply(&mut *tx, plan).await?;
        tx.commit().await?;
        row.ok_or_else(|| Error::Internal("block produced no row".to_string()))
    }

    pub async fn unblock(&self, actor: Uuid, target: Uuid) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        let existing = self
            .friendships
            .find_pair_for_update(&mut *tx, actor, target)
            .await?;
        let plan = plan_unblock(actor, existing.as_ref())?;
        self.apply(&mut *tx, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The relationship between the caller and another user, from the
    /// caller's side. Read-only, so no lock is taken.
    pub async fn relationship_status(&self, actor: Uuid, other: Uuid) -> Result<RelationshipView> {
        if actor == other {
            return Ok(RelationshipView::own_profile());
        }
        let existing = self.friendships.find_pair(actor, other).await?;
        Ok(match existing {
            Some(friendship) => RelationshipView::of(&friendship, actor),
            None => RelationshipView::none(),
        })
    }

    pub async fn list_friends(&self, actor: Uuid, page: PageParams) -> Result<Page<UserSummary>> {
        let (items, total) = self.friendships.list_friends(actor, page.window()).await?;
        Ok(page.paginate(items, total))
    }

    pub async fn list_incoming(
        &self,
        actor: Uuid,
        page: PageParams,
    ) -> Result<Page<FriendRequestView>> {
        let (items, total) = self.friendships.list_incoming(actor, page.window()).await?;
        Ok(page.paginate(items, total))
    }
}

/// A unique-index violation on insert means another transaction created the
/// pair row first.
fn map_pair_conflict(err: Error) -> Error {
    if let Error::Database(db_err) = &err {
        if let Some(code) = db_err.as_database_error().and_then(|e| e.code()) {
            if code == "23505" {
                return Error::conflict("A relationship with this user already exists");
            }
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_a() -> Uuid {
        Uuid::from_u128(0xA)
    }

    fn user_b() -> Uuid {
        Uuid::from_u128(0xB)
    }

    fn user_c() -> Uuid {
        Uuid::from_u128(0xC)
    }

    fn row(requester: Uuid, receiver: Uuid, status: FriendshipStatus) -> Friendship {
        let now = Utc::now();
        Friendship {
            id: Uuid::from_u128(0xF00D),
            requester_id: requester,
            receiver_id: receiver,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_request_creates_a_pending_row() {
        let plan = plan_send_request(user_a(), user_b(), None).unwrap();
        assert_eq!(
            plan,
            Plan::Create {
                requester_id: user_a(),
                receiver_id: user_b(),
                status: FriendshipStatus::Pending,
            }
        );
    }

    #[test]
    fn self_request_is_rejected() {
        let err = plan_send_request(user_a(), user_a(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn duplicate_request_conflicts() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Pending);
        let err = plan_send_request(user_a(), user_b(), Some(&existing)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn crossing_request_auto_accepts() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Pending);
        let plan = plan_send_request(user_b(), user_a(), Some(&existing)).unwrap();
        assert_eq!(
            plan,
            Plan::SetStatus {
                id: existing.id,
                status: FriendshipStatus::Accepted,
            }
        );
    }

    #[test]
    fn request_to_an_existing_friend_conflicts() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Accepted);
        let err = plan_send_request(user_a(), user_b(), Some(&existing)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let err = plan_send_request(user_b(), user_a(), Some(&existing)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn request_against_a_block_conflicts_for_both_sides() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Blocked);
        assert!(plan_send_request(user_a(), user_b(), Some(&existing)).is_err());
        assert!(plan_send_request(user_b(), user_a(), Some(&existing)).is_err());
    }

    #[test]
    fn rejected_pair_restarts_with_a_fresh_row() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Rejected);
        // The previous receiver asks this time; the new row flips direction.
        let plan = plan_send_request(user_b(), user_a(), Some(&existing)).unwrap();
        assert_eq!(
            plan,
            Plan::Replace {
                delete_id: existing.id,
                requester_id: user_b(),
                receiver_id: user_a(),
                status: FriendshipStatus::Pending,
            }
        );
    }

    #[test]
    fn canceled_pair_restarts_too() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Canceled);
        let plan = plan_send_request(user_a(), user_b(), Some(&existing)).unwrap();
        assert!(matches!(plan, Plan::Replace { .. }));
    }

    #[test]
    fn only_the_receiver_accepts() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Pending);
        let plan = plan_accept(user_b(), Some(&existing)).unwrap();
        assert_eq!(
            plan,
            Plan::SetStatus {
                id: existing.id,
                status: FriendshipStatus::Accepted,
            }
        );
        assert!(plan_accept(user_a(), Some(&existing)).is_err());
        assert!(plan_accept(user_c(), Some(&existing)).is_err());
    }

    #[test]
    fn only_the_receiver_rejects() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Pending);
        let plan = plan_reject(user_b(), Some(&existing)).unwrap();
        assert_eq!(
            plan,
            Plan::SetStatus {
                id: existing.id,
                status: FriendshipStatus::Rejected,
            }
        );
        assert!(plan_reject(user_a(), Some(&existing)).is_err());
    }

    #[test]
    fn only_the_sender_cancels() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Pending);
        let plan = plan_cancel(user_a(), Some(&existing)).unwrap();
        assert_eq!(
            plan,
            Plan::SetStatus {
                id: existing.id,
                status: FriendshipStatus::Canceled,
            }
        );
        assert!(plan_cancel(user_b(), Some(&existing)).is_err());
    }

    #[test]
    fn responding_to_a_settled_request_is_invalid() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Accepted);
        assert!(plan_accept(user_b(), Some(&existing)).is_err());
        assert!(plan_cancel(user_a(), Some(&existing)).is_err());
    }

    #[test]
    fn responding_to_a_missing_request_is_not_found() {
        assert!(matches!(
            plan_accept(user_b(), None).unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            plan_cancel(user_a(), None).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn unfriending_deletes_only_accepted_rows() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Accepted);
        assert_eq!(
            plan_remove_friend(Some(&existing)).unwrap(),
            Plan::Delete { id: existing.id }
        );

        let pending = row(user_a(), user_b(), FriendshipStatus::Pending);
        assert!(plan_remove_friend(Some(&pending)).is_err());
        assert!(matches!(
            plan_remove_friend(None).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn block_overrides_any_existing_state() {
        for status in [
            FriendshipStatus::Pending,
            FriendshipStatus::Accepted,
            FriendshipStatus::Rejected,
            FriendshipStatus::Canceled,
        ] {
            let existing = row(user_a(), user_b(), status);
            // The receiver blocks; they become the row's requester.
            let plan = plan_block(user_b(), user_a(), Some(&existing)).unwrap();
            assert_eq!(
                plan,
                Plan::Block {
                    id: existing.id,
                    blocker_id: user_b(),
                    blocked_id: user_a(),
                }
            );
        }
    }

    #[test]
    fn block_without_prior_relationship_creates_a_blocked_row() {
        let plan = plan_block(user_a(), user_b(), None).unwrap();
        assert_eq!(
            plan,
            Plan::Create {
                requester_id: user_a(),
                receiver_id: user_b(),
                status: FriendshipStatus::Blocked,
            }
        );
    }

    #[test]
    fn self_block_is_invalid() {
        assert!(plan_block(user_a(), user_a(), None).is_err());
    }

    #[test]
    fn only_the_blocker_unblocks() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Blocked);
        assert_eq!(
            plan_unblock(user_a(), Some(&existing)).unwrap(),
            Plan::Delete { id: existing.id }
        );
        assert!(plan_unblock(user_b(), Some(&existing)).is_err());
    }

    #[test]
    fn unblocking_a_non_block_is_invalid() {
        let existing = row(user_a(), user_b(), FriendshipStatus::Accepted);
        assert!(plan_unblock(user_a(), Some(&existing)).is_err());
        assert!(matches!(
            plan_unblock(user_a(), None).unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
