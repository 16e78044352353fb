use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    db::{FriendStore, UserStore},
    error::{AppError, AppResult},
    models::{FriendPair, Friendship, User, UserId},
};

/// Friend requests and confirmations between users
///
/// Each unordered pair of users has at most one row. The row remembers who
/// asked first and flips to confirmed only when the other side accepts.
#[derive(Clone)]
pub struct FriendshipGraph {
    friends: Arc<dyn FriendStore>,
    users: Arc<dyn UserStore>,
}

impl FriendshipGraph {
    pub fn new(friends: Arc<dyn FriendStore>, users: Arc<dyn UserStore>) -> Self {
        Self { friends, users }
    }

    async fn ensure_user(&self, id: UserId) -> AppResult<()> {
        if self.users.exists(id).await? {
            Ok(())
        } else {
            Err(AppError::UserNotFound(id))
        }
    }

    /// Sends a friend request from `requester` to `target`
    ///
    /// Fails with `AlreadyFriendsOrRequested` when the pair already has a row,
    /// whichever side created it.
    pub async fn request(&self, requester: UserId, target: UserId) -> AppResult<Friendship> {
        let edge = Friendship::request(requester, target)?;
        self.ensure_user(requester).await?;
        self.ensure_user(target).await?;

        if !self.friends.insert(edge).await? {
            return Err(AppError::AlreadyFriendsOrRequested(edge.pair));
        }

        tracing::info!(requester = %requester, target = %target, "Friend request sent");

        Ok(edge)
    }

    /// Accepts the pending request that `requester` sent to `responder`
    ///
    /// Confirming an already confirmed request is a no-op.
    pub async fn confirm(&self, responder: UserId, requester: UserId) -> AppResult<Friendship> {
        let pair = FriendPair::new(responder, requester)?;
        let not_requested = AppError::NotRequested {
            requester,
            responder,
        };

        let edge = match self.friends.find(pair).await? {
            Some(edge) if edge.requester == requester => edge,
            _ => return Err(not_requested),
        };

        if edge.confirmed {
            tracing::debug!(requester = %requester, responder = %responder, "Friendship already confirmed");
            return Ok(edge);
        }

        // The row can be replaced between the read and the update
        if !self.friends.mark_confirmed(pair, requester).await? {
            return Err(not_requested);
        }

        tracing::info!(requester = %requester, responder = %responder, "Friend request confirmed");

        Ok(Friendship {
            confirmed: true,
            ..edge
        })
    }

    /// Removes the pair's row, pending or confirmed, regardless of who asked
    pub async fn cancel(&self, a: UserId, b: UserId) -> AppResult<()> {
        let pair = FriendPair::new(a, b)?;

        if !self.friends.delete(pair).await? {
            return Err(AppError::FriendshipNotFound(pair));
        }

        tracing::info!(user_id = %a, other_id = %b, "Friendship removed");

        Ok(())
    }

    pub async fn exists(&self, a: UserId, b: UserId) -> AppResult<bool> {
        let pair = FriendPair::new(a, b)?;
        Ok(self.friends.find(pair).await?.is_some())
    }

    pub async fn is_confirmed(&self, a: UserId, b: UserId) -> AppResult<bool> {
        let pair = FriendPair::new(a, b)?;
        Ok(self
            .friends
            .find(pair)
            .await?
            .map(|edge| edge.confirmed)
            .unwrap_or(false))
    }

    /// Every user sharing a row with `user_id`, pending requests included
    pub async fn friend_ids_of(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>> {
        let edges = self.friends.edges_for(user_id).await?;
        Ok(edges
            .iter()
            .filter_map(|edge| edge.pair.other(user_id))
            .collect())
    }

    /// Friend list resolved to user records, ascending by id
    pub async fn friends_of(&self, user_id: UserId) -> AppResult<Vec<User>> {
        self.ensure_user(user_id).await?;

        let ids: Vec<UserId> = self.friend_ids_of(user_id).await?.into_iter().collect();
        tracing::debug!(user_id = %user_id, friend_count = ids.len(), "Listing friends");

        self.users.by_ids(&ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockFriendStore, MockUserStore};
    use crate::db::MemoryStore;
    use crate::services::test_support::{seeded_store, TestStore};
    use tokio_test::assert_ok;

    fn graph(store: &TestStore) -> FriendshipGraph {
        FriendshipGraph::new(store.friends(), store.users())
    }

    #[tokio::test]
    async fn test_request_creates_pending_edge() {
        let store = seeded_store(2, 0).await;
        let graph = graph(&store);

        let edge = graph.request(UserId(1), UserId(2)).await.unwrap();
        assert_eq!(edge.requester, UserId(1));
        assert!(!edge.confirmed);

        assert!(graph.exists(UserId(1), UserId(2)).await.unwrap());
        assert!(graph.exists(UserId(2), UserId(1)).await.unwrap());
        assert!(!graph.is_confirmed(UserId(2), UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_reverse_request_conflicts() {
        let store = seeded_store(2, 0).await;
        let graph = graph(&store);

        graph.request(UserId(1), UserId(2)).await.unwrap();

        let result = graph.request(UserId(2), UserId(1)).await;
        assert!(matches!(result, Err(AppError::AlreadyFriendsOrRequested(_))));

        let result = graph.request(UserId(1), UserId(2)).await;
        assert!(matches!(result, Err(AppError::AlreadyFriendsOrRequested(_))));

        assert_eq!(store.0.inner.read().await.friendships.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_requires_other_sides_request() {
        let store = seeded_store(3, 0).await;
        let graph = graph(&store);

        let result = graph.confirm(UserId(2), UserId(1)).await;
        assert!(matches!(result, Err(AppError::NotRequested { .. })));

        graph.request(UserId(1), UserId(2)).await.unwrap();

        // the requester cannot accept their own request
        let result = graph.confirm(UserId(1), UserId(2)).await;
        assert!(matches!(
            result,
            Err(AppError::NotRequested {
                requester: UserId(2),
                responder: UserId(1)
            })
        ));

        let edge = graph.confirm(UserId(2), UserId(1)).await.unwrap();
        assert!(edge.confirmed);
        assert!(graph.is_confirmed(UserId(1), UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_twice_is_noop() {
        let store = seeded_store(2, 0).await;
        let graph = graph(&store);

        graph.request(UserId(1), UserId(2)).await.unwrap();
        assert_ok!(graph.confirm(UserId(2), UserId(1)).await);
        let edge = graph.confirm(UserId(2), UserId(1)).await.unwrap();
        assert!(edge.confirmed);
    }

    #[tokio::test]
    async fn test_cancel_then_reverse_request_succeeds() {
        let store = seeded_store(2, 0).await;
        let graph = graph(&store);

        graph.request(UserId(1), UserId(2)).await.unwrap();
        graph.cancel(UserId(1), UserId(2)).await.unwrap();
        assert!(!graph.exists(UserId(1), UserId(2)).await.unwrap());

        let edge = graph.request(UserId(2), UserId(1)).await.unwrap();
        assert_eq!(edge.requester, UserId(2));
    }

    #[tokio::test]
    async fn test_cancel_confirmed_from_either_side() {
        let store = seeded_store(2, 0).await;
        let graph = graph(&store);

        graph.request(UserId(1), UserId(2)).await.unwrap();
        graph.confirm(UserId(2), UserId(1)).await.unwrap();
        graph.cancel(UserId(2), UserId(1)).await.unwrap();

        let result = graph.cancel(UserId(1), UserId(2)).await;
        assert!(matches!(result, Err(AppError::FriendshipNotFound(_))));
    }

    #[tokio::test]
    async fn test_friend_ids_include_pending_requests() {
        let store = seeded_store(4, 0).await;
        let graph = graph(&store);

        graph.request(UserId(1), UserId(2)).await.unwrap();
        graph.request(UserId(3), UserId(1)).await.unwrap();
        graph.confirm(UserId(1), UserId(3)).await.unwrap();
        graph.request(UserId(2), UserId(4)).await.unwrap();

        assert_eq!(
            graph.friend_ids_of(UserId(1)).await.unwrap(),
            BTreeSet::from([UserId(2), UserId(3)])
        );
        assert_eq!(
            graph.friend_ids_of(UserId(2)).await.unwrap(),
            BTreeSet::from([UserId(1), UserId(4)])
        );

        let friends = graph.friends_of(UserId(1)).await.unwrap();
        let ids: Vec<UserId> = friends.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UserId(2), UserId(3)]);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let store = seeded_store(1, 0).await;
        let graph = graph(&store);

        let result = graph.request(UserId(1), UserId(1)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = graph.request(UserId(1), UserId(5)).await;
        assert!(matches!(result, Err(AppError::UserNotFound(UserId(5)))));

        let result = graph.friends_of(UserId(5)).await;
        assert!(matches!(result, Err(AppError::UserNotFound(UserId(5)))));
    }

    #[tokio::test]
    async fn test_confirm_loses_race_with_cancel() {
        let mut users = MockUserStore::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut friends = MockFriendStore::new();
        friends.expect_find().returning(|pair| {
            Ok(Some(Friendship {
                pair,
                requester: UserId(1),
                confirmed: false,
            }))
        });
        friends
            .expect_mark_confirmed()
            .times(1)
            .returning(|_, _| Ok(false));

        let graph = FriendshipGraph::new(Arc::new(friends), Arc::new(users));
        let result = graph.confirm(UserId(2), UserId(1)).await;
        assert!(matches!(result, Err(AppError::NotRequested { .. })));
    }

    /// Replaces the row with a reverse request right after it is read,
    /// like a cancel and a new request landing between confirm's two calls
    struct ReplacedAfterRead(MemoryStore);

    #[async_trait::async_trait]
    impl FriendStore for ReplacedAfterRead {
        async fn insert(&self, edge: Friendship) -> AppResult<bool> {
            FriendStore::insert(&self.0, edge).await
        }

        async fn find(&self, pair: FriendPair) -> AppResult<Option<Friendship>> {
            let found = FriendStore::find(&self.0, pair).await?;
            FriendStore::delete(&self.0, pair).await?;
            FriendStore::insert(&self.0, Friendship::request(UserId(2), UserId(1))?).await?;
            Ok(found)
        }

        async fn mark_confirmed(&self, pair: FriendPair, requester: UserId) -> AppResult<bool> {
            FriendStore::mark_confirmed(&self.0, pair, requester).await
        }

        async fn delete(&self, pair: FriendPair) -> AppResult<bool> {
            FriendStore::delete(&self.0, pair).await
        }

        async fn edges_for(&self, user_id: UserId) -> AppResult<Vec<Friendship>> {
            FriendStore::edges_for(&self.0, user_id).await
        }
    }

    #[tokio::test]
    async fn test_confirm_does_not_accept_replaced_reverse_request() {
        let store = seeded_store(2, 0).await;
        FriendStore::insert(&store.0, Friendship::request(UserId(1), UserId(2)).unwrap())
            .await
            .unwrap();

        let friends = Arc::new(ReplacedAfterRead(store.0.clone()));
        let graph = FriendshipGraph::new(friends, store.users());

        let result = graph.confirm(UserId(2), UserId(1)).await;
        assert!(matches!(
            result,
            Err(AppError::NotRequested {
                requester: UserId(1),
                responder: UserId(2)
            })
        ));

        let pair = FriendPair::new(UserId(1), UserId(2)).unwrap();
        let stored = FriendStore::find(&store.0, pair).await.unwrap().unwrap();
        assert_eq!(stored.requester, UserId(2));
        assert!(!stored.confirmed);
    }
}
