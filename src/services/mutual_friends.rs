use std::collections::BTreeSet;
use std::sync::Arc;

use super::friendships::FriendshipGraph;
use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{User, UserId},
};

/// Ids present in both friend sets, ascending
pub fn intersect_friend_ids(a: &BTreeSet<UserId>, b: &BTreeSet<UserId>) -> Vec<UserId> {
    a.intersection(b).copied().collect()
}

/// Resolves the friends two users have in common
#[derive(Clone)]
pub struct MutualFriendResolver {
    graph: FriendshipGraph,
    users: Arc<dyn UserStore>,
}

impl MutualFriendResolver {
    pub fn new(graph: FriendshipGraph, users: Arc<dyn UserStore>) -> Self {
        Self { graph, users }
    }

    /// Friends of both `a` and `b`, ascending by id
    ///
    /// Both users are checked before any friend set is read.
    pub async fn mutual_friends(&self, a: UserId, b: UserId) -> AppResult<Vec<User>> {
        for id in [a, b] {
            if !self.users.exists(id).await? {
                return Err(AppError::UserNotFound(id));
            }
        }

        let friends_of_a = self.graph.friend_ids_of(a).await?;
        let friends_of_b = self.graph.friend_ids_of(b).await?;
        let common = intersect_friend_ids(&friends_of_a, &friends_of_b);

        tracing::debug!(user_id = %a, other_id = %b, common = common.len(), "Resolved mutual friends");

        self.users.by_ids(&common).await
    }
}
