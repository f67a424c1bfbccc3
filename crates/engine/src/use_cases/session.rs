//! Joining: turning an identity token into an [`Actor`].

use std::sync::Arc;

use tidewatch_domain::{ConnectionId, RoomId, UserIdentity};

use super::Actor;
use crate::infrastructure::ports::{
    Broadcaster, ClockPort, IdentityError, IdentityPort, RepoError, UserRepo, VerifiedIdentity,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Identity rejected: {0}")]
    Identity(#[from] IdentityError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct SessionService {
    identity: Arc<dyn IdentityPort>,
    users: Arc<dyn UserRepo>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn ClockPort>,
}

impl SessionService {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        users: Arc<dyn UserRepo>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            identity,
            users,
            broadcaster,
            clock,
        }
    }

    /// Verify a bearer token without touching storage.
    pub fn authenticate(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.identity.verify(token)
    }

    /// Resolve the connection's identity, record the user and subscribe the
    /// connection to the lobby.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        token: &str,
    ) -> Result<Actor, SessionError> {
        let verified = self.identity.verify(token)?;
        let stored = self
            .users
            .ensure(&UserIdentity::new(
                verified.user_id,
                verified.display_name,
                verified.role,
                self.clock.now(),
            ))
            .await?;

        self.broadcaster.subscribe(connection_id, &RoomId::lobby());

        tracing::info!(
            connection_id = %connection_id,
            user_id = %stored.id(),
            role = stored.role().as_str(),
            "Connection joined"
        );
        Ok(Actor {
            connection_id,
            user_id: stored.id(),
            display_name: stored.display_name().clone(),
            role: stored.role(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockBroadcaster, MockIdentityPort, MockUserRepo};
    use chrono::Utc;
    use tidewatch_domain::{DisplayName, Role, UserId};

    #[tokio::test]
    async fn join_records_the_user_and_enters_the_lobby() {
        let user_id = UserId::new();
        let connection_id = ConnectionId::new();

        let mut identity = MockIdentityPort::new();
        identity.expect_verify().returning(move |_| {
            Ok(VerifiedIdentity {
                user_id,
                display_name: DisplayName::new("Mina").unwrap(),
                role: Role::Admin,
            })
        });
        let mut users = MockUserRepo::new();
        users
            .expect_ensure()
            .withf(move |u| u.id() == user_id)
            .times(1)
            .returning(|u| Ok(u.clone()));
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_subscribe()
            .withf(move |c, room| *c == connection_id && room.as_str() == RoomId::LOBBY)
            .times(1)
            .returning(|_, _| true);

        let service = SessionService::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(broadcaster),
            Arc::new(FixedClock(Utc::now())),
        );
        let actor = service.join(connection_id, "token").await.unwrap();
        assert_eq!(actor.user_id, user_id);
        assert_eq!(actor.name(), "Mina");
        assert!(actor.role.is_admin());
    }

    #[tokio::test]
    async fn bad_token_never_reaches_storage() {
        let mut identity = MockIdentityPort::new();
        identity
            .expect_verify()
            .returning(|_| Err(IdentityError::Expired));
        let mut users = MockUserRepo::new();
        users.expect_ensure().never();

        let service = SessionService::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(MockBroadcaster::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        let err = service.join(ConnectionId::new(), "stale").await.unwrap_err();
        assert!(matches!(err, SessionError::Identity(IdentityError::Expired)));
    }
}
