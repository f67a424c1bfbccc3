//! Achievement grants: automatic ones earned through play and admin grants
//! over HTTP.

use std::sync::Arc;

use tidewatch_domain::achievement::{definition, FISH_COLLECTOR, FISH_COLLECTOR_THRESHOLD};
use tidewatch_domain::{DomainError, GrantedAchievement, UserId};

use crate::infrastructure::ports::{AchievementRepo, ClockPort, RepoError, UserRepo};

#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("Unknown achievement: {0}")]
    UnknownAchievement(String),
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct AchievementService {
    repo: Arc<dyn AchievementRepo>,
    users: Arc<dyn UserRepo>,
    clock: Arc<dyn ClockPort>,
}

impl AchievementService {
    pub fn new(
        repo: Arc<dyn AchievementRepo>,
        users: Arc<dyn UserRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self { repo, users, clock }
    }

    /// Admin grant. Granting something the user already holds is a no-op
    /// that returns `false`.
    pub async fn grant(
        &self,
        granted_by: UserId,
        user_id: UserId,
        achievement_id: &str,
    ) -> Result<bool, AchievementError> {
        let definition = lookup(achievement_id)?;
        if self.users.get(user_id).await?.is_none() {
            return Err(AchievementError::UserNotFound(user_id));
        }

        let granted = self
            .repo
            .grant(&GrantedAchievement {
                user_id,
                achievement_id: definition.id.to_string(),
                granted_at: self.clock.now(),
                granted_by: Some(granted_by),
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            achievement_id = definition.id,
            granted_by = %granted_by,
            granted,
            "Achievement grant"
        );
        Ok(granted)
    }

    /// Admin revoke. Returns `false` if the user did not hold it.
    pub async fn revoke(
        &self,
        revoked_by: UserId,
        user_id: UserId,
        achievement_id: &str,
    ) -> Result<bool, AchievementError> {
        let definition = lookup(achievement_id)?;
        let revoked = self.repo.revoke(user_id, definition.id).await?;
        tracing::info!(
            user_id = %user_id,
            achievement_id = definition.id,
            revoked_by = %revoked_by,
            revoked,
            "Achievement revoke"
        );
        Ok(revoked)
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<GrantedAchievement>, RepoError> {
        self.repo.list_for_user(user_id).await
    }

    /// Grant `fish_collector` once the user holds enough fish.
    pub async fn check_fish_collector(
        &self,
        user_id: UserId,
        total_fish: u64,
    ) -> Result<bool, RepoError> {
        if total_fish < FISH_COLLECTOR_THRESHOLD {
            return Ok(false);
        }
        let granted = self
            .repo
            .grant(&GrantedAchievement {
                user_id,
                achievement_id: FISH_COLLECTOR.to_string(),
                granted_at: self.clock.now(),
                granted_by: None,
            })
            .await?;
        if granted {
            tracing::info!(user_id = %user_id, "Fish collector achievement earned");
        }
        Ok(granted)
    }
}

fn lookup(
    achievement_id: &str,
) -> Result<&'static tidewatch_domain::AchievementDefinition, AchievementError> {
    definition(achievement_id).map_err(|e| match e {
        DomainError::NotFound { .. } => {
            AchievementError::UnknownAchievement(achievement_id.to_string())
        }
        other => AchievementError::UnknownAchievement(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockAchievementRepo, MockUserRepo};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tidewatch_domain::{DisplayName, Role, UserIdentity};

    fn service(repo: MockAchievementRepo, users: MockUserRepo) -> AchievementService {
        AchievementService::new(
            Arc::new(repo),
            Arc::new(users),
            Arc::new(FixedClock(Utc::now())),
        )
    }

    fn known_user(id: UserId) -> MockUserRepo {
        let mut users = MockUserRepo::new();
        users.expect_get().with(eq(id)).returning(|id| {
            Ok(Some(UserIdentity::new(
                id,
                DisplayName::new("Mina").unwrap(),
                Role::Registered,
                Utc::now(),
            )))
        });
        users
    }

    #[tokio::test]
    async fn unknown_achievement_is_rejected_before_any_write() {
        let mut repo = MockAchievementRepo::new();
        repo.expect_grant().never();
        let service = service(repo, MockUserRepo::new());

        let err = service
            .grant(UserId::new(), UserId::new(), "dragon_slayer")
            .await
            .unwrap_err();
        assert!(matches!(err, AchievementError::UnknownAchievement(id) if id == "dragon_slayer"));
    }

    #[tokio::test]
    async fn admin_grant_records_the_granter() {
        let (admin, user) = (UserId::new(), UserId::new());
        let mut repo = MockAchievementRepo::new();
        repo.expect_grant()
            .withf(move |g| {
                g.user_id == user && g.achievement_id == "fox_gamble" && g.granted_by == Some(admin)
            })
            .times(1)
            .returning(|_| Ok(true));
        let service = service(repo, known_user(user));

        assert!(service.grant(admin, user, "fox_gamble").await.unwrap());
    }

    #[tokio::test]
    async fn grant_to_missing_user_fails() {
        let mut users = MockUserRepo::new();
        users.expect_get().returning(|_| Ok(None));
        let service = service(MockAchievementRepo::new(), users);

        let err = service
            .grant(UserId::new(), UserId::new(), "fox_location")
            .await
            .unwrap_err();
        assert!(matches!(err, AchievementError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn fish_collector_needs_the_threshold() {
        let user = UserId::new();
        let mut repo = MockAchievementRepo::new();
        repo.expect_grant()
            .withf(move |g| g.user_id == user && g.achievement_id == FISH_COLLECTOR && g.granted_by.is_none())
            .times(1)
            .returning(|_| Ok(true));
        let service = service(repo, MockUserRepo::new());

        assert!(!service
            .check_fish_collector(user, FISH_COLLECTOR_THRESHOLD - 1)
            .await
            .unwrap());
        assert!(service
            .check_fish_collector(user, FISH_COLLECTOR_THRESHOLD)
            .await
            .unwrap());
    }
}
