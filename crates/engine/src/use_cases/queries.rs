//! Read-only queries behind the HTTP API.

use std::sync::Arc;

use tidewatch_domain::achievement::definition;
use tidewatch_domain::{ItemKind, RaidTier, UserId};
use tidewatch_shared::{
    AchievementView, ActiveSessionView, CooldownView, HoldingView, InventoryResponse,
    LeaderboardEntry, LeaderboardResponse, RaidStatusView,
};

use super::achievements::AchievementService;
use super::combat::{ranking_views, target_views, CombatSessionManager};
use super::cooldown::CooldownGate;
use crate::infrastructure::ports::{ClockPort, HoldingsRepo, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid holding kind: {0}")]
    InvalidKind(String),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct QueryService {
    holdings: Arc<dyn HoldingsRepo>,
    achievements: Arc<AchievementService>,
    cooldowns: Arc<CooldownGate>,
    combat: Arc<CombatSessionManager>,
    clock: Arc<dyn ClockPort>,
}

impl QueryService {
    pub fn new(
        holdings: Arc<dyn HoldingsRepo>,
        achievements: Arc<AchievementService>,
        cooldowns: Arc<CooldownGate>,
        combat: Arc<CombatSessionManager>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            holdings,
            achievements,
            cooldowns,
            combat,
            clock,
        }
    }

    pub async fn leaderboard(
        &self,
        kind: &str,
        limit: u32,
    ) -> Result<LeaderboardResponse, QueryError> {
        let kind = ItemKind::new(kind).map_err(|e| QueryError::InvalidKind(e.to_string()))?;
        let rows = self.holdings.leaderboard(&kind, limit).await?;
        let entries = rows
            .into_iter()
            .zip(1u32..)
            .map(|(row, rank)| LeaderboardEntry {
                rank,
                user_id: row.user_id.to_uuid(),
                display_name: row.display_name,
                count: row.count,
            })
            .collect();
        Ok(LeaderboardResponse {
            kind: kind.to_string(),
            entries,
        })
    }

    pub async fn inventory(&self, user_id: UserId) -> Result<InventoryResponse, RepoError> {
        let entries = self.holdings.list_for_user(user_id).await?;
        let total_fish = tidewatch_domain::holdings::total_fish(&entries);
        Ok(InventoryResponse {
            user_id: user_id.to_uuid(),
            holdings: entries
                .into_iter()
                .map(|e| HoldingView {
                    kind: e.kind.to_string(),
                    count: e.count,
                })
                .collect(),
            total_fish,
        })
    }

    pub async fn achievements(&self, user_id: UserId) -> Result<Vec<AchievementView>, RepoError> {
        let granted = self.achievements.list(user_id).await?;
        Ok(granted
            .into_iter()
            .filter_map(|g| {
                let def = definition(&g.achievement_id).ok()?;
                Some(AchievementView {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    granted_at: g.granted_at,
                })
            })
            .collect())
    }

    pub async fn cooldowns(&self, user_id: UserId) -> Result<Vec<CooldownView>, RepoError> {
        let now = self.clock.now();
        let records = self.cooldowns.active(user_id).await?;
        Ok(records
            .into_iter()
            .map(|r| CooldownView {
                kind: r.kind,
                remaining_ms: u64::try_from(r.remaining(now).as_millis()).unwrap_or(u64::MAX),
                ends_at: Some(r.ends_at),
            })
            .collect())
    }

    pub async fn raids(&self) -> Vec<RaidStatusView> {
        let mut raids = Vec::with_capacity(RaidTier::ALL.len());
        for tier in RaidTier::ALL {
            let room_id = tier.room_id();
            let session = self.combat.in_room(&room_id).await.map(|s| ActiveSessionView {
                session_id: s.id().to_uuid(),
                phase: s.phase().as_str().to_string(),
                targets: target_views(&s),
                health: s.health(),
                max_health: s.max_health(),
                rankings: ranking_views(&s.ranked_contributions()),
            });
            raids.push(RaidStatusView {
                tier: tier.as_str().to_string(),
                room_id: room_id.to_string(),
                boss_name: tier.boss_name().to_string(),
                session,
            });
        }
        raids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        LeaderboardRow, MockAchievementRepo, MockBroadcaster, MockCombatRepo, MockCooldownRepo,
        MockHoldingsRepo, MockUserRepo,
    };
    use crate::infrastructure::scheduler::DeadlineScheduler;
    use crate::use_cases::cooldown::CooldownDurations;
    use chrono::{TimeDelta, Utc};
    use std::time::Duration;
    use tidewatch_domain::{ActionKind, CooldownRecord, CombatTarget, EncounterKind, InventoryEntry};

    struct Fixture {
        holdings: MockHoldingsRepo,
        cooldowns: MockCooldownRepo,
        combat: MockCombatRepo,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                holdings: MockHoldingsRepo::new(),
                cooldowns: MockCooldownRepo::new(),
                combat: MockCombatRepo::new(),
            }
        }

        fn build(self) -> QueryService {
            let clock = Arc::new(FixedClock(Utc::now()));
            let mut broadcaster = MockBroadcaster::new();
            broadcaster.expect_publish().returning(|_, _| 1);
            QueryService::new(
                Arc::new(self.holdings),
                Arc::new(AchievementService::new(
                    Arc::new(MockAchievementRepo::new()),
                    Arc::new(MockUserRepo::new()),
                    clock.clone(),
                )),
                Arc::new(CooldownGate::new(
                    Arc::new(self.cooldowns),
                    clock.clone(),
                    CooldownDurations::default(),
                )),
                Arc::new(CombatSessionManager::new(
                    Arc::new(self.combat),
                    Arc::new(broadcaster),
                    clock.clone(),
                    Arc::new(DeadlineScheduler::new()),
                    Duration::ZERO,
                )),
                clock,
            )
        }
    }

    #[tokio::test]
    async fn leaderboard_is_ranked_from_one() {
        let mut fixture = Fixture::new();
        fixture
            .holdings
            .expect_leaderboard()
            .withf(|kind, limit| kind.as_str() == "gold" && *limit == 2)
            .returning(|_, _| {
                Ok(vec![
                    LeaderboardRow {
                        user_id: UserId::new(),
                        display_name: "Mina".into(),
                        count: 900,
                    },
                    LeaderboardRow {
                        user_id: UserId::new(),
                        display_name: "Jun".into(),
                        count: 400,
                    },
                ])
            });

        let board = fixture.build().leaderboard("gold", 2).await.unwrap();
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[1].display_name, "Jun");
    }

    #[tokio::test]
    async fn leaderboard_rejects_bad_kinds() {
        let err = Fixture::new().build().leaderboard("", 10).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidKind(_)));
    }

    #[tokio::test]
    async fn inventory_totals_fish() {
        let user = UserId::new();
        let mut fixture = Fixture::new();
        fixture.holdings.expect_list_for_user().returning(move |user_id| {
            Ok(vec![
                InventoryEntry {
                    user_id,
                    kind: ItemKind::gold(),
                    count: 50,
                },
                InventoryEntry {
                    user_id,
                    kind: ItemKind::fish("Ice Shark"),
                    count: 2,
                },
                InventoryEntry {
                    user_id,
                    kind: ItemKind::fish("Sardine Pie"),
                    count: 3,
                },
            ])
        });

        let inventory = fixture.build().inventory(user).await.unwrap();
        assert_eq!(inventory.total_fish, 5);
        assert_eq!(inventory.holdings.len(), 3);
    }

    #[tokio::test]
    async fn only_running_cooldowns_are_reported() {
        let mut fixture = Fixture::new();
        fixture.cooldowns.expect_list_for_user().returning(|user_id| {
            let now = Utc::now();
            Ok(vec![
                CooldownRecord {
                    user_id,
                    kind: ActionKind::Fishing,
                    ends_at: now + TimeDelta::seconds(90),
                },
                CooldownRecord {
                    user_id,
                    kind: ActionKind::Raid,
                    ends_at: now - TimeDelta::seconds(90),
                },
            ])
        });

        let cooldowns = fixture.build().cooldowns(UserId::new()).await.unwrap();
        assert_eq!(cooldowns.len(), 1);
        assert_eq!(cooldowns[0].kind, ActionKind::Fishing);
        assert!(cooldowns[0].remaining_ms > 0);
    }

    #[tokio::test]
    async fn raid_status_lists_every_tier() {
        let mut fixture = Fixture::new();
        fixture.combat.expect_create().returning(|_| Ok(()));
        let service = fixture.build();
        let tier = RaidTier::Intermediate;
        service
            .combat
            .spawn(
                tier.room_id(),
                EncounterKind::Raid { tier },
                vec![CombatTarget::new(tier.boss_name(), tier.max_health()).unwrap()],
            )
            .await
            .unwrap();

        let raids = service.raids().await;
        assert_eq!(raids.len(), 3);
        assert!(raids[0].session.is_none());
        let live = raids[1].session.as_ref().unwrap();
        assert_eq!(live.phase, "spawning");
        assert_eq!(live.max_health, 15_000);
    }
}
