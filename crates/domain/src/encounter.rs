//! Encounter templates - raid tiers, expedition areas and the attack formula.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{species_in_rank_range, FishSpecies};
use crate::error::DomainError;
use crate::holdings::ItemKind;
use crate::ids::RoomId;
use crate::reward::RewardPolicy;

/// Raid difficulty. Each tier has its own room and at most one live boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl RaidTier {
    pub const ALL: [RaidTier; 3] = [RaidTier::Beginner, RaidTier::Intermediate, RaidTier::Advanced];

    pub fn as_str(self) -> &'static str {
        match self {
            RaidTier::Beginner => "beginner",
            RaidTier::Intermediate => "intermediate",
            RaidTier::Advanced => "advanced",
        }
    }

    pub fn boss_name(self) -> &'static str {
        match self {
            RaidTier::Beginner => "Margaglesum",
            RaidTier::Intermediate => "Undabalena",
            RaidTier::Advanced => "Rampaging Sea God",
        }
    }

    pub fn max_health(self) -> u64 {
        match self {
            RaidTier::Beginner => 8_000,
            RaidTier::Intermediate => 15_000,
            RaidTier::Advanced => 30_000,
        }
    }

    /// The broadcast room of this tier (`raid:<tier>`).
    pub fn room_id(self) -> RoomId {
        RoomId::from_trusted(format!("raid:{}", self.as_str()))
    }

    pub fn from_room(room_id: &RoomId) -> Option<Self> {
        room_id
            .as_str()
            .strip_prefix("raid:")
            .and_then(|tier| tier.parse().ok())
    }

    /// Amber by rank, then a star piece for the finisher.
    pub fn reward_policy(self) -> RewardPolicy {
        let (ranks, others) = match self {
            RaidTier::Beginner => (vec![300, 200, 150, 100, 80], 50),
            RaidTier::Intermediate => (vec![500, 350, 250, 180, 130], 80),
            RaidTier::Advanced => (vec![800, 600, 450, 320, 230], 150),
        };
        RewardPolicy::RankTiered {
            currency: ItemKind::amber(),
            ranks,
            others,
            finisher_bonus: Some((ItemKind::star_piece(), 1)),
        }
    }
}

impl fmt::Display for RaidTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RaidTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(RaidTier::Beginner),
            "intermediate" => Ok(RaidTier::Intermediate),
            "advanced" => Ok(RaidTier::Advanced),
            other => Err(DomainError::validation(format!("Unknown raid tier: {other}"))),
        }
    }
}

/// An expedition destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpeditionArea {
    pub key: &'static str,
    pub name: &'static str,
    pub min_rank: u32,
    pub max_rank: u32,
    pub min_monsters: u32,
    pub max_monsters: u32,
    /// Gold split between the participants when every monster is down.
    pub gold_pool: u64,
}

impl ExpeditionArea {
    pub fn monster_pool(&self) -> Vec<FishSpecies> {
        species_in_rank_range(self.min_rank, self.max_rank)
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        RewardPolicy::Proportional {
            currency: ItemKind::gold(),
            pool: self.gold_pool,
            finisher_bonus: None,
        }
    }
}

pub const EXPEDITION_AREAS: [ExpeditionArea; 4] = [
    ExpeditionArea {
        key: "quiet_pier",
        name: "Quiet Pier",
        min_rank: 1,
        max_rank: 5,
        min_monsters: 3,
        max_monsters: 4,
        gold_pool: 1_000,
    },
    ExpeditionArea {
        key: "nostra",
        name: "Nostra",
        min_rank: 6,
        max_rank: 10,
        min_monsters: 3,
        max_monsters: 4,
        gold_pool: 3_000,
    },
    ExpeditionArea {
        key: "autumn_path",
        name: "Autumn Path",
        min_rank: 11,
        max_rank: 15,
        min_monsters: 4,
        max_monsters: 5,
        gold_pool: 8_000,
    },
    ExpeditionArea {
        key: "storm_reach",
        name: "Storm Reach",
        min_rank: 16,
        max_rank: 20,
        min_monsters: 4,
        max_monsters: 5,
        gold_pool: 20_000,
    },
];

pub fn find_area(key: &str) -> Option<&'static ExpeditionArea> {
    EXPEDITION_AREAS.iter().find(|area| area.key == key)
}

/// Lower and upper bound of the random damage factor.
pub const DAMAGE_FACTOR_RANGE: (f64, f64) = (0.8, 1.2);

/// Attack damage for a given fishing skill and random factor:
/// `floor((0.00225 s^3 + 0.165 s^2 + 2 s + 3) * factor)`, at least 1.
///
/// Skill below 1 counts as 1; the factor is clamped into [`DAMAGE_FACTOR_RANGE`]
/// (NaN counts as 1.0).
pub fn attack_damage(skill: u64, factor: f64) -> u64 {
    let s = skill.max(1) as f64;
    let factor = if factor.is_nan() {
        1.0
    } else {
        factor.clamp(DAMAGE_FACTOR_RANGE.0, DAMAGE_FACTOR_RANGE.1)
    };
    let base = 0.00225 * s.powi(3) + 0.165 * s.powi(2) + 2.0 * s + 3.0;
    let damage = (base * factor).floor();
    if damage.is_finite() && damage >= 1.0 {
        damage as u64
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_rooms_round_trip() {
        for tier in RaidTier::ALL {
            assert_eq!(RaidTier::from_room(&tier.room_id()), Some(tier));
        }
        assert_eq!(RaidTier::from_room(&RoomId::lobby()), None);
        assert_eq!(RaidTier::from_room(&RoomId::new("raid:mythic").unwrap()), None);
    }

    #[test]
    fn tier_health_pools() {
        assert_eq!(RaidTier::Beginner.max_health(), 8_000);
        assert_eq!(RaidTier::Intermediate.max_health(), 15_000);
        assert_eq!(RaidTier::Advanced.max_health(), 30_000);
    }

    #[test]
    fn damage_at_skill_one() {
        // 0.00225 + 0.165 + 2 + 3 = 5.16725
        assert_eq!(attack_damage(1, 1.0), 5);
        assert_eq!(attack_damage(0, 1.0), 5);
        assert_eq!(attack_damage(1, 0.8), 4);
        assert_eq!(attack_damage(1, 1.2), 6);
    }

    #[test]
    fn damage_grows_with_skill() {
        // 0.00225 * 1000 + 0.165 * 100 + 20 + 3 = 41.75
        assert_eq!(attack_damage(10, 1.0), 41);
        assert!(attack_damage(20, 1.0) > attack_damage(10, 1.0));
    }

    #[test]
    fn factor_is_clamped() {
        assert_eq!(attack_damage(10, 5.0), attack_damage(10, 1.2));
        assert_eq!(attack_damage(10, -1.0), attack_damage(10, 0.8));
        assert_eq!(attack_damage(10, f64::NAN), attack_damage(10, 1.0));
    }

    #[test]
    fn areas_have_monsters() {
        for area in EXPEDITION_AREAS {
            assert!(!area.monster_pool().is_empty());
            assert!(area.min_monsters <= area.max_monsters);
        }
        assert!(find_area("nostra").is_some());
        assert!(find_area("moon").is_none());
    }
}
