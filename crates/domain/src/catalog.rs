//! Read-only fish catalog.
//!
//! The catalog is static configuration. Fishing rolls against a window of ten
//! species chosen by the angler's skill, plus the starfish which is always
//! catchable.

use serde::Serialize;

/// One catchable species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FishSpecies {
    pub name: &'static str,
    pub rank: u32,
    pub price: u64,
    /// Health when the species appears as an expedition monster.
    pub health: u64,
}

const fn species(name: &'static str, rank: u32, price: u64, health: u64) -> FishSpecies {
    FishSpecies {
        name,
        rank,
        price,
        health,
    }
}

/// Regular species ordered by rank.
pub const FISH_CATALOG: [FishSpecies; 35] = [
    species("Taco Octopus", 1, 300, 15),
    species("Grass Mackerel", 2, 700, 25),
    species("Dumpling Carp", 3, 1_200, 35),
    species("Butter Squid", 4, 1_800, 55),
    species("Soy Shrimp", 5, 3_000, 80),
    species("Water Corn", 6, 5_000, 115),
    species("Sardine Pie", 7, 8_000, 160),
    species("Ice Shark", 8, 12_000, 215),
    species("Squall Squid", 9, 18_000, 280),
    species("Pine Turtle", 10, 30_000, 355),
    species("Ghost Fish", 11, 47_000, 440),
    species("Phantom Cutlass", 12, 72_000, 525),
    species("Bite Dog", 13, 98_000, 640),
    species("Pumpkin Whale", 14, 133_000, 755),
    species("Viking Clam", 15, 176_000, 880),
    species("Angel Jellyfish", 16, 239_000, 1_015),
    species("Devil Puffer", 17, 290_000, 1_160),
    species("Seven-Star Eel", 18, 355_000, 1_315),
    species("Doctor Black", 19, 432_000, 1_480),
    species("Sea Dragon", 20, 521_000, 1_655),
    species("Mecha King Crab", 21, 735_000, 1_840),
    species("Lamprey", 22, 860_000, 2_035),
    species("Last Leaf", 23, 997_000, 2_240),
    species("Ice Breather", 24, 1_146_000, 2_455),
    species("Sea God", 25, 1_307_000, 2_680),
    species("Pinky Fish", 26, 1_480_000, 2_915),
    species("Corntopus", 27, 1_665_000, 3_160),
    species("Deep One", 28, 1_862_000, 3_415),
    species("Cthulhu", 29, 2_071_000, 3_680),
    species("Blossom Lily", 30, 2_283_000, 3_955),
    species("Damus", 31, 2_507_000, 4_240),
    species("Guardian", 32, 2_743_000, 4_535),
    species("Sun Starfish", 33, 2_991_000, 4_840),
    species("Big Father Penguin", 34, 3_251_000, 5_155),
    species("Crane Turtle", 35, 3_523_000, 5_480),
];

/// Always catchable, never counted towards rank announcements.
pub const STARFISH: FishSpecies = species("Starfish", 0, 100, 10);

/// Relative weights (per mille) for the ten species in the skill window.
const WINDOW_WEIGHTS: [u32; 10] = [400, 240, 150, 80, 50, 30, 20, 10, 7, 3];

const STARFISH_WEIGHT: u32 = 10;

/// The weighted catch table for an angler of the given skill. Skill 1 (and
/// 0) fishes ranks 1 to 10; each further point shifts the window by one.
pub fn catch_table(skill: u64) -> Vec<(FishSpecies, u32)> {
    let max_start = FISH_CATALOG.len() - WINDOW_WEIGHTS.len();
    let start = usize::try_from(skill.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .min(max_start);
    FISH_CATALOG[start..start + WINDOW_WEIGHTS.len()]
        .iter()
        .copied()
        .zip(WINDOW_WEIGHTS)
        .chain(std::iter::once((STARFISH, STARFISH_WEIGHT)))
        .collect()
}

/// Sum of the weights in a table.
pub fn total_weight(table: &[(FishSpecies, u32)]) -> u32 {
    table.iter().map(|(_, weight)| *weight).sum()
}

/// Pick the entry a roll in `0..total_weight(table)` lands on. Rolls past the
/// end fall on the last entry.
pub fn pick_weighted(table: &[(FishSpecies, u32)], roll: u32) -> Option<FishSpecies> {
    let mut remaining = roll;
    for (species, weight) in table {
        if remaining < *weight {
            return Some(*species);
        }
        remaining -= weight;
    }
    table.last().map(|(species, _)| *species)
}

/// Species whose rank lies in `min..=max`.
pub fn species_in_rank_range(min: u32, max: u32) -> Vec<FishSpecies> {
    FISH_CATALOG
        .iter()
        .filter(|s| (min..=max).contains(&s.rank))
        .copied()
        .collect()
}

pub fn find_species(name: &str) -> Option<FishSpecies> {
    FISH_CATALOG
        .iter()
        .chain(std::iter::once(&STARFISH))
        .find(|s| s.name == name)
        .copied()
}
