//! Reward policies - how a defeated session's contributions become holdings.
//!
//! Distribution is a pure function of the [`RewardClaim`]. Exactly-once
//! delivery is the caller's job: the claim can only be taken from a session
//! once, and the store keys credited rewards by session.

use serde::{Deserialize, Serialize};

use crate::combat::RewardClaim;
use crate::holdings::ItemKind;
use crate::ids::UserId;

/// One credit to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShare {
    pub user_id: UserId,
    pub kind: ItemKind,
    pub amount: u64,
}

/// The configurable reward curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RewardPolicy {
    /// Fixed amounts for the top ranks, a flat amount for everyone else
    /// who dealt damage.
    RankTiered {
        currency: ItemKind,
        ranks: Vec<u64>,
        others: u64,
        finisher_bonus: Option<(ItemKind, u64)>,
    },
    /// A fixed pool split in proportion to damage. Rounding remainders go
    /// to the top contributors so the pool is always paid out in full.
    Proportional {
        currency: ItemKind,
        pool: u64,
        finisher_bonus: Option<(ItemKind, u64)>,
    },
}

impl RewardPolicy {
    /// Compute the shares for a claim. Zero-damage participants never appear
    /// in a claim, so they never receive anything. Shares of zero are omitted.
    pub fn distribute(&self, claim: &RewardClaim) -> Vec<RewardShare> {
        let mut shares = match self {
            RewardPolicy::RankTiered {
                currency,
                ranks,
                others,
                ..
            } => claim
                .contributions
                .iter()
                .map(|c| {
                    let index = usize::try_from(c.rank.saturating_sub(1)).unwrap_or(usize::MAX);
                    RewardShare {
                        user_id: c.user_id,
                        kind: currency.clone(),
                        amount: ranks.get(index).copied().unwrap_or(*others),
                    }
                })
                .collect::<Vec<_>>(),
            RewardPolicy::Proportional { currency, pool, .. } => {
                proportional_split(claim, currency, *pool)
            }
        };

        if let (Some((kind, amount)), Some(finisher)) = (self.finisher_bonus(), claim.finisher) {
            shares.push(RewardShare {
                user_id: finisher,
                kind: kind.clone(),
                amount: *amount,
            });
        }

        shares.retain(|share| share.amount > 0);
        shares
    }

    fn finisher_bonus(&self) -> Option<&(ItemKind, u64)> {
        match self {
            RewardPolicy::RankTiered { finisher_bonus, .. }
            | RewardPolicy::Proportional { finisher_bonus, .. } => finisher_bonus.as_ref(),
        }
    }
}

fn proportional_split(claim: &RewardClaim, currency: &ItemKind, pool: u64) -> Vec<RewardShare> {
    let total: u128 = claim.contributions.iter().map(|c| u128::from(c.damage)).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut amounts: Vec<u64> = claim
        .contributions
        .iter()
        .map(|c| {
            let share = u128::from(pool) * u128::from(c.damage) / total;
            u64::try_from(share).unwrap_or(u64::MAX)
        })
        .collect();

    // Contributions are ranked, so the remainder goes to the best first.
    let paid: u64 = amounts.iter().sum();
    let mut remainder = pool.saturating_sub(paid);
    for amount in amounts.iter_mut() {
        if remainder == 0 {
            break;
        }
        *amount += 1;
        remainder -= 1;
    }

    claim
        .contributions
        .iter()
        .zip(amounts)
        .map(|(c, amount)| RewardShare {
            user_id: c.user_id,
            kind: currency.clone(),
            amount,
        })
        .collect()
}

/// Sum of shares of one kind.
pub fn total_of(shares: &[RewardShare], kind: &ItemKind) -> u64 {
    shares
        .iter()
        .filter(|s| &s.kind == kind)
        .map(|s| s.amount)
        .sum()
}
