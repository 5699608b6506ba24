//! Stat bonuses contributed by active effects.
//!
//! Effects never write final stat values. They register [`StatBonus`]es on the
//! effected actor's [`ActorStatus`](crate::ActorStatus) when they start and
//! withdraw them on exit; the stat-recalculation collaborator folds the
//! remaining bonuses through a [`BonusStack`]:
//!
//! Flat → %Inc → More → Less → Clamp

/// Stats an effect may modify.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatKind {
    MaxHp,
    MaxMp,
    PhysicalAttack,
    MagicAttack,
    PhysicalDefense,
    MagicDefense,
    AttackSpeed,
    CastSpeed,
    RunSpeed,
    Accuracy,
    Evasion,
    CriticalRate,
}

/// A single bonus applied to a stat value.
///
/// - **Flat**: additive, applied first (e.g., +50 P.Def)
/// - **Increased**: percentage increases, summed then multiplied (e.g., +20%)
/// - **More**: sequential multipliers (50 = ×1.5)
/// - **Less**: sequential reductions (10 = ×0.9)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bonus {
    Flat(i32),
    Increased(i32),
    More(i32),
    Less(i32),
}

/// A bonus bound to the stat it modifies, as declared on a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBonus {
    pub stat: StatKind,
    pub bonus: Bonus,
}

impl StatBonus {
    pub const fn new(stat: StatKind, bonus: Bonus) -> Self {
        Self { stat, bonus }
    }
}

/// A collection of bonuses evaluated in a fixed order.
///
/// # Example
/// ```
/// # use effect_core::stats::{Bonus, BonusStack};
/// let mut stack = BonusStack::new();
/// stack.add(Bonus::Flat(5));
/// stack.add(Bonus::Increased(20));
/// stack.add(Bonus::Increased(15));
/// stack.add(Bonus::More(50));
/// stack.add(Bonus::Less(10));
///
/// // clamp((10 + 5) × 1.35 × 1.5 × 0.9, 5, 100) = 27
/// assert_eq!(stack.apply(10, 5, 100), 27);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BonusStack {
    bonuses: Vec<Bonus>,
}

impl BonusStack {
    pub fn new() -> Self {
        Self {
            bonuses: Vec::new(),
        }
    }

    pub fn add(&mut self, bonus: Bonus) {
        self.bonuses.push(bonus);
    }

    pub fn extend(&mut self, bonuses: impl IntoIterator<Item = Bonus>) {
        self.bonuses.extend(bonuses);
    }

    /// Applies all bonuses to `base` and clamps the result to `[min, max]`.
    ///
    /// Intermediate values are carried in `i64` so large percentage stacks
    /// saturate at the clamp instead of overflowing.
    pub fn apply(&self, base: i32, min: i32, max: i32) -> i32 {
        let mut flat_sum = 0i64;
        let mut inc_sum = 0i64;
        for bonus in &self.bonuses {
            match *bonus {
                Bonus::Flat(v) => flat_sum += i64::from(v),
                Bonus::Increased(p) => inc_sum += i64::from(p),
                Bonus::More(_) | Bonus::Less(_) => {}
            }
        }

        let mut value = (i64::from(base) + flat_sum) * (100 + inc_sum) / 100;

        for bonus in &self.bonuses {
            if let Bonus::More(p) = *bonus {
                value = value * (100 + i64::from(p)) / 100;
            }
        }
        for bonus in &self.bonuses {
            if let Bonus::Less(p) = *bonus {
                value = value * (100 - i64::from(p)) / 100;
            }
        }

        value.clamp(i64::from(min), i64::from(max)) as i32
    }

    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bonuses.len()
    }
}

impl FromIterator<Bonus> for BonusStack {
    fn from_iter<T: IntoIterator<Item = Bonus>>(iter: T) -> Self {
        Self {
            bonuses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_returns_clamped_base() {
        let stack = BonusStack::new();
        assert_eq!(stack.apply(120, 0, 100), 100);
        assert_eq!(stack.apply(40, 0, 100), 40);
    }

    #[test]
    fn increased_bonuses_are_summed_before_multiplying() {
        let stack: BonusStack = [Bonus::Increased(10), Bonus::Increased(10)]
            .into_iter()
            .collect();
        // 100 × 1.2, not 100 × 1.1 × 1.1
        assert_eq!(stack.apply(100, 0, i32::MAX), 120);
    }

    #[test]
    fn less_can_reduce_to_zero() {
        let stack: BonusStack = [Bonus::Less(100)].into_iter().collect();
        assert_eq!(stack.apply(500, 0, 1000), 0);
    }

    #[test]
    fn huge_multipliers_saturate_at_max() {
        let stack: BonusStack = [Bonus::More(10_000), Bonus::More(10_000)]
            .into_iter()
            .collect();
        assert_eq!(stack.apply(i32::MAX / 2, 0, i32::MAX), i32::MAX);
    }

    #[test]
    fn stat_kind_parses_snake_case() {
        assert_eq!("run_speed".parse::<StatKind>().unwrap(), StatKind::RunSpeed);
        assert_eq!(StatKind::PhysicalDefense.to_string(), "physical_defense");
    }
}
