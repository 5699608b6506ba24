//! Evaluation context and the read-only world seam.
//!
//! An [`Env`] is assembled fresh for every condition evaluation or effect
//! application. It borrows actor profiles and the [`WorldOracle`]; it never
//! owns or mutates them.
mod error;

pub use error::OracleError;

use crate::actor::ActorProfile;
use crate::types::{ActorId, Position, SkillId};

/// Read-only access to the world registry (spatial lookup and known-lists).
pub trait WorldOracle: Send + Sync {
    /// Returns a snapshot of the actor's profile, if registered.
    fn actor(&self, id: ActorId) -> Option<ActorProfile>;

    /// Returns every registered actor within `radius` of `center`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::SpatialIndexNotReady`] when spatial data is
    /// temporarily unavailable.
    fn actors_in_radius(
        &self,
        center: Position,
        radius: u32,
    ) -> Result<Vec<ActorProfile>, OracleError>;
}

/// Skill descriptor carried by a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillRef {
    pub id: SkillId,
    pub level: u32,
    pub enchant_route: u32,
    pub enchant_level: u32,
}

impl SkillRef {
    /// Multiplier separating the route from the level in a combined enchant value.
    pub const ENCHANT_ROUTE_FACTOR: u32 = 1000;

    pub const fn new(id: SkillId, level: u32) -> Self {
        Self {
            id,
            level,
            enchant_route: 0,
            enchant_level: 0,
        }
    }

    pub const fn with_enchant(mut self, route: u32, level: u32) -> Self {
        self.enchant_route = route;
        self.enchant_level = level;
        self
    }

    /// Decodes a combined enchant value (`route * 1000 + level`).
    ///
    /// ```
    /// # use effect_core::{SkillId, SkillRef};
    /// let skill = SkillRef::from_combined(SkillId(1), 3, 2015);
    /// assert_eq!((skill.enchant_route, skill.enchant_level), (2, 15));
    /// ```
    pub const fn from_combined(id: SkillId, level: u32, combined: u32) -> Self {
        Self::new(id, level).with_enchant(
            combined / Self::ENCHANT_ROUTE_FACTOR,
            combined % Self::ENCHANT_ROUTE_FACTOR,
        )
    }

    /// Inverse of [`SkillRef::from_combined`].
    pub const fn combined_enchant(&self) -> u32 {
        self.enchant_route * Self::ENCHANT_ROUTE_FACTOR + self.enchant_level
    }

    pub const fn is_enchanted(&self) -> bool {
        self.enchant_route > 0 && self.enchant_level > 0
    }
}

/// Per-evaluation context: who casts, who is affected, with what.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    world: Option<&'a dyn WorldOracle>,
    caster: Option<&'a ActorProfile>,
    target: Option<&'a ActorProfile>,
    skill: Option<SkillRef>,
    value: f64,
}

impl<'a> Env<'a> {
    pub fn new(world: &'a dyn WorldOracle) -> Self {
        Self {
            world: Some(world),
            ..Self::empty()
        }
    }

    /// A context with no world attached; spatial leaves evaluate to false.
    pub fn empty() -> Self {
        Self {
            world: None,
            caster: None,
            target: None,
            skill: None,
            value: 0.0,
        }
    }

    pub fn with_caster(mut self, caster: Option<&'a ActorProfile>) -> Self {
        self.caster = caster;
        self
    }

    pub fn with_target(mut self, target: Option<&'a ActorProfile>) -> Self {
        self.target = target;
        self
    }

    pub fn with_skill(mut self, skill: SkillRef) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Returns the WorldOracle, or an error if not available.
    pub fn world(&self) -> Result<&'a dyn WorldOracle, OracleError> {
        self.world.ok_or(OracleError::WorldNotAvailable)
    }

    pub fn caster(&self) -> Option<&'a ActorProfile> {
        self.caster
    }

    pub fn target(&self) -> Option<&'a ActorProfile> {
        self.target
    }

    pub fn skill(&self) -> Option<SkillRef> {
        self.skill
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl std::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("world", &self.world.is_some())
            .field("caster", &self.caster.map(|c| c.id))
            .field("target", &self.target.map(|t| t.id))
            .field("skill", &self.skill)
            .field("value", &self.value)
            .finish()
    }
}
