//! Scripted encounter loader.
//!
//! A scenario declares a roster of actors and a timeline of engine calls. The
//! sandbox driver replays it against a live runtime.

use std::path::Path;

use effect_core::{
    AbnormalType, ActorId, ActorProfile, ActorTags, DispelSelector, Position, SkillId, SkillRef,
};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Broad actor category; expands into capability tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKindSpec {
    Player,
    Monster,
    RaidBoss,
    Guard,
    Summon,
}

impl ActorKindSpec {
    pub fn tags(self) -> ActorTags {
        match self {
            Self::Player => ActorTags::PLAYER,
            Self::Monster => ActorTags::NPC | ActorTags::MONSTER | ActorTags::ATTACKABLE,
            Self::RaidBoss => {
                ActorTags::NPC | ActorTags::MONSTER | ActorTags::ATTACKABLE | ActorTags::RAID
            }
            Self::Guard => ActorTags::NPC | ActorTags::GUARD,
            Self::Summon => ActorTags::SUMMON,
        }
    }
}

/// Actor entry as written in scenario files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSpec {
    pub id: u32,
    pub kind: ActorKindSpec,
    #[serde(default)]
    pub npc_id: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub position: (i32, i32, i32),
    #[serde(default)]
    pub aggressive: bool,
    #[serde(default)]
    pub reputation: i32,
    #[serde(default)]
    pub owner: Option<u32>,
}

fn default_level() -> u32 {
    1
}

impl ActorSpec {
    pub fn to_profile(&self) -> ActorProfile {
        let (x, y, z) = self.position;
        let mut profile = ActorProfile::new(ActorId(self.id), self.kind.tags())
            .with_npc_id(self.npc_id)
            .with_level(self.level)
            .at(Position::new(x, y, z))
            .aggressive(self.aggressive)
            .with_reputation(self.reputation);
        if let Some(owner) = self.owner {
            profile = profile.owned_by(ActorId(owner));
        }
        profile
    }
}

/// One scripted engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Cast a skill; `enchant` is the combined `route * 1000 + level` value.
    Cast {
        caster: u32,
        target: u32,
        skill: u32,
        #[serde(default = "default_level")]
        level: u32,
        #[serde(default)]
        enchant: u32,
    },
    Dispel {
        actor: u32,
        selector: DispelSelector,
    },
    /// A player cancels one of their own buffs (or a summon's).
    Cancel {
        requester: u32,
        actor: u32,
        skill: u32,
    },
    /// Dispel everything a given abnormal type holds on an actor.
    Cleanse {
        actor: u32,
        abnormal: AbnormalType,
    },
    Kill {
        actor: u32,
    },
    Remove {
        actor: u32,
    },
    /// Let simulated time advance.
    Wait {
        ms: u64,
    },
}

impl ScenarioStep {
    /// Skill descriptor for a cast step.
    pub fn skill_ref(&self) -> Option<SkillRef> {
        match self {
            Self::Cast {
                skill,
                level,
                enchant,
                ..
            } => Some(SkillRef::from_combined(SkillId(*skill), *level, *enchant)),
            _ => None,
        }
    }
}

/// Complete encounter description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub actors: Vec<ActorSpec>,
    pub steps: Vec<ScenarioStep>,
}

/// Loader for scenarios from RON files.
pub struct ScenarioLoader;

impl ScenarioLoader {
    pub fn load(path: &Path) -> LoadResult<Scenario> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Scenario> {
        let scenario: Scenario = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario RON: {}", e))?;

        let mut seen = std::collections::HashSet::new();
        for actor in &scenario.actors {
            if !seen.insert(actor.id) {
                anyhow::bail!(
                    "Scenario '{}' declares actor {} twice",
                    scenario.name,
                    actor.id
                );
            }
        }
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
(
    name: "ambush",
    actors: [
        (id: 1, kind: Player, level: 40),
        (id: 2, kind: Monster, npc_id: 20100, position: (120, 0, 0), aggressive: true),
        (id: 3, kind: Summon, owner: Some(1)),
    ],
    steps: [
        Cast(caster: 1, target: 2, skill: 1245, enchant: 1012),
        Wait(ms: 2000),
        Dispel(actor: 2, selector: AllDebuffs),
        Cleanse(actor: 2, abnormal: Poison),
        Cancel(requester: 1, actor: 3, skill: 1300),
        Kill(actor: 2),
    ],
)
"#;

    #[test]
    fn parses_actors_and_steps() {
        let scenario = ScenarioLoader::parse(SCENARIO).unwrap();
        assert_eq!(scenario.actors.len(), 3);

        let monster = scenario.actors[1].to_profile();
        assert!(monster.is(ActorTags::MONSTER | ActorTags::ATTACKABLE));
        assert_eq!(monster.position, Position::new(120, 0, 0));
        assert!(monster.aggressive);

        let summon = scenario.actors[2].to_profile();
        assert_eq!(summon.owner, Some(ActorId(1)));

        let cast = scenario.steps[0].skill_ref().unwrap();
        assert_eq!((cast.enchant_route, cast.enchant_level), (1, 12));
        assert_eq!(scenario.steps[1], ScenarioStep::Wait { ms: 2000 });
    }

    #[test]
    fn duplicate_actor_ids_are_rejected() {
        let err = ScenarioLoader::parse(
            r#"(name: "dup", actors: [(id: 1, kind: Player), (id: 1, kind: Guard)], steps: [])"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declares actor 1 twice"));
    }
}
