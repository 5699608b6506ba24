use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, ErrorSeverity};
use crate::template::EffectTemplate;
use crate::types::{SkillId, TemplateId};

/// Read-only template lookup used by the engine.
pub trait TemplateOracle: Send + Sync {
    fn template(&self, id: TemplateId) -> Option<Arc<EffectTemplate>>;

    /// Templates applied by a skill cast, in registration order.
    fn templates_for_skill(&self, skill: SkillId) -> Vec<Arc<EffectTemplate>>;
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("template {0} is registered twice")]
    DuplicateTemplate(TemplateId),

    #[error("template {id} has an enchant variant on route 0")]
    InvalidVariant { id: TemplateId },
}

impl EngineError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateTemplate(_) => "REGISTRY_DUPLICATE_TEMPLATE",
            Self::InvalidVariant { .. } => "REGISTRY_INVALID_VARIANT",
        }
    }
}

/// Global template table, built once at startup and immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    by_id: HashMap<TemplateId, Arc<EffectTemplate>>,
    by_skill: HashMap<SkillId, Vec<TemplateId>>,
}

impl TemplateRegistry {
    /// Builds the registry, rejecting duplicate ids and malformed variants.
    pub fn new(templates: impl IntoIterator<Item = EffectTemplate>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for template in templates {
            if template.enchant_variants.iter().any(|v| v.route == 0) {
                return Err(RegistryError::InvalidVariant { id: template.id });
            }
            if registry.by_id.contains_key(&template.id) {
                return Err(RegistryError::DuplicateTemplate(template.id));
            }
            registry
                .by_skill
                .entry(template.skill_id)
                .or_default()
                .push(template.id);
            registry.by_id.insert(template.id, Arc::new(template));
        }
        Ok(registry)
    }

    pub fn get(&self, id: TemplateId) -> Option<&Arc<EffectTemplate>> {
        self.by_id.get(&id)
    }

    pub fn for_skill(&self, skill: SkillId) -> impl Iterator<Item = &Arc<EffectTemplate>> + '_ {
        self.by_skill
            .get(&skill)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl TemplateOracle for TemplateRegistry {
    fn template(&self, id: TemplateId) -> Option<Arc<EffectTemplate>> {
        self.get(id).cloned()
    }

    fn templates_for_skill(&self, skill: SkillId) -> Vec<Arc<EffectTemplate>> {
        self.for_skill(skill).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{AbnormalType, EffectKind, EnchantVariant};

    fn template(id: u32, skill: u32) -> EffectTemplate {
        EffectTemplate::new(
            TemplateId(id),
            format!("t{id}"),
            SkillId(skill),
            EffectKind::Marker,
            AbnormalType::None,
        )
    }

    #[test]
    fn skill_lookup_preserves_registration_order() {
        let registry =
            TemplateRegistry::new([template(3, 10), template(1, 10), template(2, 11)]).unwrap();
        let ids: Vec<_> = registry
            .templates_for_skill(SkillId(10))
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![TemplateId(3), TemplateId(1)]);
        assert!(registry.templates_for_skill(SkillId(99)).is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = TemplateRegistry::new([template(1, 10), template(1, 11)]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTemplate(TemplateId(1)));
        assert_eq!(err.error_code(), "REGISTRY_DUPLICATE_TEMPLATE");
    }

    #[test]
    fn route_zero_variant_is_rejected() {
        let bad = template(1, 10).with_variant(EnchantVariant {
            route: 0,
            min_level: 1,
            duration_ticks: None,
            power: None,
            priority: None,
        });
        assert!(matches!(
            TemplateRegistry::new([bad]),
            Err(RegistryError::InvalidVariant { .. })
        ));
    }
}
