// 🪜 Escalation Chain - primary → alternative (quota) → upgrade (Misc)
// Every exit path ends in a deterministic classification

use std::sync::Arc;

use crate::category::Classification;
use crate::llm::{build_prompt, parse_verdict, ModelClient, ModelOutcome, ModelTier, ModelTiers};
use crate::rules::HeuristicClassifier;

/// Which tier produced an escalated classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Model(ModelTier),
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalated {
    pub classification: Classification,
    pub origin: Origin,
}

impl Escalated {
    fn heuristic(classification: Classification) -> Self {
        Escalated {
            classification,
            origin: Origin::Heuristic,
        }
    }

    fn model(classification: Classification, tier: ModelTier) -> Self {
        Escalated {
            classification,
            origin: Origin::Model(tier),
        }
    }
}

pub struct EscalationChain {
    /// None when no credential is configured
    client: Option<Arc<dyn ModelClient>>,
    tiers: ModelTiers,
    heuristic: HeuristicClassifier,
}

impl EscalationChain {
    pub fn new(client: Option<Arc<dyn ModelClient>>, tiers: ModelTiers) -> Self {
        EscalationChain {
            client,
            tiers,
            heuristic: HeuristicClassifier::new(),
        }
    }

    /// Chain that never leaves the process
    pub fn heuristic_only() -> Self {
        EscalationChain::new(None, ModelTiers::default())
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// At most three sequential external calls: one primary, one
    /// alternative (only after RESOURCE_EXHAUSTED) and one upgrade (only
    /// after a valid Misc answer).
    pub fn escalate(&self, item: &str) -> Escalated {
        let Some(client) = self.client.as_deref() else {
            log::debug!("no model credential configured, using heuristics for '{}'", item);
            return Escalated::heuristic(self.heuristic.classify(item));
        };

        let prompt = build_prompt(item);

        let mut tier = ModelTier::Primary;
        let mut outcome = self.call(client, tier, &prompt);
        if outcome == ModelOutcome::ResourceExhausted {
            log::debug!("primary model exhausted for '{}', trying alternative model", item);
            tier = ModelTier::Alternative;
            outcome = self.call(client, tier, &prompt);
        }

        let text = match outcome {
            ModelOutcome::Ok(text) => text,
            other => {
                log::warn!(
                    "{} model unavailable for '{}' ({:?}), using heuristics",
                    tier.as_str(),
                    item,
                    other
                );
                return Escalated::heuristic(self.heuristic.classify(item));
            }
        };

        let verdict = match parse_verdict(&text) {
            Ok(verdict) => verdict,
            Err(e) => {
                log::warn!("{} model answer for '{}' rejected: {}, using heuristics", tier.as_str(), item, e);
                return Escalated::heuristic(self.heuristic.classify(item));
            }
        };

        if !verdict.category.is_misc() {
            return Escalated::model(verdict, tier);
        }

        log::debug!("model returned Misc for '{}', attempting upgrade model", item);
        match self.call(client, ModelTier::Upgrade, &prompt) {
            ModelOutcome::Ok(text) => match parse_verdict(&text) {
                Ok(upgraded) => Escalated::model(upgraded, ModelTier::Upgrade),
                Err(e) => {
                    log::debug!("upgrade answer for '{}' rejected: {}, keeping Misc", item, e);
                    Escalated::model(verdict, tier)
                }
            },
            other => {
                log::debug!("upgrade model unavailable for '{}' ({:?}), keeping Misc", item, other);
                Escalated::model(verdict, tier)
            }
        }
    }

    fn call(&self, client: &dyn ModelClient, tier: ModelTier, prompt: &str) -> ModelOutcome {
        let model = self.tiers.model(tier);
        log::debug!("{} model call: {}", tier.as_str(), model);
        client.generate(model, prompt)
    }
}
