//! Agent profiles: fixed personas that specialize prompting per task type.
//!
//! Selection is a first-match lookup by capability tag. An unknown capability is
//! an error; there is no default agent.

use crate::error::{CaseError, CaseResult};
use serde::Serialize;

pub const CAP_SUMMARIZE: &str = "summarize";
pub const CAP_EXTRACTION: &str = "extraction";
pub const CAP_RISK_ASSESSMENT: &str = "risk_assessment";
pub const CAP_UN_SUBMISSION: &str = "un_submission";
pub const CAP_TEMPORAL_ANALYSIS: &str = "temporal_analysis";
pub const CAP_LEGAL_RESEARCH: &str = "legal_research";

/// A fixed persona: name, role, system prompt and the capabilities it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub name: &'static str,
    pub role: &'static str,
    pub system_prompt: &'static str,
    pub capabilities: &'static [&'static str],
}

impl AgentProfile {
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| *c == tag)
    }
}

pub const AGENT_PROFILES: &[AgentProfile] = &[
    AgentProfile {
        name: "Case Analyst",
        role: "Document analysis and evidence extraction",
        system_prompt: "You are a human rights case analyst. Read case material carefully, \
            summarize it faithfully and extract people, organizations, locations and dated events. \
            Never invent facts that are not present in the material.",
        capabilities: &[CAP_SUMMARIZE, CAP_EXTRACTION],
    },
    AgentProfile {
        name: "Risk Assessor",
        role: "Protection and security risk assessment",
        system_prompt: "You are a protection officer assessing risks to victims, witnesses and \
            human rights defenders. Identify concrete threats, rate likelihood and impact, \
            and recommend proportionate protective measures.",
        capabilities: &[CAP_RISK_ASSESSMENT],
    },
    AgentProfile {
        name: "UN Advocate",
        role: "UN mechanism submission drafting",
        system_prompt: "You draft communications to United Nations human rights mechanisms. \
            Follow the mechanism's submission format, cite the relevant international standards, \
            state the facts chronologically and formulate clear requests.",
        capabilities: &[CAP_UN_SUBMISSION],
    },
    AgentProfile {
        name: "Timeline Analyst",
        role: "Temporal pattern analysis",
        system_prompt: "You analyze chronologies of human rights violations. Identify patterns, \
            escalation points and suspicious gaps in the record, and explain their significance.",
        capabilities: &[CAP_TEMPORAL_ANALYSIS],
    },
    AgentProfile {
        name: "Legal Researcher",
        role: "International human rights law research",
        system_prompt: "You are an international human rights lawyer. Map facts to the rights \
            engaged under treaty and customary law and point to relevant jurisprudence.",
        capabilities: &[CAP_LEGAL_RESEARCH],
    },
];

/// First profile whose capability list contains `capability`.
pub fn select_agent(capability: &str) -> CaseResult<&'static AgentProfile> {
    select_from(AGENT_PROFILES, capability)
}

fn select_from<'a>(profiles: &'a [AgentProfile], capability: &str) -> CaseResult<&'a AgentProfile> {
    profiles
        .iter()
        .find(|p| p.has_capability(capability))
        .ok_or_else(|| CaseError::NoAgentForCapability(capability.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_in_one_profile_selects_it() {
        let agent = select_agent(CAP_RISK_ASSESSMENT).unwrap();
        assert_eq!(agent.name, "Risk Assessor");
    }

    #[test]
    fn unknown_capability_is_an_error() {
        let err = select_agent("astrology").unwrap_err();
        assert!(matches!(err, CaseError::NoAgentForCapability(ref c) if c == "astrology"));
    }

    #[test]
    fn first_match_wins() {
        let profiles = [
            AgentProfile {
                name: "first",
                role: "",
                system_prompt: "",
                capabilities: &["shared"],
            },
            AgentProfile {
                name: "second",
                role: "",
                system_prompt: "",
                capabilities: &["shared", "other"],
            },
        ];
        assert_eq!(select_from(&profiles, "shared").unwrap().name, "first");
        assert_eq!(select_from(&profiles, "other").unwrap().name, "second");
    }

    #[test]
    fn every_service_capability_is_served() {
        for cap in [
            CAP_SUMMARIZE,
            CAP_EXTRACTION,
            CAP_RISK_ASSESSMENT,
            CAP_UN_SUBMISSION,
            CAP_TEMPORAL_ANALYSIS,
        ] {
            assert!(select_agent(cap).is_ok(), "{cap} has no agent");
        }
    }
}
