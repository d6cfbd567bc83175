//! Role framing table.

use super::types::{Language, Role};
use serde::Serialize;

/// Framing text for one known role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    /// Role key accepted in requests.
    pub key: &'static str,
    /// Framing used for `zh-CN` summaries.
    pub framing_zh: &'static str,
    /// Framing used for `en-US` summaries.
    pub framing_en: &'static str,
}

const ROLE_TABLE: &[RoleProfile] = &[
    RoleProfile {
        key: "lawyer",
        framing_zh: "作为法律专家，重点关注法律条款、权利义务、风险点和合规要求",
        framing_en: "As a legal expert, focus on legal clauses, rights and obligations, risks and compliance requirements",
    },
    RoleProfile {
        key: "student",
        framing_zh: "作为学生，重点关注核心概念、主要观点和学习要点",
        framing_en: "As a student, focus on core concepts, main arguments and study points",
    },
    RoleProfile {
        key: "researcher",
        framing_zh: "作为研究者，重点关注方法论、数据分析和学术观点",
        framing_en: "As a researcher, focus on methodology, data analysis and scholarly positions",
    },
    RoleProfile {
        key: "manager",
        framing_zh: "作为管理者，重点关注执行要点、风险控制和决策支持",
        framing_en: "As a manager, focus on execution points, risk control and decision support",
    },
    RoleProfile {
        key: "analyst",
        framing_zh: "作为分析师，重点关注数据洞察、趋势分析和关键指标",
        framing_en: "As an analyst, focus on data insights, trend analysis and key metrics",
    },
];

const GENERIC_FRAMING_ZH: &str = "根据用户角色进行专业分析";
const GENERIC_FRAMING_EN: &str = "Provide a professional analysis tailored to the reader's role";

/// Every role with a dedicated framing.
pub fn role_catalog() -> &'static [RoleProfile] {
    ROLE_TABLE
}

/// Framing for `role` in `language`; unknown roles get the generic framing.
pub fn role_framing(role: &Role, language: Language) -> &'static str {
    let profile = ROLE_TABLE.iter().find(|profile| profile.key == role.as_str());
    match (profile, language) {
        (Some(profile), Language::ZhCn) => profile.framing_zh,
        (Some(profile), Language::EnUs) => profile.framing_en,
        (None, Language::ZhCn) => GENERIC_FRAMING_ZH,
        (None, Language::EnUs) => GENERIC_FRAMING_EN,
    }
}
