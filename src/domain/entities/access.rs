use serde::Serialize;

/// Where a navigation target sits with respect to the subscription gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// Plan selection, expired-plan notice and payment return pages.
    /// Always reachable so a lapsed professional can pay.
    PlanSelection,
    Marketplace,
    Dashboard,
    Other,
}

const PLAN_SELECTION_PATHS: &[&str] = &[
    "/plans",
    "/principal/plans",
    "/expired-plan",
    "/payment-success",
];

impl ResourceClass {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };

        if PLAN_SELECTION_PATHS.contains(&normalized) {
            return ResourceClass::PlanSelection;
        }
        if is_under(normalized, "/marketplace") {
            return ResourceClass::Marketplace;
        }
        if is_under(normalized, "/principal") {
            return ResourceClass::Dashboard;
        }
        ResourceClass::Other
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    RedirectToPlanSelection,
    RedirectToLogin,
}

impl AccessDecision {
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::RedirectToPlanSelection => Some("/expired-plan"),
            AccessDecision::RedirectToLogin => Some("/login"),
        }
    }
}
