//! Request-level route gate.
//!
//! A cheap check that runs before any protected page using only what the
//! session token carries. It redirects for UX and is not a security
//! boundary: every handler still calls the access guards.
//!
//! Layers run in order and the first redirect wins:
//!
//! 1. No token on a protected path: sign-in, with a `callbackUrl`.
//! 2. Onboarding incomplete: the onboarding page, keeping any invite code.
//! 3. Admin prefix without `business_admin`: the landing page.

use url::form_urlencoded;

use crate::config::GateConfig;
use crate::repository::OrgRole;
use crate::session::RoleFactBundle;

/// Query parameters carrying an invite code that must survive the
/// onboarding detour, in lookup order.
const FORWARDED_INVITE_PARAMS: [&str; 2] = ["invite", "code"];

/// The slice of role facts the gate reads from a session token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateClaims {
    pub onboarding_complete: bool,
    pub org_role: Option<OrgRole>,
}

impl From<&RoleFactBundle> for GateClaims {
    fn from(bundle: &RoleFactBundle) -> Self {
        Self {
            onboarding_complete: bundle.onboarding_complete,
            org_role: bundle.org_role,
        }
    }
}

/// One incoming request as seen by the gate.
#[derive(Debug, Clone, Default)]
pub struct GateRequest {
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// `None` when the request carries no valid session token.
    pub claims: Option<GateClaims>,
}

impl GateRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_claims(mut self, claims: GateClaims) -> Self {
        self.claims = Some(claims);
        self
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// Location to send the client to, path plus optional query.
    Redirect(String),
}

impl GateDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteGate {
    config: GateConfig,
}

impl RouteGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn evaluate(&self, request: &GateRequest) -> GateDecision {
        let path = request.path.as_str();
        if !matches_any(path, &self.config.protected_prefixes) {
            return GateDecision::Pass;
        }

        let Some(claims) = &request.claims else {
            let location = self.sign_in_location(request);
            log::debug!(target: "tenantry", "msg=\"gate redirect\", layer=\"auth\", path=\"{path}\"");
            return GateDecision::Redirect(location);
        };

        if !claims.onboarding_complete && !matches_any(path, &self.config.onboarding_exempt_prefixes) {
            let location = self.onboarding_location(request);
            log::debug!(target: "tenantry", "msg=\"gate redirect\", layer=\"onboarding\", path=\"{path}\"");
            return GateDecision::Redirect(location);
        }

        if matches_any(path, &self.config.admin_prefixes) && claims.org_role != Some(OrgRole::BusinessAdmin) {
            log::debug!(target: "tenantry", "msg=\"gate redirect\", layer=\"role\", path=\"{path}\"");
            return GateDecision::Redirect(self.config.landing_path.clone());
        }

        GateDecision::Pass
    }

    fn sign_in_location(&self, request: &GateRequest) -> String {
        let callback = match request.query() {
            Some(query) => format!("{}?{query}", request.path),
            None => request.path.clone(),
        };
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("callbackUrl", &callback)
            .finish();
        format!("{}?{query}", self.config.sign_in_path)
    }

    fn onboarding_location(&self, request: &GateRequest) -> String {
        let forwarded = request.query().and_then(|query| {
            let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes()).into_owned().collect();
            FORWARDED_INVITE_PARAMS.iter().find_map(|name| {
                pairs
                    .iter()
                    .find(|(key, value)| key == name && !value.is_empty())
                    .map(|(key, value)| (key.clone(), value.clone()))
            })
        });

        match forwarded {
            Some((key, value)) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(&key, &value)
                    .finish();
                format!("{}?{query}", self.config.onboarding_path)
            }
            None => self.config.onboarding_path.clone(),
        }
    }
}

/// Whole-segment prefix match: `/admin` covers `/admin/x`, not `/administrator`.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn matches_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| matches_prefix(path, prefix))
}
