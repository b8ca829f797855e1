//! Host-based request classification
//!
//! Classifies every inbound request by hostname + path into exactly one
//! routing decision before any handler runs:
//! - the reserved application host -> `/app`, behind the login gate
//! - the bare root host (empty or `www`) -> `/home`
//! - everything else -> tenant content under `/{domain}`
//!
//! Outside production, real DNS subdomains are unavailable, so the first
//! rule forces a `host` query parameter that stands in for the Host header.

/// Request attributes the router decides on. Derived once per request and
/// immutable after construction.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Literal Host header, if the client sent one.
    pub raw_host: Option<String>,
    /// Value of the `host` query parameter, if present.
    pub host_override: Option<String>,
    /// Request path, always starting with `/`.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
}

/// Internal route a request is rewritten to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Dashboard pages under the reserved application host.
    App { path: String },
    /// The root marketing/home application.
    Root { path: String },
    /// Tenant content for a subdomain or custom domain.
    Tenant { domain: String, path: String },
}

impl RouteTarget {
    /// The internal path the request is dispatched to.
    pub fn path(&self) -> &str {
        match self {
            RouteTarget::App { path } => path,
            RouteTarget::Root { path } => path,
            RouteTarget::Tenant { path, .. } => path,
        }
    }
}

/// Outcome of routing a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    /// Short-circuit with an HTTP redirect to this URL.
    Redirect(String),
    /// Rewrite the request to an internal route and continue dispatch.
    Rewrite(RouteTarget),
}

/// Host router configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct HostRouter {
    /// Sentinel host identifying the internal application (e.g. "app").
    app_host: String,
    /// Path of the login page under the application host.
    login_path: String,
    /// Whether real DNS-based subdomains can be relied on.
    production: bool,
}

/// Effective request attributes after host normalization, shared by all
/// rules so each evaluates against identical inputs.
struct RouteRequest {
    effective_host: String,
    override_present: bool,
    path: String,
    query: Option<String>,
    authenticated: bool,
}

/// A single ordered routing rule. Returns `None` to fall through.
type Rule = fn(&HostRouter, &RouteRequest) -> Option<RouterDecision>;

/// Rules evaluated strictly in order; first match wins. The tenant rewrite
/// is the total fallthrough and lives outside this list.
const RULES: &[Rule] = &[
    HostRouter::rule_force_host_override,
    HostRouter::rule_app_host,
    HostRouter::rule_root_host,
];

impl HostRouter {
    pub fn new(
        app_host: impl Into<String>,
        login_path: impl Into<String>,
        production: bool,
    ) -> Self {
        Self {
            app_host: app_host.into(),
            login_path: login_path.into(),
            production,
        }
    }

    /// Classify a request into a routing decision.
    ///
    /// Pure: no I/O, no side effects, deterministic for identical inputs.
    /// A missing Host header degrades to the root application rather than
    /// failing the request.
    pub fn route(&self, ctx: &RoutingContext, is_authenticated: bool) -> RouterDecision {
        let effective_host = ctx
            .host_override
            .as_deref()
            .or(ctx.raw_host.as_deref())
            .map(normalize_host)
            .unwrap_or_default();

        let req = RouteRequest {
            effective_host,
            override_present: ctx.host_override.is_some(),
            path: ctx.path.clone(),
            query: ctx.query.clone(),
            authenticated: is_authenticated,
        };

        RULES
            .iter()
            .find_map(|rule| rule(self, &req))
            .unwrap_or_else(|| self.tenant_rewrite(&req))
    }

    /// Outside production, force an explicit `host` override parameter so
    /// subdomains can be simulated without DNS.
    fn rule_force_host_override(&self, req: &RouteRequest) -> Option<RouterDecision> {
        if self.production || req.override_present {
            return None;
        }

        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        if let Some(query) = &req.query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                pairs.append_pair(&key, &value);
            }
        }
        pairs.append_pair("host", &self.app_host);

        Some(RouterDecision::Redirect(format!(
            "{}?{}",
            req.path,
            pairs.finish()
        )))
    }

    /// The reserved application host: gate on authentication, then rewrite
    /// under `/app`.
    fn rule_app_host(&self, req: &RouteRequest) -> Option<RouterDecision> {
        if req.effective_host != self.app_host {
            return None;
        }

        if !req.authenticated && req.path != self.login_path {
            return Some(RouterDecision::Redirect(self.login_path.clone()));
        }
        if req.authenticated && req.path == self.login_path {
            return Some(RouterDecision::Redirect("/".to_string()));
        }

        let path = if req.path == "/" {
            "/app".to_string()
        } else {
            format!("/app{}", req.path)
        };
        Some(RouterDecision::Rewrite(RouteTarget::App { path }))
    }

    /// Empty or bare `www` host serves the root application.
    fn rule_root_host(&self, req: &RouteRequest) -> Option<RouterDecision> {
        if !req.effective_host.is_empty() && req.effective_host != "www" {
            return None;
        }
        Some(RouterDecision::Rewrite(RouteTarget::Root {
            path: format!("/home{}", req.path),
        }))
    }

    /// Total fallthrough: everything else is tenant content.
    fn tenant_rewrite(&self, req: &RouteRequest) -> RouterDecision {
        RouterDecision::Rewrite(RouteTarget::Tenant {
            domain: req.effective_host.clone(),
            path: format!("/{}{}", req.effective_host, req.path),
        })
    }
}

/// Normalize a Host header value: strip the port, lowercase.
fn normalize_host(host: &str) -> String {
    let host = host.split(':').next().unwrap_or(host);
    host.to_lowercase()
}
