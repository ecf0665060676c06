//! Route registry: typed requirement metadata attached at registration time
//! and validated once at startup.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

/// Access requirements attached to a route.
///
/// Flags compose with AND semantics; an admin always passes a manager-only
/// requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequirement {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub requires_manager: bool,
}

impl RouteRequirement {
    pub const fn public() -> Self {
        Self {
            requires_auth: false,
            requires_admin: false,
            requires_manager: false,
        }
    }

    pub const fn authenticated() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            requires_manager: false,
        }
    }

    pub const fn manager() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            requires_manager: true,
        }
    }

    pub const fn admin() -> Self {
        Self {
            requires_auth: true,
            requires_admin: true,
            requires_manager: false,
        }
    }

    pub fn is_public(&self) -> bool {
        !self.requires_auth && !self.requires_admin && !self.requires_manager
    }
}

/// Symbolic destinations the access policy redirects to or treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Landmark {
    Login,
    Dashboard,
    Forms,
    AdminHome,
    AdminSetup,
    PasswordSetup,
}

impl Landmark {
    pub const ALL: [Landmark; 6] = [
        Landmark::Login,
        Landmark::Dashboard,
        Landmark::Forms,
        Landmark::AdminHome,
        Landmark::AdminSetup,
        Landmark::PasswordSetup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Landmark::Login => "login",
            Landmark::Dashboard => "dashboard",
            Landmark::Forms => "forms",
            Landmark::AdminHome => "admin",
            Landmark::AdminSetup => "admin/setup",
            Landmark::PasswordSetup => "password-setup",
        }
    }

    /// Destinations an admin may not reach while a password change is pending.
    pub fn is_restricted_onboarding_destination(&self) -> bool {
        matches!(self, Landmark::Dashboard | Landmark::Forms)
    }
}

impl core::fmt::Display for Landmark {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navigable route and its access metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDef {
    pub name: Cow<'static, str>,
    /// Path pattern; `:param` segments match any single segment.
    pub path: Cow<'static, str>,
    pub landmark: Option<Landmark>,
    pub requirement: RouteRequirement,
}

impl RouteDef {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
        requirement: RouteRequirement,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            landmark: None,
            requirement,
        }
    }

    pub fn landmark(mut self, landmark: Landmark) -> Self {
        self.landmark = Some(landmark);
        self
    }

    pub fn is(&self, landmark: Landmark) -> bool {
        self.landmark == Some(landmark)
    }

    fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(&self.path);
        let mut actual = segments(path);
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(a)) if p.starts_with(':') || p == a => {}
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip query string, fragment and trailing slashes.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = path[..end].trim_end_matches('/');
    if path.is_empty() { "/" } else { path }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route '{name}' has invalid path '{path}' (must start with '/')")]
    InvalidPath { name: String, path: String },

    #[error("duplicate route name '{0}'")]
    DuplicateName(String),

    #[error("duplicate route path '{0}'")]
    DuplicatePath(String),

    #[error("landmark '{0}' is registered more than once")]
    DuplicateLandmark(Landmark),

    #[error("landmark '{0}' is not registered")]
    MissingLandmark(Landmark),

    #[error("route '{name}' ({landmark}): {reason}")]
    ContradictoryRequirement {
        name: String,
        landmark: Landmark,
        reason: &'static str,
    },
}

/// Validated set of routes with landmark lookup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
    landmarks: HashMap<Landmark, usize>,
}

impl RouteTable {
    /// Validate and index route definitions.
    ///
    /// Every landmark must be registered once, and landmark requirements must
    /// not make a redirect target unreachable for the users redirected there.
    pub fn build(routes: Vec<RouteDef>) -> Result<Self, RouteTableError> {
        let mut names: HashSet<&str> = HashSet::new();
        let mut paths: HashSet<&str> = HashSet::new();
        let mut landmarks: HashMap<Landmark, usize> = HashMap::new();

        for (idx, route) in routes.iter().enumerate() {
            if !route.path.starts_with('/') {
                return Err(RouteTableError::InvalidPath {
                    name: route.name.to_string(),
                    path: route.path.to_string(),
                });
            }
            if !names.insert(route.name.as_ref()) {
                return Err(RouteTableError::DuplicateName(route.name.to_string()));
            }
            if !paths.insert(normalize_path(&route.path)) {
                return Err(RouteTableError::DuplicatePath(route.path.to_string()));
            }
            if let Some(landmark) = route.landmark {
                check_landmark_requirement(route, landmark)?;
                if landmarks.insert(landmark, idx).is_some() {
                    return Err(RouteTableError::DuplicateLandmark(landmark));
                }
            }
        }

        if let Some(missing) = Landmark::ALL.iter().find(|l| !landmarks.contains_key(*l)) {
            return Err(RouteTableError::MissingLandmark(*missing));
        }

        Ok(Self { routes, landmarks })
    }

    /// Routes of the onboarding application.
    pub fn onboarding_default() -> Self {
        let routes = vec![
            RouteDef::new("home", "/", RouteRequirement::public()),
            RouteDef::new("login", "/login", RouteRequirement::public()).landmark(Landmark::Login),
            RouteDef::new("dashboard", "/dashboard", RouteRequirement::authenticated())
                .landmark(Landmark::Dashboard),
            RouteDef::new("forms", "/forms", RouteRequirement::authenticated())
                .landmark(Landmark::Forms),
            RouteDef::new("form-detail", "/forms/:id", RouteRequirement::authenticated()),
            RouteDef::new("profile", "/profile", RouteRequirement::authenticated()),
            RouteDef::new("password-setup", "/password-setup", RouteRequirement::authenticated())
                .landmark(Landmark::PasswordSetup),
            RouteDef::new("manager-reports", "/manager/reports", RouteRequirement::manager()),
            RouteDef::new("admin", "/admin", RouteRequirement::admin()).landmark(Landmark::AdminHome),
            RouteDef::new("admin-setup", "/admin/setup", RouteRequirement::admin())
                .landmark(Landmark::AdminSetup),
            RouteDef::new("settings", "/admin/settings", RouteRequirement::admin()),
            RouteDef::new("users", "/admin/users", RouteRequirement::admin()),
        ];

        Self::build(routes).expect("built-in route table is valid")
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    pub fn landmark(&self, landmark: Landmark) -> &RouteDef {
        // `build` guarantees every landmark is present.
        &self.routes[self.landmarks[&landmark]]
    }

    pub fn find(&self, path: &str) -> Option<&RouteDef> {
        let path = normalize_path(path);
        self.routes
            .iter()
            .find(|r| normalize_path(&r.path) == path)
            .or_else(|| self.routes.iter().find(|r| r.matches(path)))
    }

    /// Route for `path`, or the dashboard when nothing matches.
    pub fn resolve(&self, path: &str) -> &RouteDef {
        self.find(path)
            .unwrap_or_else(|| self.landmark(Landmark::Dashboard))
    }
}

fn check_landmark_requirement(route: &RouteDef, landmark: Landmark) -> Result<(), RouteTableError> {
    let req = route.requirement;
    let reason = match landmark {
        Landmark::Login if !req.is_public() => Some("login must not carry requirements"),
        Landmark::Dashboard if req.requires_admin || req.requires_manager => {
            Some("dashboard is the non-admin fallback and must not require manager or admin")
        }
        Landmark::PasswordSetup | Landmark::AdminSetup if req.requires_manager => {
            Some("onboarding destinations must not require manager access")
        }
        _ => None,
    };

    match reason {
        Some(reason) => Err(RouteTableError::ContradictoryRequirement {
            name: route.name.to_string(),
            landmark,
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks_only() -> Vec<RouteDef> {
        vec![
            RouteDef::new("login", "/login", RouteRequirement::public()).landmark(Landmark::Login),
            RouteDef::new("dashboard", "/dashboard", RouteRequirement::authenticated())
                .landmark(Landmark::Dashboard),
            RouteDef::new("forms", "/forms", RouteRequirement::authenticated())
                .landmark(Landmark::Forms),
            RouteDef::new("admin", "/admin", RouteRequirement::admin()).landmark(Landmark::AdminHome),
            RouteDef::new("admin-setup", "/admin/setup", RouteRequirement::admin())
                .landmark(Landmark::AdminSetup),
            RouteDef::new("password-setup", "/password-setup", RouteRequirement::authenticated())
                .landmark(Landmark::PasswordSetup),
        ]
    }

    #[test]
    fn default_table_is_valid() {
        let table = RouteTable::onboarding_default();
        for landmark in Landmark::ALL {
            assert!(table.landmark(landmark).is(landmark));
        }
    }

    #[test]
    fn minimal_table_builds() {
        assert!(RouteTable::build(landmarks_only()).is_ok());
    }

    #[test]
    fn missing_landmark_is_rejected() {
        let mut routes = landmarks_only();
        routes.retain(|r| !r.is(Landmark::Forms));
        assert_eq!(
            RouteTable::build(routes).unwrap_err(),
            RouteTableError::MissingLandmark(Landmark::Forms)
        );
    }

    #[test]
    fn duplicate_paths_are_rejected_after_normalization() {
        let mut routes = landmarks_only();
        routes.push(RouteDef::new("dash-again", "/dashboard/", RouteRequirement::public()));
        assert!(matches!(
            RouteTable::build(routes),
            Err(RouteTableError::DuplicatePath(_))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut routes = landmarks_only();
        routes.push(RouteDef::new("login", "/signin", RouteRequirement::public()));
        assert_eq!(
            RouteTable::build(routes).unwrap_err(),
            RouteTableError::DuplicateName("login".into())
        );
    }

    #[test]
    fn relative_paths_are_rejected() {
        let mut routes = landmarks_only();
        routes.push(RouteDef::new("broken", "reports", RouteRequirement::public()));
        assert!(matches!(
            RouteTable::build(routes),
            Err(RouteTableError::InvalidPath { .. })
        ));
    }

    #[test]
    fn guarded_login_is_contradictory() {
        let mut routes = landmarks_only();
        routes[0].requirement = RouteRequirement::authenticated();
        assert!(matches!(
            RouteTable::build(routes),
            Err(RouteTableError::ContradictoryRequirement { landmark: Landmark::Login, .. })
        ));
    }

    #[test]
    fn manager_only_dashboard_is_contradictory() {
        let mut routes = landmarks_only();
        routes[1].requirement = RouteRequirement::manager();
        assert!(matches!(
            RouteTable::build(routes),
            Err(RouteTableError::ContradictoryRequirement { landmark: Landmark::Dashboard, .. })
        ));
    }

    #[test]
    fn lookup_normalizes_and_matches_params() {
        let table = RouteTable::onboarding_default();
        assert_eq!(table.find("/admin/settings/").unwrap().name, "settings");
        assert_eq!(table.find("/login?next=/forms").unwrap().name, "login");
        assert_eq!(table.find("/forms/42").unwrap().name, "form-detail");
        assert_eq!(table.find("/forms").unwrap().name, "forms");
        assert_eq!(table.find("/").unwrap().name, "home");
        assert!(table.find("/nowhere").is_none());
    }

    #[test]
    fn unknown_paths_fall_back_to_dashboard() {
        let table = RouteTable::onboarding_default();
        assert!(table.resolve("/nowhere").is(Landmark::Dashboard));
    }

    #[test]
    fn normalize_strips_query_fragment_and_slash() {
        assert_eq!(normalize_path("/a/b/?x=1#top"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }
}
