//! Role to capability resolution for the admin surface.
//!
//! Three built-in roles exist (`administrator`, `editor`, `support`). An
//! optional override table may replace a role's capability struct wholesale
//! at process start. Unknown roles resolve to the most restrictive built-in
//! struct rather than failing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Admin principal role carried in the session descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Editor,
    Support,
    /// Anything the directory hands us that we do not recognize. Resolves to
    /// the most restrictive capability set, never to "no restrictions".
    Unknown(String),
}

impl Role {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "administrator" => Self::Administrator,
            "editor" => Self::Editor,
            "support" => Self::Support,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Administrator => "administrator",
            Self::Editor => "editor",
            Self::Support => "support",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// One boolean per admin capability. Missing fields in an override table
/// deserialize to `false`; an override replaces the whole struct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub content_management: bool,
    pub user_management: bool,
    pub analytics: bool,
    pub system_settings: bool,
    pub contact_handling: bool,
    pub category_management: bool,
}

impl Capabilities {
    const ALL: Self = Self {
        content_management: true,
        user_management: true,
        analytics: true,
        system_settings: true,
        contact_handling: true,
        category_management: true,
    };

    const NONE: Self = Self {
        content_management: false,
        user_management: false,
        analytics: false,
        system_settings: false,
        contact_handling: false,
        category_management: false,
    };

    #[must_use]
    pub const fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ContentManagement => self.content_management,
            Capability::UserManagement => self.user_management,
            Capability::Analytics => self.analytics,
            Capability::SystemSettings => self.system_settings,
            Capability::ContactHandling => self.contact_handling,
            Capability::CategoryManagement => self.category_management,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    ContentManagement,
    UserManagement,
    Analytics,
    SystemSettings,
    ContactHandling,
    CategoryManagement,
}

/// Admin sections derived from capabilities, in the order the sidebar
/// renders them. `Overview` is always first and unconditional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Overview,
    Posts,
    Videos,
    Categories,
    Media,
    Comments,
    Users,
    Analytics,
    Settings,
}

impl Section {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Posts => "posts",
            Self::Videos => "videos",
            Self::Categories => "categories",
            Self::Media => "media",
            Self::Comments => "comments",
            Self::Users => "users",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
        }
    }
}

pub struct RolePermissionResolver {
    overrides: HashMap<Role, Capabilities>,
}

impl RolePermissionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Parse an override table from JSON, keyed by role name. A present
    /// entry fully replaces the built-in struct for that role (not a merge);
    /// fields left out of the JSON become `false`.
    ///
    /// # Errors
    /// Returns an error if the JSON is not a map of role names to capability
    /// objects.
    pub fn from_overrides_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Capabilities> =
            serde_json::from_str(json).context("invalid role override table")?;
        let overrides = raw
            .into_iter()
            .map(|(name, caps)| (Role::parse(&name), caps))
            .collect();
        Ok(Self { overrides })
    }

    /// Resolve a role to its capability struct.
    ///
    /// Unknown roles get the most restrictive built-in struct (support).
    /// This is a deliberate fail-closed default; it never panics.
    #[must_use]
    pub fn capabilities(&self, role: &Role) -> Capabilities {
        if let Some(caps) = self.overrides.get(role) {
            return *caps;
        }
        match role {
            Role::Administrator => Capabilities::ALL,
            Role::Editor => Capabilities {
                content_management: true,
                category_management: true,
                contact_handling: true,
                analytics: true,
                ..Capabilities::NONE
            },
            // Support is the most restrictive built-in role. Unknown roles
            // collapse onto it via the lookup below.
            Role::Support => Capabilities::NONE,
            Role::Unknown(_) => self.capabilities(&Role::Support),
        }
    }

    #[must_use]
    pub fn has_permission(&self, role: &Role, capability: Capability) -> bool {
        self.capabilities(role).allows(capability)
    }

    /// Sections visible to the role, in fixed, stable order.
    #[must_use]
    pub fn accessible_sections(&self, role: &Role) -> Vec<Section> {
        let caps = self.capabilities(role);
        let mut sections = vec![Section::Overview];
        if caps.content_management {
            sections.push(Section::Posts);
            sections.push(Section::Videos);
        }
        if caps.category_management {
            sections.push(Section::Categories);
        }
        if caps.content_management {
            sections.push(Section::Media);
        }
        if caps.contact_handling {
            sections.push(Section::Comments);
        }
        if caps.user_management {
            sections.push(Section::Users);
        }
        if caps.analytics {
            sections.push(Section::Analytics);
        }
        if caps.system_settings {
            sections.push(Section::Settings);
        }
        sections
    }
}

impl Default for RolePermissionResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" Administrator "), Role::Administrator);
        assert_eq!(Role::parse("EDITOR"), Role::Editor);
        assert_eq!(
            Role::parse("intern"),
            Role::Unknown("intern".to_string())
        );
    }

    #[test]
    fn administrator_has_every_capability() {
        let resolver = RolePermissionResolver::new();
        for capability in [
            Capability::ContentManagement,
            Capability::UserManagement,
            Capability::Analytics,
            Capability::SystemSettings,
            Capability::ContactHandling,
            Capability::CategoryManagement,
        ] {
            assert!(resolver.has_permission(&Role::Administrator, capability));
        }
    }

    #[test]
    fn unknown_role_has_no_permissions() {
        let resolver = RolePermissionResolver::new();
        let role = Role::Unknown("superuser".to_string());
        for capability in [
            Capability::ContentManagement,
            Capability::UserManagement,
            Capability::Analytics,
            Capability::SystemSettings,
            Capability::ContactHandling,
            Capability::CategoryManagement,
        ] {
            assert!(!resolver.has_permission(&role, capability));
        }
    }

    #[test]
    fn editor_manages_content_but_not_users() {
        let resolver = RolePermissionResolver::new();
        assert!(resolver.has_permission(&Role::Editor, Capability::ContentManagement));
        assert!(resolver.has_permission(&Role::Editor, Capability::CategoryManagement));
        assert!(!resolver.has_permission(&Role::Editor, Capability::UserManagement));
        assert!(!resolver.has_permission(&Role::Editor, Capability::SystemSettings));
    }

    #[test]
    fn override_replaces_whole_struct_not_a_merge() -> Result<()> {
        // Editor normally has content management; an override granting only
        // analytics must drop it, because overrides replace, never merge.
        let resolver =
            RolePermissionResolver::from_overrides_json(r#"{"editor": {"analytics": true}}"#)?;
        assert!(resolver.has_permission(&Role::Editor, Capability::Analytics));
        assert!(!resolver.has_permission(&Role::Editor, Capability::ContentManagement));
        assert!(!resolver.has_permission(&Role::Editor, Capability::CategoryManagement));
        Ok(())
    }

    #[test]
    fn override_table_rejects_malformed_json() {
        assert!(RolePermissionResolver::from_overrides_json("[1,2,3]").is_err());
        assert!(RolePermissionResolver::from_overrides_json("not json").is_err());
    }

    #[test]
    fn sections_start_with_overview_and_follow_capabilities() {
        let resolver = RolePermissionResolver::new();

        let sections = resolver.accessible_sections(&Role::Administrator);
        assert_eq!(sections.first(), Some(&Section::Overview));
        assert_eq!(sections.len(), 9);

        let sections = resolver.accessible_sections(&Role::Editor);
        assert_eq!(
            sections,
            vec![
                Section::Overview,
                Section::Posts,
                Section::Videos,
                Section::Categories,
                Section::Media,
                Section::Comments,
                Section::Analytics,
            ]
        );

        // Support and unknown roles still see the overview.
        assert_eq!(
            resolver.accessible_sections(&Role::Support),
            vec![Section::Overview]
        );
        assert_eq!(
            resolver.accessible_sections(&Role::Unknown("ghost".to_string())),
            vec![Section::Overview]
        );
    }

    #[test]
    fn role_serde_round_trip() -> Result<()> {
        let value = serde_json::to_value(Role::Editor)?;
        assert_eq!(value, serde_json::json!("editor"));
        let role: Role = serde_json::from_value(serde_json::json!("support"))?;
        assert_eq!(role, Role::Support);
        let role: Role = serde_json::from_value(serde_json::json!("wizard"))?;
        assert_eq!(role, Role::Unknown("wizard".to_string()));
        Ok(())
    }
}
