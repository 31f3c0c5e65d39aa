//! Static catalog of platform subsystems.
//!
//! The registry order is canonical: progressive recovery restores components
//! front to back, so the slice below is the single source of ordering truth.

use std::collections::HashMap;

/// A named logical subsystem of the platform.
///
/// The control plane only tracks whether a component is logically active;
/// actual process management is the component manager's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Unique identifier, used as the key in `SystemState::component_status`.
    pub id: &'static str,
    /// Human-readable name for status displays.
    pub display_name: &'static str,
    /// Activity state after a reset.
    pub default_active: bool,
}

/// All registered components, in canonical registry order.
pub const REGISTRY: &[Component] = &[
    Component {
        id: "database",
        display_name: "Database Cluster",
        default_active: true,
    },
    Component {
        id: "api",
        display_name: "Public API",
        default_active: true,
    },
    Component {
        id: "users",
        display_name: "User Accounts",
        default_active: true,
    },
    Component {
        id: "vr",
        display_name: "VR World",
        default_active: true,
    },
    Component {
        id: "wallet",
        display_name: "Wallet Service",
        default_active: true,
    },
    Component {
        id: "mining",
        display_name: "Mining Rigs",
        default_active: true,
    },
    Component {
        id: "notifications",
        display_name: "Notifications",
        default_active: true,
    },
    Component {
        id: "analytics",
        display_name: "Analytics Pipeline",
        default_active: true,
    },
];

/// Registered components in canonical order.
pub fn registry() -> &'static [Component] {
    REGISTRY
}

/// Look up a component by id.
pub fn lookup(id: &str) -> Option<&'static Component> {
    REGISTRY.iter().find(|c| c.id == id)
}

/// Build the default component status map: one entry per registered
/// component, each at its default activity.
pub fn default_component_status() -> HashMap<String, bool> {
    REGISTRY
        .iter()
        .map(|c| (c.id.to_string(), c.default_active))
        .collect()
}
