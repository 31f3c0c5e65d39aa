//! Static catalog of emergency-response protocols.

use serde::{Deserialize, Serialize};

use crate::audit::LogSeverity;
use crate::state::OverallStatus;

/// Protocol severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Overall system status while a protocol of this severity is active.
    pub fn overall_status(&self) -> OverallStatus {
        match self {
            Severity::Low => OverallStatus::Degraded,
            Severity::Medium => OverallStatus::Maintenance,
            Severity::High => OverallStatus::Emergency,
            Severity::Critical => OverallStatus::Offline,
        }
    }

    /// Audit log severity for the execution entry.
    pub fn log_severity(&self) -> LogSeverity {
        match self {
            Severity::Critical => LogSeverity::Error,
            Severity::High => LogSeverity::Warning,
            _ => LogSeverity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// A named emergency-response template: a severity plus the fixed set of
/// components it takes offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    /// Component ids disabled on execution. The critical protocol disables
    /// everything regardless of this set.
    pub disabled_components: &'static [&'static str],
}

impl Protocol {
    /// Whether executing this protocol takes the given component offline.
    pub fn disables(&self, component_id: &str) -> bool {
        self.severity == Severity::Critical
            || self.disabled_components.contains(&component_id)
    }
}

/// Predefined protocols, ascending severity.
pub const CATALOG: &[Protocol] = &[
    Protocol {
        id: "soft-restart",
        name: "Soft Restart",
        severity: Severity::Low,
        disabled_components: &[],
    },
    Protocol {
        id: "maintenance-mode",
        name: "Maintenance Mode",
        severity: Severity::Medium,
        disabled_components: &["vr", "users", "mining"],
    },
    Protocol {
        id: "temporary-lockdown",
        name: "Temporary Lockdown",
        severity: Severity::Medium,
        disabled_components: &["wallet", "mining"],
    },
    Protocol {
        id: "security-alert",
        name: "Security Alert",
        severity: Severity::High,
        disabled_components: &["vr", "users"],
    },
    Protocol {
        id: "emergency-shutdown",
        name: "Emergency Shutdown",
        severity: Severity::Critical,
        disabled_components: &[
            "database",
            "api",
            "users",
            "vr",
            "wallet",
            "mining",
            "notifications",
            "analytics",
        ],
    },
];

/// Look up a protocol by id.
pub fn lookup(id: &str) -> Option<&'static Protocol> {
    CATALOG.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component;

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<&str> = CATALOG.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn test_catalog_ascending_severity() {
        for pair in CATALOG.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
    }

    #[test]
    fn test_emergency_shutdown_is_sole_critical() {
        let critical: Vec<&Protocol> = CATALOG
            .iter()
            .filter(|p| p.severity == Severity::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "emergency-shutdown");
    }

    #[test]
    fn test_critical_disables_every_component() {
        let shutdown = lookup("emergency-shutdown").unwrap();
        for c in component::registry() {
            assert!(shutdown.disables(c.id));
        }
    }

    #[test]
    fn test_disabled_sets_reference_registered_components() {
        for protocol in CATALOG {
            for id in protocol.disabled_components {
                assert!(
                    component::lookup(id).is_some(),
                    "{} disables unknown component {}",
                    protocol.id,
                    id
                );
            }
        }
    }

    #[test]
    fn test_severity_status_mapping() {
        assert_eq!(Severity::Low.overall_status(), OverallStatus::Degraded);
        assert_eq!(Severity::Medium.overall_status(), OverallStatus::Maintenance);
        assert_eq!(Severity::High.overall_status(), OverallStatus::Emergency);
        assert_eq!(Severity::Critical.overall_status(), OverallStatus::Offline);
    }

    #[test]
    fn test_severity_log_mapping() {
        assert_eq!(Severity::Critical.log_severity(), LogSeverity::Error);
        assert_eq!(Severity::High.log_severity(), LogSeverity::Warning);
        assert_eq!(Severity::Medium.log_severity(), LogSeverity::Info);
        assert_eq!(Severity::Low.log_severity(), LogSeverity::Info);
    }

    #[test]
    fn test_lookup_unknown_protocol() {
        assert!(lookup("panic-button").is_none());
    }
}
