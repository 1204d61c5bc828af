//! Simulation scenarios.

use serde::{Deserialize, Serialize};

use tokenkit_permission::PermissionUsage;

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// What to run.
    pub kind: ScenarioKind,
}

/// The workloads the simulator knows how to drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioKind {
    /// Register voters and candidates, let part of the voters cast their
    /// ballot, then interrupt.
    Poll {
        voters: usize,
        candidates: usize,
        turnout: f64,
    },
    /// Spread shares, delegate, and weigh shareholders under both modes.
    Shares {
        holders: usize,
        delegations: usize,
    },
    /// Dispatch passes and check access attempts.
    Permissions {
        users: usize,
        attempts: usize,
        usage: PermissionUsage,
    },
}

/// Sizing knobs shared by the predefined scenarios.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioSize {
    pub participants: usize,
    pub candidates: usize,
    pub turnout: f64,
}

impl Scenario {
    /// Names accepted by [`Scenario::load`].
    pub const NAMES: [&'static str; 5] = ["poll", "full-turnout", "shares", "door-pass", "tickets"];

    /// Load a scenario by name.
    pub fn load(name: &str, size: ScenarioSize) -> anyhow::Result<Self> {
        match name {
            "poll" => Ok(Self::poll(size)),
            "full-turnout" => Ok(Self::full_turnout(size)),
            "shares" => Ok(Self::shares(size)),
            "door-pass" => Ok(Self::permissions(size, PermissionUsage::Reusable)),
            "tickets" => Ok(Self::permissions(size, PermissionUsage::Consumed)),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (expected one of {})",
                name,
                Self::NAMES.join(", ")
            )),
        }
    }

    /// Every predefined scenario.
    pub fn all(size: ScenarioSize) -> anyhow::Result<Vec<Self>> {
        Self::NAMES.iter().map(|name| Self::load(name, size)).collect()
    }

    /// Partial turnout, stopped by the referee.
    fn poll(size: ScenarioSize) -> Self {
        Self {
            name: "poll".to_string(),
            description: format!(
                "{} voters, {} candidates, {:.0}% turnout then interrupt",
                size.participants,
                size.candidates,
                size.turnout * 100.0
            ),
            kind: ScenarioKind::Poll {
                voters: size.participants,
                candidates: size.candidates,
                turnout: size.turnout,
            },
        }
    }

    /// Every voter votes; the poll completes on its own.
    fn full_turnout(size: ScenarioSize) -> Self {
        Self {
            name: "full-turnout".to_string(),
            description: format!("{} voters, everyone votes", size.participants),
            kind: ScenarioKind::Poll {
                voters: size.participants,
                candidates: size.candidates,
                turnout: 1.0,
            },
        }
    }

    fn shares(size: ScenarioSize) -> Self {
        Self {
            name: "shares".to_string(),
            description: "Shareholder delegation walk-through".to_string(),
            kind: ScenarioKind::Shares {
                holders: size.participants.max(2),
                delegations: size.participants / 3,
            },
        }
    }

    fn permissions(size: ScenarioSize, usage: PermissionUsage) -> Self {
        Self {
            name: match usage {
                PermissionUsage::Consumed => "tickets",
                _ => "door-pass",
            }
            .to_string(),
            description: format!("{} permissions, {} users", usage, size.participants),
            kind: ScenarioKind::Permissions {
                users: size.participants,
                attempts: size.participants * 2,
                usage,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> ScenarioSize {
        ScenarioSize {
            participants: 12,
            candidates: 3,
            turnout: 0.7,
        }
    }

    #[test]
    fn test_load_all() {
        let scenarios = Scenario::all(size()).unwrap();
        assert_eq!(scenarios.len(), Scenario::NAMES.len());
        for (scenario, name) in scenarios.iter().zip(Scenario::NAMES) {
            assert_eq!(scenario.name, name);
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(Scenario::load("auction", size()).is_err());
    }
}
