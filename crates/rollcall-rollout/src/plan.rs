//! Restart plans: the ordered set of units to restart.

use std::collections::HashSet;

use rollcall_core::{PlanError, RestartConfig, Unit};

/// Ordered units plus execution settings.
///
/// The unit list cannot be changed after construction; the controller
/// consumes the plan when it executes it.
#[derive(Debug, Clone)]
pub struct RestartPlan {
    cluster_ref: String,
    units: Vec<Unit>,
    config: RestartConfig,
}

impl RestartPlan {
    /// Create a plan that restarts `units` in the given order.
    pub fn new(
        cluster_ref: &str,
        units: Vec<Unit>,
        config: RestartConfig,
    ) -> Result<Self, PlanError> {
        if units.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.id.as_str()) {
                return Err(PlanError::DuplicateUnit(unit.id.clone()));
            }
        }

        Ok(Self {
            cluster_ref: cluster_ref.to_string(),
            units,
            config,
        })
    }

    /// Build a plan from discovery results, optionally narrowed to a
    /// selection of unit ids or names.
    ///
    /// An empty selection keeps every discovered unit. Selected units keep
    /// discovery order, not selection order.
    pub fn from_discovery(
        cluster_ref: &str,
        discovered: Vec<Unit>,
        selected: &[String],
        config: RestartConfig,
    ) -> Result<Self, PlanError> {
        if selected.is_empty() {
            return Self::new(cluster_ref, discovered, config);
        }

        for wanted in selected {
            if !discovered.iter().any(|u| matches_selector(u, wanted)) {
                return Err(PlanError::UnknownUnit(wanted.clone()));
            }
        }

        let units = discovered
            .into_iter()
            .filter(|u| selected.iter().any(|s| matches_selector(u, s)))
            .collect();

        Self::new(cluster_ref, units, config)
    }

    pub fn cluster_ref(&self) -> &str {
        &self.cluster_ref
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn config(&self) -> &RestartConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn matches_selector(unit: &Unit, selector: &str) -> bool {
    unit.id == selector || unit.name.as_deref() == Some(selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::UnitStatus;

    fn unit(id: &str) -> Unit {
        Unit::new(format!("arn:svc/{id}"), "prod", UnitStatus::running("RUNNING")).with_name(id)
    }

    #[test]
    fn keeps_discovery_order() {
        let plan = RestartPlan::new(
            "prod",
            vec![unit("a"), unit("b"), unit("c")],
            RestartConfig::default(),
        )
        .unwrap();
        let names: Vec<_> = plan.units().iter().map(|u| u.display_name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.cluster_ref(), "prod");
    }

    #[test]
    fn rejects_empty() {
        let err = RestartPlan::new("prod", vec![], RestartConfig::default()).unwrap_err();
        assert_eq!(err, PlanError::Empty);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = RestartPlan::new("prod", vec![unit("a"), unit("a")], RestartConfig::default())
            .unwrap_err();
        assert_eq!(err, PlanError::DuplicateUnit("arn:svc/a".to_string()));
    }

    #[test]
    fn selection_by_name_or_id_keeps_discovery_order() {
        let selected = vec!["c".to_string(), "arn:svc/a".to_string()];
        let plan = RestartPlan::from_discovery(
            "prod",
            vec![unit("a"), unit("b"), unit("c")],
            &selected,
            RestartConfig::default(),
        )
        .unwrap();
        let names: Vec<_> = plan.units().iter().map(|u| u.display_name()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn selection_of_unknown_unit_fails() {
        let err = RestartPlan::from_discovery(
            "prod",
            vec![unit("a")],
            &["missing".to_string()],
            RestartConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, PlanError::UnknownUnit("missing".to_string()));
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let plan = RestartPlan::from_discovery(
            "prod",
            vec![unit("a"), unit("b")],
            &[],
            RestartConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
    }
}
