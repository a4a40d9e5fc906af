use glp_routing::{point::Point, routing::path_result::PathError};
use jiff::Timestamp;
use serde::Serialize;

use crate::problem::order::OrderIdx;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
    /// The route cannot be executed as planned
    Error,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FuelMarginTier {
    Normal,
    Alert,
    Critical,
    Emergency,
}

impl FuelMarginTier {
    pub fn from_remaining_fraction(remaining: f64, low_fuel_threshold: f64) -> Self {
        if remaining >= low_fuel_threshold {
            FuelMarginTier::Normal
        } else if remaining >= 0.10 {
            FuelMarginTier::Alert
        } else if remaining >= 0.05 {
            FuelMarginTier::Critical
        } else {
            FuelMarginTier::Emergency
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Fuel runs out on `segment`
    InsufficientFuel {
        segment: usize,
        required_gal: f64,
        available_gal: f64,
        shortfall_gal: f64,
    },
    LowFuelMargin {
        tier: FuelMarginTier,
        remaining_fraction: f64,
    },
    Overweight {
        weight_ton: f64,
        limit_ton: f64,
    },
    InvalidPoint {
        segment: usize,
        point: Point,
    },
    Unreachable {
        segment: usize,
        error: PathError,
    },
    DeadlineMissed {
        segment: usize,
        order: OrderIdx,
        arrival: Timestamp,
        deadline: Timestamp,
        /// The order was overdue before the route started
        already_overdue: bool,
    },
    LateUrgentDelivery {
        segment: usize,
        order: OrderIdx,
        priority: u32,
        stop_fraction: f64,
    },
    PriorityInversion {
        segment: usize,
        earlier_priority: u32,
        later_priority: u32,
    },
    LowQualityScore {
        score: f64,
        minimum: f64,
    },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationIssue::InsufficientFuel { .. }
            | ValidationIssue::Overweight { .. }
            | ValidationIssue::InvalidPoint { .. }
            | ValidationIssue::Unreachable { .. } => Severity::Error,
            ValidationIssue::DeadlineMissed {
                already_overdue, ..
            } => {
                if *already_overdue {
                    Severity::Critical
                } else {
                    Severity::Error
                }
            }
            ValidationIssue::LowFuelMargin { tier, .. } => match tier {
                FuelMarginTier::Normal => Severity::Info,
                FuelMarginTier::Alert => Severity::Warning,
                FuelMarginTier::Critical | FuelMarginTier::Emergency => Severity::Critical,
            },
            ValidationIssue::LateUrgentDelivery { .. }
            | ValidationIssue::PriorityInversion { .. }
            | ValidationIssue::LowQualityScore { .. } => Severity::Warning,
        }
    }
}

/// Weighted route quality in `[0, 1]`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityScore {
    pub fuel_margin: f64,
    pub capacity_utilization: f64,
    pub priority_ordering: f64,
    pub time_compliance: f64,
    pub accessibility: f64,
    pub total: f64,
}

impl QualityScore {
    pub fn new(
        fuel_margin: f64,
        capacity_utilization: f64,
        priority_ordering: f64,
        time_compliance: f64,
        accessibility: f64,
    ) -> Self {
        let clamp = |value: f64| value.clamp(0.0, 1.0);
        let (fuel_margin, capacity_utilization, priority_ordering, time_compliance, accessibility) = (
            clamp(fuel_margin),
            clamp(capacity_utilization),
            clamp(priority_ordering),
            clamp(time_compliance),
            clamp(accessibility),
        );

        QualityScore {
            fuel_margin,
            capacity_utilization,
            priority_ordering,
            time_compliance,
            accessibility,
            total: 0.30 * fuel_margin
                + 0.20 * capacity_utilization
                + 0.20 * priority_ordering
                + 0.20 * time_compliance
                + 0.10 * accessibility,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub quality: QualityScore,
    pub fuel_tier: FuelMarginTier,
    pub fuel_remaining_gal: f64,
    pub requires_intervention: bool,
}

impl ValidationResult {
    /// No hard failure. A feasible route may still need an operator when
    /// its quality is low.
    pub fn is_feasible(&self) -> bool {
        self.issues
            .iter()
            .all(|issue| issue.severity() < Severity::Error)
    }

    pub fn max_severity(&self) -> Severity {
        self.issues
            .iter()
            .map(ValidationIssue::severity)
            .max()
            .unwrap_or(Severity::Info)
    }

    pub fn hard_failures(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }
}
