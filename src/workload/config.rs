use crate::core::types::{Priority, SimTime};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_HOUR: f64 = 60.0;
pub const MINUTES_PER_DAY: f64 = 24.0 * MINUTES_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCounts {
    pub supervisors: usize,
    pub designers: usize,
    pub printers: usize,
    pub stampers: usize,
    pub plotters: usize,
    pub finishing_machines: usize,
}

impl Default for ResourceCounts {
    fn default() -> Self {
        Self {
            supervisors: 1,
            designers: 2,
            printers: 3,
            stampers: 1,
            plotters: 2,
            finishing_machines: 2,
        }
    }
}

/// Share of orders printed on a material and the mean print time on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialShare {
    pub share: f64,
    pub print_mean: f64,
}

/// Stage durations in minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimes {
    pub design_mean: f64,
    pub adjustment_mean: f64,
    pub printer_setup_mean: f64,
    pub approval_check_mean: f64,
    pub rework_mean: f64,
    pub materials: Vec<MaterialShare>,
    pub stamper_setup: f64,
    pub stamping_min: f64,
    pub stamping_max: f64,
    pub plotter_setup_min: f64,
    pub plotter_setup_max: f64,
    pub cutting_mean: f64,
    pub finishing_min: f64,
    pub finishing_max: f64,
    /// Cutting and finishing take this many times longer for stamped orders
    pub stamped_slowdown: f64,
}

impl Default for StageTimes {
    fn default() -> Self {
        Self {
            design_mean: 7.0 * MINUTES_PER_HOUR,
            adjustment_mean: 3.0 * MINUTES_PER_HOUR,
            printer_setup_mean: 30.0,
            approval_check_mean: 2.0,
            rework_mean: 10.0,
            materials: vec![
                MaterialShare { share: 0.3, print_mean: 10.0 },
                MaterialShare { share: 0.6, print_mean: 15.0 },
                MaterialShare { share: 0.1, print_mean: 30.0 },
            ],
            stamper_setup: 45.0,
            stamping_min: 3.0 * MINUTES_PER_HOUR,
            stamping_max: 4.0 * MINUTES_PER_HOUR,
            plotter_setup_min: 10.0,
            plotter_setup_max: 15.0,
            cutting_mean: 30.0,
            finishing_min: 6.0,
            finishing_max: 11.0,
            stamped_slowdown: 3.0,
        }
    }
}

/// Branching probabilities of the order life cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probabilities {
    /// Orders that need a design of their own
    pub custom_design: f64,
    /// A finished design is thrown away and redone while the draw is below this
    pub complete_redesign: f64,
    /// Draws in `[complete_redesign, adjustment_threshold)` need an adjustment round
    pub adjustment_threshold: f64,
    /// Sample prints rejected by the supervisor
    pub approval_rejection: f64,
    pub stamping: f64,
}

impl Default for Probabilities {
    fn default() -> Self {
        Self {
            custom_design: 0.15,
            complete_redesign: 0.05,
            adjustment_threshold: 0.95,
            approval_rejection: 0.15,
            stamping: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialReplacementConfig {
    pub interval_mean: f64,
    pub duration: f64,
    pub priority: Priority,
}

impl Default for MaterialReplacementConfig {
    fn default() -> Self {
        Self {
            interval_mean: 5.0 * MINUTES_PER_HOUR,
            duration: 10.0,
            priority: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramLayout {
    pub lower_bound: f64,
    pub bucket_width: f64,
    pub bucket_count: usize,
}

impl Default for HistogramLayout {
    fn default() -> Self {
        Self {
            lower_bound: 0.0,
            bucket_width: 60.0,
            bucket_count: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub days: f64,
    pub hours_per_order: f64,
    pub resources: ResourceCounts,
    pub stage_times: StageTimes,
    pub probabilities: Probabilities,
    pub material_replacement: MaterialReplacementConfig,
    pub order_histogram: HistogramLayout,
    pub random_seed: Option<u64>,
    /// Keep the timings of every completed order
    pub record_orders: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            days: 3650.0,
            hours_per_order: 5.0,
            resources: ResourceCounts::default(),
            stage_times: StageTimes::default(),
            probabilities: Probabilities::default(),
            material_replacement: MaterialReplacementConfig::default(),
            order_histogram: HistogramLayout::default(),
            random_seed: Some(42),
            record_orders: false,
        }
    }
}

impl FactoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_days(mut self, days: f64) -> Self {
        self.days = days;
        self
    }

    pub fn with_hours_per_order(mut self, hours: f64) -> Self {
        self.hours_per_order = hours;
        self
    }

    pub fn with_random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_resources(mut self, resources: ResourceCounts) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_probabilities(mut self, probabilities: Probabilities) -> Self {
        self.probabilities = probabilities;
        self
    }

    pub fn with_order_recording(mut self, enabled: bool) -> Self {
        self.record_orders = enabled;
        self
    }

    /// Simulation horizon in minutes
    pub fn horizon(&self) -> SimTime {
        self.days * MINUTES_PER_DAY
    }

    /// Mean time between orders in minutes
    pub fn order_interval_mean(&self) -> f64 {
        self.hours_per_order * MINUTES_PER_HOUR
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.days > 0.0) || !self.days.is_finite() {
            return Err("Simulation must last a positive number of days".to_string());
        }
        if !(self.hours_per_order > 0.0) {
            return Err("Order interval must be greater than 0".to_string());
        }

        let r = &self.resources;
        if r.supervisors == 0 || r.designers == 0 {
            return Err("Staff pools must have at least one member".to_string());
        }
        if r.printers == 0 || r.stampers == 0 || r.plotters == 0 || r.finishing_machines == 0 {
            return Err("Every machine kind needs at least one machine".to_string());
        }

        let t = &self.stage_times;
        let means = [
            t.design_mean,
            t.adjustment_mean,
            t.printer_setup_mean,
            t.approval_check_mean,
            t.rework_mean,
            t.cutting_mean,
        ];
        if means.iter().any(|m| !(*m > 0.0)) {
            return Err("Exponential stage means must be greater than 0".to_string());
        }
        if t.stamper_setup < 0.0
            || t.stamping_min < 0.0
            || t.stamping_min > t.stamping_max
            || t.plotter_setup_min < 0.0
            || t.plotter_setup_min > t.plotter_setup_max
            || t.finishing_min < 0.0
            || t.finishing_min > t.finishing_max
        {
            return Err("Uniform stage bounds must be non-negative and ordered".to_string());
        }
        if !(t.stamped_slowdown > 0.0) {
            return Err("Stamped slowdown must be greater than 0".to_string());
        }
        if t.materials.is_empty() {
            return Err("At least one material is required".to_string());
        }
        if t.materials.iter().any(|m| m.share < 0.0 || !(m.print_mean > 0.0)) {
            return Err("Material shares must be non-negative with positive print times".to_string());
        }
        let total_share: f64 = t.materials.iter().map(|m| m.share).sum();
        if (total_share - 1.0).abs() > 1e-9 {
            return Err(format!("Material shares must add up to 1, got {}", total_share));
        }

        let p = &self.probabilities;
        let all = [
            p.custom_design,
            p.complete_redesign,
            p.adjustment_threshold,
            p.approval_rejection,
            p.stamping,
        ];
        if all.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err("Probabilities must lie in [0, 1]".to_string());
        }
        if p.complete_redesign >= 1.0 || p.approval_rejection >= 1.0 {
            return Err("Redesign and rejection loops must be able to end".to_string());
        }
        if p.adjustment_threshold < p.complete_redesign {
            return Err("Adjustment threshold cannot be below the redesign probability".to_string());
        }

        let m = &self.material_replacement;
        if !(m.interval_mean > 0.0) || m.duration < 0.0 {
            return Err("Material replacement needs a positive interval and a non-negative duration".to_string());
        }

        let h = &self.order_histogram;
        if !(h.bucket_width > 0.0) || h.bucket_count == 0 {
            return Err("Order histogram needs a positive bucket width and at least one bucket".to_string());
        }

        Ok(())
    }
}
