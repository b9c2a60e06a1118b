use crate::core::error::{SimError, SimResult};
use crate::core::execution::{SimulationConfig, SimulationEngine};
use crate::core::report::SimulationReport;
use crate::core::types::{FacilityId, HistogramId, StoreId};
use crate::workload::config::FactoryConfig;
use crate::workload::generators::{MaterialReplacementGenerator, OrderGenerator};
use crate::workload::order::OrderRecord;
use log::info;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

pub const ORDER_DURATION_HISTOGRAM: &str = "Duration of orders in the system";

/// Resource handles of a label factory, shared by every process of one run
pub struct Factory {
    pub config: FactoryConfig,
    pub designer: StoreId,
    pub supervisor: StoreId,
    pub printers: Vec<FacilityId>,
    pub stampers: Vec<FacilityId>,
    pub plotters: Vec<FacilityId>,
    pub finishing_machines: Vec<FacilityId>,
    pub order_duration: HistogramId,
    completed: RefCell<Vec<OrderRecord>>,
}

impl Factory {
    /// Register the factory's resources with `sim` without starting any process.
    ///
    /// Registration order is the report order: the order histogram, the designer and
    /// supervisor pools, then printers, stampers, plotters and finishing machines.
    pub fn build(sim: &mut SimulationEngine, config: FactoryConfig) -> SimResult<Rc<Self>> {
        config.validate().map_err(SimError::Config)?;

        let layout = &config.order_histogram;
        let order_duration = sim.add_histogram(
            ORDER_DURATION_HISTOGRAM,
            layout.lower_bound,
            layout.bucket_width,
            layout.bucket_count,
        )?;
        let counts = &config.resources;
        let designer = sim.add_store("Designer", counts.designers)?;
        let supervisor = sim.add_store("Supervisor", counts.supervisors)?;
        let printers = sim.add_facilities("Printer", counts.printers);
        let stampers = sim.add_facilities("Stamper", counts.stampers);
        let plotters = sim.add_facilities("Plotter", counts.plotters);
        let finishing_machines = sim.add_facilities("Finishing machine", counts.finishing_machines);

        Ok(Rc::new(Self {
            config,
            designer,
            supervisor,
            printers,
            stampers,
            plotters,
            finishing_machines,
            order_duration,
            completed: RefCell::new(Vec::new()),
        }))
    }

    /// Build the factory and start the order generator and one material replacement
    /// generator per printer
    pub fn install(sim: &mut SimulationEngine, config: FactoryConfig) -> SimResult<Rc<Self>> {
        let factory = Self::build(sim, config)?;
        sim.spawn(Box::new(OrderGenerator::new(Rc::clone(&factory))));
        for &printer in &factory.printers {
            sim.spawn(Box::new(MaterialReplacementGenerator::new(
                Rc::clone(&factory),
                printer,
            )));
        }
        Ok(factory)
    }

    pub(crate) fn record_order(&self, record: OrderRecord) {
        if self.config.record_orders {
            self.completed.borrow_mut().push(record);
        }
    }

    /// Orders completed so far, empty unless order recording is enabled
    pub fn completed_orders(&self) -> Vec<OrderRecord> {
        self.completed.borrow().clone()
    }
}

/// Outcome of one factory run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryRun {
    pub report: SimulationReport,
    pub orders: Vec<OrderRecord>,
}

impl FactoryRun {
    pub fn orders_completed(&self) -> u64 {
        self.report
            .histogram(ORDER_DURATION_HISTOGRAM)
            .map_or(0, |h| h.summary.count)
    }

    pub fn mean_time_in_system(&self) -> Option<f64> {
        self.report
            .histogram(ORDER_DURATION_HISTOGRAM)
            .and_then(|h| h.summary.mean)
    }
}

/// Simulate the factory from time 0 for `config.days` days
pub fn run_factory(config: &FactoryConfig) -> SimResult<FactoryRun> {
    config.validate().map_err(SimError::Config)?;

    let mut window = SimulationConfig::new(0.0, config.horizon());
    if let Some(seed) = config.random_seed {
        window = window.with_seed(seed);
    }
    let mut sim = SimulationEngine::new(window)?;
    let factory = Factory::install(&mut sim, config.clone())?;
    info!(
        "label factory: {} printers, {} stampers, {} plotters, {} finishing machines, one order every {} h",
        factory.printers.len(),
        factory.stampers.len(),
        factory.plotters.len(),
        factory.finishing_machines.len(),
        config.hours_per_order
    );

    sim.run()?;
    Ok(FactoryRun {
        report: sim.report(),
        orders: factory.completed_orders(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registers_resources_in_report_order() {
        let mut sim = SimulationEngine::new(SimulationConfig::new(0.0, 10.0).with_seed(1)).unwrap();
        Factory::build(&mut sim, FactoryConfig::default()).unwrap();
        let report = sim.report();

        assert_eq!(report.histograms[0].name, ORDER_DURATION_HISTOGRAM);
        let stores: Vec<_> = report.stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stores, vec!["Designer", "Supervisor"]);
        assert_eq!(report.stores[0].capacity, 2);
        let facilities: Vec<_> = report.facilities.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            facilities,
            vec![
                "Printer 1",
                "Printer 2",
                "Printer 3",
                "Stamper 1",
                "Plotter 1",
                "Plotter 2",
                "Finishing machine 1",
                "Finishing machine 2",
            ]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut sim = SimulationEngine::new(SimulationConfig::new(0.0, 10.0)).unwrap();
        let config = FactoryConfig::new().with_hours_per_order(-1.0);
        assert!(matches!(Factory::build(&mut sim, config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_short_run_completes_orders() {
        let config = FactoryConfig::new()
            .with_days(30.0)
            .with_random_seed(Some(11))
            .with_order_recording(true);
        let run = run_factory(&config).unwrap();

        assert!(run.report.summary.stopped_at_horizon);
        assert_eq!(run.report.time, 30.0 * 24.0 * 60.0);
        assert!(run.orders_completed() > 0);
        assert_eq!(run.orders.len() as u64, run.orders_completed());
        assert!(run.mean_time_in_system().unwrap() > 0.0);
    }
}
