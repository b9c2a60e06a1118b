use crate::core::error::{SimError, SimResult};
use crate::core::process::{Action, Process, ProcessContext};
use crate::core::types::{FacilityId, SimTime};
use crate::workload::factory::Factory;
use crate::workload::selection::shortest_queue;
use log::debug;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Timings of one completed order, in minutes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub arrival: SimTime,
    pub completion: SimTime,
    pub custom_design: bool,
    pub stamped: bool,
    /// Number of designs drawn, redesigns included
    pub design_rounds: u32,
    /// Number of sample prints shown to the supervisor
    pub approval_rounds: u32,
    pub designer_wait: f64,
    pub designing: f64,
    pub printer_wait: f64,
    /// Setup, approval and printing on the printer
    pub printing: f64,
    pub supervisor_wait: f64,
    /// From the end of the printer setup until the sample is approved
    pub approval: f64,
    pub stamper_wait: f64,
    pub stamping: f64,
    pub plotter_wait: f64,
    pub cutting: f64,
    pub finishing_wait: f64,
    pub finishing: f64,
}

impl OrderRecord {
    pub fn time_in_system(&self) -> f64 {
        self.completion - self.arrival
    }
}

/// Where an order continues the next time it is resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Arrived,
    DesignerAssigned,
    DesignDrawn,
    Adjusted,
    DesignerFreed,
    RequestPrinter,
    PrinterAssigned,
    PrinterReady,
    RequestSupervisor,
    SupervisorAssigned,
    SampleChecked,
    Verdict,
    Reworked,
    Printed,
    PrinterFreed,
    RequestStamper,
    StamperAssigned,
    Stamped,
    StamperFreed,
    RequestPlotter,
    PlotterAssigned,
    PlotterReady,
    Cut,
    PlotterFreed,
    RequestFinisher,
    FinisherAssigned,
    Finished,
    FinisherFreed,
    Done,
}

/// One customer order travelling through design, printing, optional stamping, cutting
/// and finishing.
pub struct Order {
    factory: Rc<Factory>,
    stage: Stage,
    record: OrderRecord,
    /// When the current stage started waiting for its resource
    stage_entry: SimTime,
    approval_entry: SimTime,
    supervisor_request: SimTime,
    machine: Option<FacilityId>,
}

impl Order {
    pub fn new(factory: Rc<Factory>) -> Self {
        Self {
            factory,
            stage: Stage::Arrived,
            record: OrderRecord::default(),
            stage_entry: 0.0,
            approval_entry: 0.0,
            supervisor_request: 0.0,
            machine: None,
        }
    }

    fn seize_shortest(&mut self, ctx: &ProcessContext<'_>, machines: &[FacilityId], next: Stage) -> SimResult<Action> {
        let machine = shortest_queue(ctx, machines)?;
        self.stage_entry = ctx.now();
        self.machine = Some(machine);
        self.stage = next;
        Ok(Action::Seize(machine))
    }

    fn release(&mut self, next: Stage) -> SimResult<Action> {
        let machine = self
            .machine
            .take()
            .ok_or_else(|| SimError::Config("order holds no machine".to_string()))?;
        self.stage = next;
        Ok(Action::Release(machine))
    }

    /// Cutting and finishing are slower on stamped labels
    fn slowdown(&self) -> f64 {
        if self.record.stamped {
            self.factory.config.stage_times.stamped_slowdown
        } else {
            1.0
        }
    }

    fn print_mean(&self, draw: f64) -> f64 {
        let materials = &self.factory.config.stage_times.materials;
        let mut cumulative = 0.0;
        for material in materials {
            cumulative += material.share;
            if draw < cumulative {
                return material.print_mean;
            }
        }
        materials.last().map_or(0.0, |m| m.print_mean)
    }

    fn complete(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<()> {
        let now = ctx.now();
        self.record.completion = now;
        ctx.record(self.factory.order_duration, self.record.time_in_system())?;

        let r = &self.record;
        debug!(
            "order {} done after {:.2} min: design {:.2} (wait {:.2}), print {:.2} (wait {:.2}), \
             approval {:.2} (wait {:.2}), stamp {:.2} (wait {:.2}), cut {:.2} (wait {:.2}), \
             finish {:.2} (wait {:.2})",
            ctx.id(),
            r.time_in_system(),
            r.designing,
            r.designer_wait,
            r.printing,
            r.printer_wait,
            r.approval,
            r.supervisor_wait,
            r.stamping,
            r.stamper_wait,
            r.cutting,
            r.plotter_wait,
            r.finishing,
            r.finishing_wait
        );
        self.factory.record_order(self.record.clone());
        Ok(())
    }
}

impl Process for Order {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<Action> {
        let factory = Rc::clone(&self.factory);
        let config = &factory.config;
        let times = &config.stage_times;
        let odds = &config.probabilities;

        loop {
            let now = ctx.now();
            match self.stage {
                // ---- design ----
                Stage::Arrived => {
                    self.record.arrival = now;
                    if ctx.uniform01() < odds.custom_design {
                        self.record.custom_design = true;
                        self.stage_entry = now;
                        self.stage = Stage::DesignerAssigned;
                        return Ok(Action::Enter(factory.designer, 1));
                    }
                    self.stage = Stage::RequestPrinter;
                }
                Stage::DesignerAssigned => {
                    self.record.designer_wait = now - self.stage_entry;
                    self.record.design_rounds = 1;
                    self.stage = Stage::DesignDrawn;
                    return Ok(Action::Wait(ctx.exponential(times.design_mean)?));
                }
                Stage::DesignDrawn => {
                    let draw = ctx.uniform01();
                    if draw < odds.complete_redesign {
                        self.record.design_rounds += 1;
                        return Ok(Action::Wait(ctx.exponential(times.design_mean)?));
                    }
                    if draw < odds.adjustment_threshold {
                        self.stage = Stage::Adjusted;
                        return Ok(Action::Wait(ctx.exponential(times.adjustment_mean)?));
                    }
                    self.stage = Stage::DesignerFreed;
                    return Ok(Action::Leave(factory.designer, 1));
                }
                Stage::Adjusted => {
                    self.stage = Stage::DesignerFreed;
                    return Ok(Action::Leave(factory.designer, 1));
                }
                Stage::DesignerFreed => {
                    self.record.designing = now - self.stage_entry - self.record.designer_wait;
                    self.stage = Stage::RequestPrinter;
                }

                // ---- printing ----
                Stage::RequestPrinter => {
                    return self.seize_shortest(ctx, &factory.printers, Stage::PrinterAssigned);
                }
                Stage::PrinterAssigned => {
                    self.record.printer_wait = now - self.stage_entry;
                    self.stage = Stage::PrinterReady;
                    return Ok(Action::Wait(ctx.exponential(times.printer_setup_mean)?));
                }
                Stage::PrinterReady => {
                    self.approval_entry = now;
                    self.stage = Stage::RequestSupervisor;
                }
                Stage::RequestSupervisor => {
                    self.supervisor_request = now;
                    self.record.approval_rounds += 1;
                    self.stage = Stage::SupervisorAssigned;
                    return Ok(Action::Enter(factory.supervisor, 1));
                }
                Stage::SupervisorAssigned => {
                    self.record.supervisor_wait += now - self.supervisor_request;
                    self.stage = Stage::SampleChecked;
                    return Ok(Action::Wait(ctx.exponential(times.approval_check_mean)?));
                }
                Stage::SampleChecked => {
                    self.stage = Stage::Verdict;
                    return Ok(Action::Leave(factory.supervisor, 1));
                }
                Stage::Verdict => {
                    if ctx.uniform01() < odds.approval_rejection {
                        self.stage = Stage::Reworked;
                        return Ok(Action::Wait(ctx.exponential(times.rework_mean)?));
                    }
                    self.record.approval = now - self.approval_entry;
                    let mean = self.print_mean(ctx.uniform01());
                    self.stage = Stage::Printed;
                    return Ok(Action::Wait(ctx.exponential(mean)?));
                }
                Stage::Reworked => {
                    self.stage = Stage::RequestSupervisor;
                }
                Stage::Printed => {
                    return self.release(Stage::PrinterFreed);
                }
                Stage::PrinterFreed => {
                    self.record.printing = now - self.stage_entry - self.record.printer_wait;
                    self.stage = if ctx.uniform01() < odds.stamping {
                        Stage::RequestStamper
                    } else {
                        Stage::RequestPlotter
                    };
                }

                // ---- stamping ----
                Stage::RequestStamper => {
                    self.record.stamped = true;
                    return self.seize_shortest(ctx, &factory.stampers, Stage::StamperAssigned);
                }
                Stage::StamperAssigned => {
                    self.record.stamper_wait = now - self.stage_entry;
                    self.stage = Stage::Stamped;
                    let work = ctx.uniform(times.stamping_min, times.stamping_max)?;
                    return Ok(Action::Wait(times.stamper_setup + work));
                }
                Stage::Stamped => {
                    return self.release(Stage::StamperFreed);
                }
                Stage::StamperFreed => {
                    self.record.stamping = now - self.stage_entry - self.record.stamper_wait;
                    self.stage = Stage::RequestPlotter;
                }

                // ---- cutting ----
                Stage::RequestPlotter => {
                    return self.seize_shortest(ctx, &factory.plotters, Stage::PlotterAssigned);
                }
                Stage::PlotterAssigned => {
                    self.record.plotter_wait = now - self.stage_entry;
                    self.stage = Stage::PlotterReady;
                    return Ok(Action::Wait(
                        ctx.uniform(times.plotter_setup_min, times.plotter_setup_max)?,
                    ));
                }
                Stage::PlotterReady => {
                    self.stage = Stage::Cut;
                    let mean = times.cutting_mean * self.slowdown();
                    return Ok(Action::Wait(ctx.exponential(mean)?));
                }
                Stage::Cut => {
                    return self.release(Stage::PlotterFreed);
                }
                Stage::PlotterFreed => {
                    self.record.cutting = now - self.stage_entry - self.record.plotter_wait;
                    self.stage = Stage::RequestFinisher;
                }

                // ---- finishing ----
                Stage::RequestFinisher => {
                    return self.seize_shortest(ctx, &factory.finishing_machines, Stage::FinisherAssigned);
                }
                Stage::FinisherAssigned => {
                    self.record.finishing_wait = now - self.stage_entry;
                    self.stage = Stage::Finished;
                    let slowdown = self.slowdown();
                    return Ok(Action::Wait(ctx.uniform(
                        times.finishing_min * slowdown,
                        times.finishing_max * slowdown,
                    )?));
                }
                Stage::Finished => {
                    return self.release(Stage::FinisherFreed);
                }
                Stage::FinisherFreed => {
                    self.record.finishing = now - self.stage_entry - self.record.finishing_wait;
                    self.complete(ctx)?;
                    self.stage = Stage::Done;
                    return Ok(Action::Finish);
                }
                Stage::Done => return Ok(Action::Finish),
            }
        }
    }

    fn name(&self) -> &str {
        "order"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::execution::{SimulationConfig, SimulationEngine};
    use crate::workload::config::{FactoryConfig, MaterialShare, Probabilities};

    fn single_order(config: FactoryConfig) -> Vec<OrderRecord> {
        let config = config.with_order_recording(true);
        let mut sim = SimulationEngine::new(SimulationConfig::new(0.0, 1.0e6).with_seed(3)).unwrap();
        let factory = Factory::build(&mut sim, config).unwrap();
        sim.spawn(Box::new(Order::new(Rc::clone(&factory))));
        sim.run().unwrap();
        factory.completed_orders()
    }

    #[test]
    fn test_plain_order_skips_design_and_stamping() {
        let config = FactoryConfig::new().with_probabilities(Probabilities {
            custom_design: 0.0,
            stamping: 0.0,
            approval_rejection: 0.0,
            ..Probabilities::default()
        });
        let orders = single_order(config);
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert!(!order.custom_design);
        assert!(!order.stamped);
        assert_eq!(order.design_rounds, 0);
        assert_eq!(order.approval_rounds, 1);
        assert_eq!(order.designing, 0.0);
        assert_eq!(order.stamping, 0.0);
        assert_eq!(order.printer_wait, 0.0);
        assert!(order.printing > order.approval);
        // cutting includes a uniform setup of at least 10 minutes
        assert!(order.cutting >= 10.0);
        assert!(order.finishing >= 6.0 && order.finishing <= 11.0);
    }

    #[test]
    fn test_custom_stamped_order_visits_every_stage() {
        let config = FactoryConfig::new().with_probabilities(Probabilities {
            custom_design: 1.0,
            stamping: 1.0,
            ..Probabilities::default()
        });
        let orders = single_order(config);
        let order = &orders[0];
        assert!(order.custom_design && order.stamped);
        assert!(order.design_rounds >= 1);
        assert!(order.designing > 0.0);
        assert!(order.stamping >= 45.0 + 180.0 && order.stamping <= 45.0 + 240.0);
        assert!(order.finishing >= 18.0 && order.finishing <= 33.0);

        let stages = order.designing
            + order.printing
            + order.stamping
            + order.cutting
            + order.finishing;
        assert!((order.time_in_system() - stages).abs() < 1e-6);
    }

    #[test]
    fn test_print_mean_follows_material_shares() {
        let mut config = FactoryConfig::new();
        config.stage_times.materials = vec![
            MaterialShare { share: 0.5, print_mean: 1.0 },
            MaterialShare { share: 0.5, print_mean: 2.0 },
        ];
        let mut sim = SimulationEngine::new(SimulationConfig::new(0.0, 1.0)).unwrap();
        let factory = Factory::build(&mut sim, config).unwrap();
        let order = Order::new(factory);
        assert_eq!(order.print_mean(0.0), 1.0);
        assert_eq!(order.print_mean(0.49), 1.0);
        assert_eq!(order.print_mean(0.5), 2.0);
        assert_eq!(order.print_mean(0.999), 2.0);
    }
}
