use crate::core::error::SimResult;
use crate::core::process::{Action, Process, ProcessContext};
use crate::core::types::{FacilityId, Priority};
use crate::workload::factory::Factory;
use crate::workload::order::Order;
use log::trace;
use std::rc::Rc;

/// Starts a new order, then sleeps for an exponential interarrival time
pub struct OrderGenerator {
    factory: Rc<Factory>,
}

impl OrderGenerator {
    pub fn new(factory: Rc<Factory>) -> Self {
        Self { factory }
    }
}

impl Process for OrderGenerator {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<Action> {
        let order = ctx.activate(Box::new(Order::new(Rc::clone(&self.factory))));
        trace!("{} arrived at {}", order, ctx.now());
        let interval = ctx.exponential(self.factory.config.order_interval_mean())?;
        Ok(Action::Wait(interval))
    }

    fn name(&self) -> &str {
        "order generator"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplacementStage {
    Requested,
    Replacing,
    Replaced,
    Done,
}

/// Takes a printer out of service while its material roll is swapped.
///
/// Runs with a raised priority so it jumps ahead of waiting orders, but never preempts
/// the order currently printing.
pub struct MaterialReplacement {
    printer: FacilityId,
    duration: f64,
    priority: Priority,
    stage: ReplacementStage,
}

impl MaterialReplacement {
    pub fn new(printer: FacilityId, duration: f64, priority: Priority) -> Self {
        Self {
            printer,
            duration,
            priority,
            stage: ReplacementStage::Requested,
        }
    }
}

impl Process for MaterialReplacement {
    fn resume(&mut self, _ctx: &mut ProcessContext<'_>) -> SimResult<Action> {
        match self.stage {
            ReplacementStage::Requested => {
                self.stage = ReplacementStage::Replacing;
                Ok(Action::Seize(self.printer))
            }
            ReplacementStage::Replacing => {
                self.stage = ReplacementStage::Replaced;
                Ok(Action::Wait(self.duration))
            }
            ReplacementStage::Replaced => {
                self.stage = ReplacementStage::Done;
                Ok(Action::Release(self.printer))
            }
            ReplacementStage::Done => Ok(Action::Finish),
        }
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn name(&self) -> &str {
        "material replacement"
    }
}

/// Schedules material replacements of one printer
pub struct MaterialReplacementGenerator {
    factory: Rc<Factory>,
    printer: FacilityId,
}

impl MaterialReplacementGenerator {
    pub fn new(factory: Rc<Factory>, printer: FacilityId) -> Self {
        Self { factory, printer }
    }
}

impl Process for MaterialReplacementGenerator {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<Action> {
        let settings = &self.factory.config.material_replacement;
        ctx.activate(Box::new(MaterialReplacement::new(
            self.printer,
            settings.duration,
            settings.priority,
        )));
        Ok(Action::Wait(ctx.exponential(settings.interval_mean)?))
    }

    fn name(&self) -> &str {
        "material replacement generator"
    }
}
