use crate::core::resources::{FacilityReport, QueueReport, StoreReport};
use crate::core::stats::{HistogramReport, SampleReport};
use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Counters describing how a run went
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_time: SimTime,
    pub events_processed: u64,
    pub processes_spawned: u64,
    pub processes_finished: u64,
    /// Processes still alive when the run ended
    pub processes_abandoned: u64,
    pub stopped_at_horizon: bool,
}

/// Everything a run measured, in registration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub seed: u64,
    pub start_time: SimTime,
    pub time: SimTime,
    pub summary: RunSummary,
    pub histograms: Vec<HistogramReport>,
    pub stores: Vec<StoreReport>,
    pub facilities: Vec<FacilityReport>,
}

impl SimulationReport {
    pub fn facility(&self, name: &str) -> Option<&FacilityReport> {
        self.facilities.iter().find(|f| f.name == name)
    }

    pub fn store(&self, name: &str) -> Option<&StoreReport> {
        self.stores.iter().find(|s| s.name == name)
    }

    pub fn histogram(&self, name: &str) -> Option<&HistogramReport> {
        self.histograms.iter().find(|h| h.name == name)
    }
}

const RULE: &str = "+----------------------------------------------------------+";

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn write_sample(f: &mut fmt::Formatter<'_>, label: &str, stat: &SampleReport) -> fmt::Result {
    writeln!(f, "|  {} ({} samples)", label, stat.count)?;
    writeln!(
        f,
        "|    min = {}  max = {}  mean = {}  std-dev = {}",
        opt(stat.min),
        opt(stat.max),
        opt(stat.mean),
        opt(stat.std_dev)
    )
}

fn write_queue(f: &mut fmt::Formatter<'_>, queue: &QueueReport) -> fmt::Result {
    writeln!(f, "|  Input queue:")?;
    writeln!(f, "|    Incoming                   {}", queue.entries)?;
    writeln!(f, "|    Current length             {}", queue.current_len)?;
    writeln!(f, "|    Maximal length             {}", queue.max_len)?;
    writeln!(f, "|    Average length             {:.4}", queue.mean_len)?;
    write_sample(f, "Time in queue", &queue.wait)
}

impl fmt::Display for FacilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "| FACILITY {}", self.name)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "|  Status = {}", if self.busy { "BUSY" } else { "not BUSY" })?;
        writeln!(f, "|  Time interval = {} - {}", self.interval.0, self.interval.1)?;
        writeln!(f, "|  Number of requests = {}", self.requests)?;
        writeln!(f, "|  Average utilization = {:.6}", self.utilization)?;
        write_queue(f, &self.queue)?;
        writeln!(f, "{}", RULE)
    }
}

impl fmt::Display for StoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "| STORE {}", self.name)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "|  Capacity = {} ({} used, {} free)", self.capacity, self.used, self.capacity - self.used)?;
        writeln!(f, "|  Time interval = {} - {}", self.interval.0, self.interval.1)?;
        writeln!(f, "|  Number of Enter operations = {}", self.enters)?;
        writeln!(f, "|  Minimal used capacity = {}", self.min_used)?;
        writeln!(f, "|  Maximal used capacity = {}", self.max_used)?;
        writeln!(f, "|  Average used capacity = {:.4}", self.mean_used)?;
        write_queue(f, &self.queue)?;
        writeln!(f, "{}", RULE)
    }
}

impl fmt::Display for HistogramReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "| HISTOGRAM {}", self.name)?;
        writeln!(f, "{}", RULE)?;
        write_sample(f, "Statistics", &self.summary)?;
        writeln!(f, "|  underflow = {}  overflow = {}", self.underflow, self.overflow)?;
        writeln!(f, "|    from    |     to     |     n    |   rel    |   sum    |")?;
        for bucket in &self.buckets {
            writeln!(
                f,
                "| {:>10.3} | {:>10.3} | {:>8} | {:>8.6} | {:>8.6} |",
                bucket.from, bucket.to, bucket.count, bucket.relative, bucket.cumulative
            )?;
        }
        writeln!(f, "{}", RULE)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} (seed {})", self.run_id, self.seed)?;
        writeln!(
            f,
            "Simulated {} - {}: {} events, {} processes finished, {} abandoned",
            self.start_time,
            self.time,
            self.summary.events_processed,
            self.summary.processes_finished,
            self.summary.processes_abandoned
        )?;
        for histogram in &self.histograms {
            write!(f, "{}", histogram)?;
        }
        for store in &self.stores {
            write!(f, "{}", store)?;
        }
        for facility in &self.facilities {
            write!(f, "{}", facility)?;
        }
        Ok(())
    }
}
