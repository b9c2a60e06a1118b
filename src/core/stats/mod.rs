pub mod histogram;
pub mod sample;
pub mod time_weighted;

pub use histogram::{BucketReport, Histogram, HistogramReport};
pub use sample::{SampleReport, SampleStat};
pub use time_weighted::{TimeReport, TimeStat};
