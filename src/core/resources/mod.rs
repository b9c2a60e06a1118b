pub mod facility;
pub mod store;
pub mod wait_queue;

pub use facility::{Facility, FacilityReport, SeizeOutcome};
pub use store::{EnterOutcome, Store, StoreReport};
pub use wait_queue::{QueueReport, WaitQueue, Waiter};
