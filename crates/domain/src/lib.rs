pub mod booking;
pub mod ledger;
pub mod waitlist;

pub use booking::{release_for_cancel, BookingStatus, CapacityRelease, PaymentStatus};
pub use ledger::{Counters, LedgerError};
pub use waitlist::{notify_next, next_priority, Candidate, NotifyPlan, WaitlistStatus};
