mod availability_repo;
mod booking_repo;
mod waitlist_repo;

pub use availability_repo::{AvailabilityRepository, AvailabilityStats};
pub use booking_repo::BookingRepository;
pub use waitlist_repo::WaitlistRepository;
