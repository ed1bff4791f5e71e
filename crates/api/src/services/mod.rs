pub mod booking_service;
pub mod waitlist_service;

pub use booking_service::BookingService;
pub use waitlist_service::WaitlistService;
