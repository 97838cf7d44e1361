//! Squad capacity management: registration, cancellation, transfer,
//! check-in, and FIFO waitlist promotion.
//!
//! `Squad.current_shooters` and `Squad.status` are mutated only through
//! [`SquadCapacityManager`]; every mutation of a squad runs inside that
//! squad's critical section, so two concurrent registrations can never both
//! observe spare capacity and overrun `max_shooters`.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{RegistrationError, RegistrationResult};
pub use manager::SquadCapacityManager;
pub use models::{
    PaymentStatus, Registration, RegistrationId, RegistrationRequest, RegistrationStatus, Squad,
    SquadId, SquadStatus,
};
