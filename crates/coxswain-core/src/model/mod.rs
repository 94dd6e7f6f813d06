//! Domain model for the scheduling roster.
//!
//! This module contains the typed records the engine works with:
//!
//! - `resource`: Reservable boats (`Resource`)
//! - `user`: Club members as known to the scheduling service (`SchedUser`)
//! - `group`: Permission groups (`SchedGroup`)
//! - `reservation`: Bookings (`Reservation`, `ReservationFilter`, `NewReservation`)
//!
//! All of these are immutable snapshots populated from the scheduling
//! service; the engine never mutates them in place.

mod group;
mod reservation;
mod resource;
mod user;

// Re-export public API
pub use group::{GroupId, SchedGroup};
pub use reservation::{NewReservation, Reservation, ReservationFilter};
pub use resource::{Resource, ResourceId};
pub use user::{SchedUser, UserId};
