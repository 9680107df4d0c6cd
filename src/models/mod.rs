pub mod notification;
pub mod profile;
pub mod reservation;
pub mod stall;
pub mod user;
