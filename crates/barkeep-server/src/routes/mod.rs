pub mod calibration;
pub mod events;
pub mod health;
pub mod manual;
pub mod menu;
pub mod orders;
pub mod status;
