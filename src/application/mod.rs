pub mod bootstrap;
pub mod calendar;
pub mod day_sync;
