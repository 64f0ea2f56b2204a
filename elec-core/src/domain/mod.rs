pub mod meter_reading;

pub use meter_reading::MeterReading;
