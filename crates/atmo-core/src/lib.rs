#![no_std]

#[cfg(test)]
extern crate std;

pub mod chart;
pub mod config;
pub mod history;
pub mod quality;
pub mod sensors;
pub mod station;
pub mod telemetry;
