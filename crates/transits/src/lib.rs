//! Transits - Geocentric Ephemeris Feed Generator
//!
//! Queries the JPL Horizons API for the current geocentric positions of a
//! configured list of Solar System bodies and publishes the result as a
//! single static JSON snapshot for a static web host to serve.

pub mod config;
pub mod feed;
pub mod horizons;
pub mod job;
