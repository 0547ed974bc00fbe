//! Transit itinerary planner server.
//!
//! A web application that answers: "Leaving here at this time, when is the
//! earliest I can get there, and how?"

pub mod cache;
pub mod config;
pub mod domain;
pub mod locator;
pub mod planner;
pub mod timetable;
pub mod web;
