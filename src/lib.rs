// src/lib.rs

//! Timetable Crawler Library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod schedule;
pub mod services;
pub mod storage;
