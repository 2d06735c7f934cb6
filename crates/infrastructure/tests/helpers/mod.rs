#![allow(dead_code)]

pub mod fixture_server;
pub mod log_params;
