#![allow(dead_code)]

pub mod mock_engine;

pub use mock_engine::MockFilterEngine;
