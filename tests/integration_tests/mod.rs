// Integration tests module

pub mod worker_tests;
