// Unit tests module

pub mod oracle_source_tests;
pub mod route_tests;
