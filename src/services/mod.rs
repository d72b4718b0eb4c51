pub mod keygen;
pub mod mock;
pub mod oracle;
pub mod scanner;
pub mod store;
