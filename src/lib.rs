pub mod cli;
pub mod gatehouse;
pub mod provider;
