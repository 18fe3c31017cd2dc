pub mod record;
pub mod retry;
pub mod runner;
