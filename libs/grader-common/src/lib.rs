pub mod envelope;
pub mod inputs;
pub mod output;
pub mod types;
