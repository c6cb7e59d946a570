pub mod calculate;
pub mod results;
pub mod upload;
