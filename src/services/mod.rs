pub mod dataset;
pub mod devig;
pub mod features;
pub mod trainer;
