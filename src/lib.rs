pub mod dataset;
pub mod features;
pub mod match_db;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod update;
