#[path = "features/jobs.rs"]
mod jobs;
#[path = "features/properties.rs"]
mod properties;
#[path = "features/scenarios.rs"]
mod scenarios;
