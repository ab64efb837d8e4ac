// Application layer: concrete pipelines wired from domain ports and core logic.

pub mod pipelines;
pub mod runner;
