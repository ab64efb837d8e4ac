pub mod sync_pipeline;
