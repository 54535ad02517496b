pub mod apply;
pub mod audit;
pub mod derive;
pub mod equipment;
pub mod ingest;
pub mod matching;
pub mod pipeline;
pub mod report;
pub mod status;
