pub mod ingest;
pub mod init;
pub mod search;
pub mod stats;
