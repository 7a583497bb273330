// Library interface for finbrief modules
// This allows tests and other binaries to import modules

pub mod crawl;
pub mod digest;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod notify;
pub mod sources;
pub mod store;
