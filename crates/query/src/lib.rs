pub mod retriever;

pub use retriever::{DEFAULT_TOP_K, ResumeSearch, Retriever, not_found_message};
