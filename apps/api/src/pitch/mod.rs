// Movie pitch generation: input validation, prompt composition, and the HTTP handler.
// The provider call itself lives in llm_client.

pub mod handlers;
pub mod models;
pub mod prompts;
pub mod validation;
