//! LLM judge plumbing

pub mod backend_impl;
pub mod prompts;
pub mod reply_parser;
pub mod transport;
