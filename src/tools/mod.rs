//! Server-Side Tools
//!
//! Tools the server executes itself during the chat loop. The `interview`
//! tool is defined in `ponder-core` and answered by the frontend.

pub mod web_search;
