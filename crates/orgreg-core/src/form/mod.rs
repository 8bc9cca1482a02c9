//! Registration form: states, inbound classification, transitions and replies

pub mod inbound;
pub mod machine;
pub mod reply;
pub mod state;

pub use inbound::{FormCommand, Inbound};
pub use machine::{decide, Decision, Write};
pub use reply::{render, KeyboardHint, Prompt, Reply, RESET_BUTTON};
pub use state::FormState;
