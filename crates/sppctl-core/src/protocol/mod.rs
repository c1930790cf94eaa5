//! Worker command protocol.
//!
//! - `framing`: chunked command/reply exchange over a TCP stream
//! - `command`: typed command vocabulary and its wire rendering
//! - `launch`: composition of the primary's `launch` command
//! - `reply`: reply decoding and secondary identification

mod command;
mod framing;
mod launch;
mod reply;

pub use command::{is_token, ClassifierEntry, Command, TableAction};
pub use framing::{read_reply, write_command};
pub use launch::{app_opts, LaunchCommand, EAL_OPTS, LCORE_OPTS, PROC_TYPE_OPT};
pub use reply::{decode_client_id, decode_reply, identify, IDENTIFY_ORDER};
