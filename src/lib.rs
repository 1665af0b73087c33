//! Content core for an online magazine.
//!
//! Article bodies are stored as plain text with `[IMAGE:n]` / `[VIDEO:n]`
//! placeholders and bare URLs; [`content::render_body`] turns them into HTML.
//! Every mutation goes through [`admin::AdminConsole`], which re-checks the
//! caller's admin role before each operation.

pub mod admin;
pub mod auth;
pub mod config;
pub mod contact;
pub mod content;
pub mod newsletter;
pub mod storage;
pub mod uploads;
pub mod util;
