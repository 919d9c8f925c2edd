//! Bridges a mailbox and a forum-style group chat: each correspondent gets a
//! thread, inbound mail is posted into it, and messages typed into the
//! thread go back out as replies.

pub mod chat;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod models;
pub mod poller;
pub mod reconciler;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;
