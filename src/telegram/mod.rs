pub mod command;
pub mod formatter;
pub mod handler;
pub mod notifier;
pub mod webhook;
