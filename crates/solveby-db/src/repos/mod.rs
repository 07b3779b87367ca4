//! PostgreSQL implementations of the repository traits for [`crate::Database`]

mod agent;
mod companion;
mod directory;
mod job;
mod listing;
mod notification;
mod proposal;
mod tip;
mod wallet;

pub(crate) use notification::insert_notification;
