//! Ticket records as persisted in `tickets.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many tickets one member may have open in a guild at the same time.
pub const MAX_OPEN_PER_MEMBER: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("Ticket #{0} does not exist.")]
    NotFound(u64),

    #[error("Ticket #{0} is already closed.")]
    AlreadyClosed(u64),

    #[error("You already have {MAX_OPEN_PER_MEMBER} open tickets. Close one first.")]
    TooManyOpen,

    #[error("You have no open ticket.")]
    NoneOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub guild_id: u64,
    pub opener_id: u64,
    pub opener_name: String,
    pub topic: String,
    pub status: TicketStatus,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<u64>,
}

/// Every ticket ever opened, across guilds.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TicketBook {
    next_id: u64,
    tickets: Vec<Ticket>,
}

impl TicketBook {
    pub fn open(
        &mut self,
        guild_id: u64,
        opener_id: u64,
        opener_name: &str,
        topic: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        if self.open_by(guild_id, opener_id).count() >= MAX_OPEN_PER_MEMBER {
            return Err(TicketError::TooManyOpen);
        }

        self.next_id += 1;
        let ticket = Ticket {
            id: self.next_id,
            guild_id,
            opener_id,
            opener_name: opener_name.to_string(),
            topic: topic.trim().to_string(),
            status: TicketStatus::Open,
            opened_at: now,
            closed_at: None,
            closed_by: None,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    /// Closes ticket `id`, or the member's most recent open ticket when `id`
    /// is `None`. Tickets of other guilds are invisible.
    pub fn close(
        &mut self,
        guild_id: u64,
        id: Option<u64>,
        closed_by: u64,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let id = match id {
            Some(id) => id,
            None => self
                .open_by(guild_id, closed_by)
                .map(|t| t.id)
                .max()
                .ok_or(TicketError::NoneOpen)?,
        };

        let ticket = self
            .tickets
            .iter_mut()
            .find(|t| t.id == id && t.guild_id == guild_id)
            .ok_or(TicketError::NotFound(id))?;

        if ticket.status == TicketStatus::Closed {
            return Err(TicketError::AlreadyClosed(id));
        }
        ticket.status = TicketStatus::Closed;
        ticket.closed_at = Some(now);
        ticket.closed_by = Some(closed_by);
        Ok(ticket.clone())
    }

    pub fn open_in(&self, guild_id: u64) -> impl Iterator<Item = &Ticket> {
        self.tickets
            .iter()
            .filter(move |t| t.guild_id == guild_id && t.status == TicketStatus::Open)
    }

    fn open_by(&self, guild_id: u64, member: u64) -> impl Iterator<Item = &Ticket> {
        self.open_in(guild_id)
            .filter(move |t| t.opener_id == member)
    }
}
