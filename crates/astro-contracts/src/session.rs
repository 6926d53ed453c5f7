use chrono::{DateTime, Local};

use crate::result::EnhancementResult;

pub const COMPLETED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("an enhancement is already in progress")]
    SubmissionInFlight,
    #[error("submission ticket {0} is not the active submission")]
    StaleTicket(u64),
}

/// The last successful enhancement and when it finished.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub result: EnhancementResult,
    pub completed_at: DateTime<Local>,
}

impl SessionSnapshot {
    pub fn completed_at_label(&self) -> String {
        self.completed_at.format(COMPLETED_AT_FORMAT).to_string()
    }

    pub fn download_file_name(&self) -> String {
        download_file_name(&self.completed_at)
    }
}

/// Proof that the holder owns the single outstanding submission.
#[derive(Debug, PartialEq, Eq)]
pub struct SubmissionTicket {
    id: u64,
}

impl SubmissionTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Single-writer store for the active result set.
///
/// The snapshot is replaced whole or not at all. At most one submission may
/// be outstanding; failed submissions release the slot without touching the
/// stored snapshot.
#[derive(Debug, Default)]
pub struct Session {
    last: Option<SessionSnapshot>,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SessionSnapshot> {
        self.last.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn set(&mut self, result: EnhancementResult, completed_at: DateTime<Local>) {
        self.last = Some(SessionSnapshot {
            result,
            completed_at,
        });
    }

    pub fn clear(&mut self) {
        self.last = None;
        self.in_flight = None;
    }

    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::SubmissionInFlight);
        }
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        Ok(SubmissionTicket {
            id: self.next_ticket,
        })
    }

    pub fn complete(
        &mut self,
        ticket: SubmissionTicket,
        result: EnhancementResult,
        completed_at: DateTime<Local>,
    ) -> Result<&SessionSnapshot, SessionError> {
        self.release(&ticket)?;
        Ok(self.last.insert(SessionSnapshot {
            result,
            completed_at,
        }))
    }

    pub fn abandon(&mut self, ticket: SubmissionTicket) -> Result<(), SessionError> {
        self.release(&ticket)
    }

    fn release(&mut self, ticket: &SubmissionTicket) -> Result<(), SessionError> {
        if self.in_flight != Some(ticket.id) {
            return Err(SessionError::StaleTicket(ticket.id));
        }
        self.in_flight = None;
        Ok(())
    }
}

/// `enhanced_image_2026-10-15_21-04-05.png` for a completion at that time.
pub fn download_file_name(completed_at: &DateTime<Local>) -> String {
    let stamp = completed_at
        .format(COMPLETED_AT_FORMAT)
        .to_string()
        .replace(' ', "_")
        .replace(':', "-");
    format!("enhanced_image_{stamp}.png")
}
