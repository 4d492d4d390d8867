//! Mail transaction state.
//!
//! ```text
//! Idle ── MAIL ──> SenderSet ── RCPT ──> RecipientSet ── DATA ──> InData
//!  ^                   │                  │    ^                    │
//!  └────── RSET ───────┴──────────────────┘    └─ RCPT              │
//!  └──────────────────────── end of data ───────────────────────────┘
//! ```

use crate::error::{Error, Result};

/// Where the session stands within a mail transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailState {
    /// No transaction open.
    #[default]
    Idle,
    /// MAIL FROM accepted.
    SenderSet,
    /// At least one RCPT TO accepted.
    RecipientSet,
    /// DATA accepted; only body lines and the terminator may follow.
    InData,
}

/// A step that affects the mail transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailStep {
    /// MAIL FROM
    Mail,
    /// RCPT TO
    Rcpt,
    /// DATA
    Data,
    /// Lone-dot terminator
    EndOfData,
    /// RSET
    Reset,
    /// Any command that leaves the transaction alone (NOOP, VRFY, ...).
    Other,
}

impl MailState {
    /// Returns the state reached once `step` succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if `step` is not allowed from here.
    pub fn next(self, step: MailStep) -> Result<Self> {
        match (self, step) {
            (Self::Idle, MailStep::Mail) => Ok(Self::SenderSet),
            (Self::SenderSet | Self::RecipientSet, MailStep::Rcpt) => Ok(Self::RecipientSet),
            (Self::RecipientSet, MailStep::Data) => Ok(Self::InData),
            (Self::InData, MailStep::EndOfData) => Ok(Self::Idle),
            (Self::InData, _) => Err(Error::state(
                "message data in progress; only body lines and the terminator are allowed",
            )),
            (_, MailStep::Reset) => Ok(Self::Idle),
            (state, MailStep::Other) => Ok(state),
            (state, step) => Err(Error::state(format!("{step:?} not allowed in {state:?}"))),
        }
    }

    /// Returns true if no transaction is open.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = MailState::Idle
            .next(MailStep::Mail)
            .and_then(|s| s.next(MailStep::Rcpt))
            .and_then(|s| s.next(MailStep::Rcpt))
            .and_then(|s| s.next(MailStep::Data))
            .unwrap();
        assert_eq!(state, MailState::InData);
        assert_eq!(state.next(MailStep::EndOfData).unwrap(), MailState::Idle);
    }

    #[test]
    fn test_out_of_order_steps() {
        assert!(MailState::Idle.next(MailStep::Rcpt).is_err());
        assert!(MailState::Idle.next(MailStep::Data).is_err());
        assert!(MailState::SenderSet.next(MailStep::Data).is_err());
        assert!(MailState::SenderSet.next(MailStep::Mail).is_err());
        assert!(MailState::Idle.next(MailStep::EndOfData).is_err());
    }

    #[test]
    fn test_reset_everywhere_but_data() {
        for state in [MailState::Idle, MailState::SenderSet, MailState::RecipientSet] {
            assert_eq!(state.next(MailStep::Reset).unwrap(), MailState::Idle);
        }
        assert!(MailState::InData.next(MailStep::Reset).is_err());
    }

    #[test]
    fn test_other_commands_keep_state() {
        assert_eq!(
            MailState::RecipientSet.next(MailStep::Other).unwrap(),
            MailState::RecipientSet
        );
        assert!(matches!(
            MailState::InData.next(MailStep::Other),
            Err(Error::InvalidState(_))
        ));
    }
}
