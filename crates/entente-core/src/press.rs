//! The append-only press log.
//!
//! Press drafts returned by decision-makers are validated and sequenced
//! here by the collector. Nothing else writes to the log, and nothing in
//! the log ever touches the board.

use chrono::Utc;
use entente_types::{PhaseToken, Power, PressDraft, PressMessage, Recipient};
use serde::{Deserialize, Serialize};

use crate::error::PressError;

/// Every press message sent in a match, in send order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressLog {
    messages: Vec<PressMessage>,
}

impl PressLog {
    /// An empty log.
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Validate and append a draft.
    ///
    /// The body is trimmed first. Returns `Ok(None)` for an empty body,
    /// which counts as no message rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`PressError::TooLong`] if the trimmed body has more than
    /// `max_chars` characters. The log is left unchanged.
    pub fn append(
        &mut self,
        phase: PhaseToken,
        sender: Power,
        draft: PressDraft,
        max_chars: usize,
    ) -> Result<Option<&PressMessage>, PressError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let length = text.chars().count();
        if length > max_chars {
            return Err(PressError::TooLong {
                sender,
                length,
                limit: max_chars,
            });
        }
        let seq = u64::try_from(self.messages.len()).unwrap_or(u64::MAX);
        self.messages.push(PressMessage {
            seq,
            phase,
            sender,
            recipient: draft.recipient,
            text: text.to_owned(),
            sent_at: Utc::now(),
        });
        Ok(self.messages.last())
    }

    /// Number of messages sent so far.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message has been sent yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every message, oldest first.
    pub fn messages(&self) -> &[PressMessage] {
        &self.messages
    }

    /// The most recent `limit` messages `power` may read, oldest first.
    pub fn visible_to(&self, power: Power, limit: usize) -> Vec<PressMessage> {
        tail(self.messages.iter().filter(|m| m.visible_to(power)), limit)
    }

    /// The most recent `limit` broadcasts, oldest first.
    pub fn public_tail(&self, limit: usize) -> Vec<PressMessage> {
        tail(
            self.messages
                .iter()
                .filter(|m| m.recipient == Recipient::All),
            limit,
        )
    }

    /// Messages sent during `phase`.
    pub fn in_phase(&self, phase: PhaseToken) -> impl Iterator<Item = &PressMessage> {
        self.messages.iter().filter(move |m| m.phase == phase)
    }
}

fn tail<'a>(
    messages: impl DoubleEndedIterator<Item = &'a PressMessage>,
    limit: usize,
) -> Vec<PressMessage> {
    let mut recent: Vec<PressMessage> = messages.rev().take(limit).cloned().collect();
    recent.reverse();
    recent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn send(log: &mut PressLog, sender: Power, to: Recipient, text: &str) {
        log.append(PhaseToken::opening(), sender, PressDraft::new(to, text), 100)
            .unwrap();
    }

    #[test]
    fn append_trims_and_sequences() {
        let mut log = PressLog::new();
        let first = log
            .append(
                PhaseToken::opening(),
                Power::France,
                PressDraft::new(Recipient::All, "  peace in our time \n"),
                100,
            )
            .unwrap()
            .unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(first.text, "peace in our time");

        send(&mut log, Power::England, Recipient::All, "agreed");
        assert_eq!(log.messages().get(1).map(|m| m.seq), Some(1));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn blank_draft_is_no_message() {
        let mut log = PressLog::new();
        let result = log.append(
            PhaseToken::opening(),
            Power::Italy,
            PressDraft::new(Power::Austria, "   "),
            100,
        );
        assert!(result.unwrap().is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn overlong_draft_is_rejected() {
        let mut log = PressLog::new();
        let result = log.append(
            PhaseToken::opening(),
            Power::Italy,
            PressDraft::new(Recipient::All, "x".repeat(11)),
            10,
        );
        assert_eq!(
            result.unwrap_err(),
            PressError::TooLong {
                sender: Power::Italy,
                length: 11,
                limit: 10
            }
        );
        assert!(log.is_empty());
    }

    #[test]
    fn private_press_stays_private() {
        let mut log = PressLog::new();
        send(&mut log, Power::France, Power::England.into(), "secret");
        send(&mut log, Power::Germany, Recipient::All, "hello all");
        send(&mut log, Power::Russia, Power::Russia.into(), "note to self");

        let texts = |p: Power| -> Vec<String> {
            log.visible_to(p, 10).into_iter().map(|m| m.text).collect()
        };
        assert_eq!(texts(Power::France), ["secret", "hello all"]);
        assert_eq!(texts(Power::England), ["secret", "hello all"]);
        assert_eq!(texts(Power::Germany), ["hello all"]);
        assert_eq!(texts(Power::Russia), ["hello all", "note to self"]);
        assert_eq!(log.public_tail(10).len(), 1);
    }

    #[test]
    fn history_is_the_most_recent_tail_oldest_first() {
        let mut log = PressLog::new();
        for n in 0..5 {
            send(&mut log, Power::Turkey, Recipient::All, &format!("m{n}"));
        }
        let seqs: Vec<u64> = log
            .visible_to(Power::Austria, 3)
            .iter()
            .map(|m| m.seq)
            .collect();
        assert_eq!(seqs, [2, 3, 4]);
        assert!(log.visible_to(Power::Austria, 0).is_empty());
    }
}
