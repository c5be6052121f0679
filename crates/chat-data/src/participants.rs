//! Participant resolution: who talks to whom, and what the chat is called.

use std::collections::HashSet;

use chat_core::error::{AnalyzerError, Result};
use chat_core::models::Message;
use tracing::debug;

/// Assigns `receiver` and `chat` to every message of a two-person
/// conversation.
pub struct ParticipantResolver {
    self_names: HashSet<String>,
}

impl ParticipantResolver {
    /// `self_names` are the operator's own display names; the chat is
    /// labelled after the other participant.
    pub fn new<I, S>(self_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            self_names: self_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Return a copy of `messages` with `receiver` and `chat` filled in.
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::UnsupportedConversation`] unless exactly two distinct
    /// senders appear.
    pub fn resolve(&self, messages: &[Message], source: &str) -> Result<Vec<Message>> {
        let participants = distinct_senders(messages);
        if participants.len() != 2 {
            return Err(AnalyzerError::UnsupportedConversation {
                source_name: source.to_string(),
                participants,
            });
        }

        let chat = self.chat_label(&participants);
        debug!(
            "{}: resolved participants [{}], chat \"{}\"",
            source,
            participants.join(", "),
            chat
        );

        let resolved = messages
            .iter()
            .map(|msg| {
                let receiver = if msg.sender == participants[0] {
                    &participants[1]
                } else {
                    &participants[0]
                };
                Message {
                    receiver: Some(receiver.clone()),
                    chat: Some(chat.clone()),
                    ..msg.clone()
                }
            })
            .collect();

        Ok(resolved)
    }

    /// Label for a conversation between `participants`.
    ///
    /// Normally the single non-self participant. When that is ambiguous the
    /// non-self participants are joined with `", "`, and when every
    /// participant is a self name all of them are.
    pub fn chat_label(&self, participants: &[String]) -> String {
        let others: Vec<&str> = participants
            .iter()
            .filter(|p| !self.self_names.contains(p.as_str()))
            .map(String::as_str)
            .collect();

        if others.is_empty() {
            participants.join(", ")
        } else {
            others.join(", ")
        }
    }
}

/// Distinct senders in order of first appearance.
fn distinct_senders(messages: &[Message]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    messages
        .iter()
        .filter(|m| seen.insert(m.sender.as_str()))
        .map(|m| m.sender.clone())
        .collect()
}
