// SPDX-License-Identifier: MIT

//! Resolved email session handed to the binder at initialization

use serde::{Deserialize, Serialize};

use crate::adk::error::SessionError;
use crate::sox::workflow::state::{Bootstrap, Profile};

/// One correspondent of an email session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: String,
    pub full_name: String,
    pub email_address: String,
    #[serde(default)]
    pub phone_number: String,
}

impl Person {
    fn profile(&self) -> Profile {
        Profile {
            full_name: self.full_name.clone(),
            email_address: self.email_address.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub sender_id: String,
    pub text: String,
    /// Extracted attachment text, if the message carried one
    #[serde(default)]
    pub attachment_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailSession {
    pub subject: String,
    pub sender: Person,
    pub receiver: Person,
    #[serde(default)]
    pub messages: Vec<EmailMessage>,
}

impl EmailSession {
    /// Resolve the parties against `self_id` and flatten the transcript
    pub fn resolve(&self, self_id: &str) -> Result<Bootstrap, SessionError> {
        let (user, contact) = if self.sender.id == self_id {
            (&self.sender, &self.receiver)
        } else if self.receiver.id == self_id {
            (&self.receiver, &self.sender)
        } else {
            return Err(SessionError::SelfPartyMissing {
                self_id: self_id.to_string(),
            });
        };

        Ok(Bootstrap {
            subject: self.subject.clone(),
            email_session: self.transcript(),
            user_profile: user.profile(),
            contact_profile: contact.profile(),
        })
    }

    /// `"<sender name>: <text>"` per message, joined by newlines
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|message| {
                let mut line = format!("{}: {}", self.sender_name(&message.sender_id), message.text);
                if let Some(attachment) = &message.attachment_text {
                    line.push_str(&format!("\n<Attachment>\n{}\n</Attachment>", attachment));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sender_name<'a>(&'a self, sender_id: &'a str) -> &'a str {
        [&self.sender, &self.receiver]
            .into_iter()
            .find(|p| p.id == sender_id)
            .map(|p| p.full_name.as_str())
            .unwrap_or(sender_id)
    }
}
