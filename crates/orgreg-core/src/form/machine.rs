//! Registration form transitions
//!
//! `decide` is pure: it looks at the stored subscriber and the inbound
//! message and says what to write and what to answer. Applying the decision
//! is the conversation engine's job.

use super::inbound::{FormCommand, Inbound};
use super::reply::Prompt;
use super::state::FormState;
use crate::storage::{Subscriber, SubscriberPatch};

/// Store operation requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Nothing,
    /// Insert a fresh subscriber awaiting the organization name.
    Create,
    Patch(SubscriberPatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub write: Write,
    /// `None` means stay silent.
    pub prompt: Option<Prompt>,
}

impl Decision {
    fn quiet() -> Self {
        Self {
            write: Write::Nothing,
            prompt: None,
        }
    }

    fn reply(write: Write, prompt: Prompt) -> Self {
        Self {
            write,
            prompt: Some(prompt),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.write == Write::Nothing && self.prompt.is_none()
    }
}

/// Decides the next step for `record` given `input`.
pub fn decide(record: Option<&Subscriber>, input: &Inbound) -> Decision {
    match input {
        Inbound::Command(FormCommand::Start) => on_start(record),
        Inbound::Command(FormCommand::Reset) => on_reset(record),
        Inbound::Text(text) => on_text(record, text),
        Inbound::UnknownCommand(_) => Decision::quiet(),
    }
}

fn on_start(record: Option<&Subscriber>) -> Decision {
    match record {
        None => Decision::reply(Write::Create, Prompt::Welcome),
        Some(subscriber) if subscriber.is_complete() => Decision::reply(
            Write::Nothing,
            Prompt::Summary {
                organization_name: subscriber.organization_name.clone().unwrap_or_default(),
                address: subscriber.address.clone().unwrap_or_default(),
                contact: subscriber.contact.clone().unwrap_or_default(),
            },
        ),
        Some(subscriber) if subscriber.state == Some(FormState::AwaitingOrgName) => {
            Decision::reply(Write::Nothing, Prompt::Welcome)
        }
        // Rewind so the next text lands in organization_name, matching the prompt.
        Some(_) => Decision::reply(
            Write::Patch(SubscriberPatch::default().state(FormState::AwaitingOrgName)),
            Prompt::Welcome,
        ),
    }
}

fn on_reset(record: Option<&Subscriber>) -> Decision {
    let write = match record {
        None => Write::Create,
        Some(_) => Write::Patch(
            SubscriberPatch::default()
                .clear_profile()
                .state(FormState::AwaitingOrgName),
        ),
    };
    Decision::reply(write, Prompt::Restarted)
}

fn on_text(record: Option<&Subscriber>, text: &str) -> Decision {
    let Some(state) = record.and_then(|subscriber| subscriber.state) else {
        return Decision::quiet();
    };

    if text.is_empty() {
        return match ask_for(state) {
            Some(prompt) => Decision::reply(Write::Nothing, prompt),
            None => Decision::quiet(),
        };
    }

    let next = state.next();
    let (patch, prompt) = match state {
        FormState::AwaitingOrgName => (SubscriberPatch::default().organization_name(text), Prompt::AskAddress),
        FormState::AwaitingAddress => (SubscriberPatch::default().address(text), Prompt::AskContact),
        FormState::AwaitingContact => (SubscriberPatch::default().contact(text), Prompt::Completed),
        FormState::Complete => return Decision::quiet(),
    };
    Decision::reply(Write::Patch(patch.state(next)), prompt)
}

/// The prompt that asks for the field `state` is waiting on.
fn ask_for(state: FormState) -> Option<Prompt> {
    match state {
        FormState::AwaitingOrgName => Some(Prompt::AskOrgName),
        FormState::AwaitingAddress => Some(Prompt::AskAddress),
        FormState::AwaitingContact => Some(Prompt::AskContact),
        FormState::Complete => None,
    }
}
