use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use crate::i18n;

/// Command offered as a quick-reply button once the form is complete.
pub const RESET_BUTTON: &str = "/reset";

/// What the bot should say, independent of language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Greeting plus the organization name question (/start).
    Welcome,
    AskOrgName,
    AskAddress,
    AskContact,
    Completed,
    /// Stored profile of a complete subscriber.
    Summary {
        organization_name: String,
        address: String,
        contact: String,
    },
    /// Profile cleared, form restarted (/reset).
    Restarted,
}

/// Quick-reply keyboard change requested alongside a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardHint {
    Unchanged,
    Offer(Vec<String>),
    Clear,
}

/// Platform-neutral outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: KeyboardHint,
}

/// Renders `prompt` in `lang`. `display_name` falls back to a localized
/// placeholder.
pub fn render(prompt: &Prompt, lang: &LanguageIdentifier, display_name: Option<&str>) -> Reply {
    let name = display_name
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| i18n::t(lang, "user-placeholder"));

    let mut args = FluentArgs::new();
    let (key, keyboard) = match prompt {
        Prompt::Welcome => {
            args.set("name", name);
            ("form-welcome", KeyboardHint::Unchanged)
        }
        Prompt::AskOrgName => ("form-ask-org-name", KeyboardHint::Unchanged),
        Prompt::AskAddress => ("form-ask-address", KeyboardHint::Unchanged),
        Prompt::AskContact => ("form-ask-contact", KeyboardHint::Unchanged),
        Prompt::Completed => ("form-completed", reset_offer()),
        Prompt::Summary {
            organization_name,
            address,
            contact,
        } => {
            args.set("name", name);
            args.set("organization", organization_name.clone());
            args.set("address", address.clone());
            args.set("contact", contact.clone());
            ("form-summary", reset_offer())
        }
        Prompt::Restarted => ("form-restarted", KeyboardHint::Clear),
    };

    Reply {
        text: i18n::t_args(lang, key, &args),
        keyboard,
    }
}

fn reset_offer() -> KeyboardHint {
    KeyboardHint::Offer(vec![RESET_BUTTON.to_string()])
}
