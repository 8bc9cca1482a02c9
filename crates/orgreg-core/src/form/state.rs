use strum::{EnumString, IntoStaticStr};

/// Position of a subscriber within the registration form.
///
/// The order of the variants is the order of the form; `Complete` is stored
/// as NULL in the `state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FormState {
    AwaitingOrgName,
    AwaitingAddress,
    AwaitingContact,
    Complete,
}

impl FormState {
    /// Column value for this state (`None` means NULL).
    pub fn to_column(self) -> Option<&'static str> {
        match self {
            FormState::Complete => None,
            other => Some(other.into()),
        }
    }

    /// Parses a `state` column value.
    ///
    /// Returns `None` for a value outside the known set; callers treat that
    /// as quiescent.
    pub fn from_column(value: Option<&str>) -> Option<FormState> {
        match value {
            None => Some(FormState::Complete),
            Some(raw) => raw.parse().ok().filter(|state| *state != FormState::Complete),
        }
    }

    /// The state that follows this one after its field has been written.
    pub fn next(self) -> FormState {
        match self {
            FormState::AwaitingOrgName => FormState::AwaitingAddress,
            FormState::AwaitingAddress => FormState::AwaitingContact,
            FormState::AwaitingContact | FormState::Complete => FormState::Complete,
        }
    }
}
