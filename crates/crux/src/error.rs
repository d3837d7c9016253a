use thiserror::Error;

/// Errors raised by the object model.
///
/// Host code reports its own failures from hooks, handlers and behaviors with
/// [`Error::host`]; the core never catches them, so they surface at whichever
/// call started the delivery.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot remove a listener without an event")]
    ListenerWithoutEvent,
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    #[error("unknown member `{0}`")]
    UnknownMember(String),
    #[error("`{0}` is a reserved member name")]
    ReservedName(String),
    #[error("invalid member name `{0}`")]
    InvalidMemberName(String),
    #[error("`{name}` is inherited from `{class}` with a different member kind")]
    MemberKindConflict { name: String, class: String },
    #[error("invalid setter options: {0}")]
    InvalidSetOptions(#[source] serde_json::Error),
    #[error("malformed change set: {0}")]
    MalformedChangeSet(String),
    #[error("{0}")]
    Host(String),
}

impl Error {
    pub fn host(message: impl std::fmt::Display) -> Self {
        Error::Host(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
