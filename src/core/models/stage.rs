use std::fmt;

/// Position of an encryption run in the linear pipeline.
///
/// Each stage is a strict prerequisite for the next one. There is no
/// way back: a failed step aborts the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    KeyImported,
    RecipientResolved,
    Encrypted,
    Done,
}

impl Stage {
    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Uninitialized => Some(Stage::KeyImported),
            Stage::KeyImported => Some(Stage::RecipientResolved),
            Stage::RecipientResolved => Some(Stage::Encrypted),
            Stage::Encrypted => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Uninitialized => "uninitialized",
            Stage::KeyImported => "key-imported",
            Stage::RecipientResolved => "recipient-resolved",
            Stage::Encrypted => "encrypted",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}
