/// What an inbound chat message asks the relay to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    List,
    Save(&'a str),
}

impl<'a> Command<'a> {
    /// Exact, case-sensitive match on the trimmed text. Anything that is not a
    /// known command is saved as a note. Returns `None` for blank text.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        let command = match text {
            "" => return None,
            "/start" => Self::Start,
            "/list" => Self::List,
            other => Self::Save(other),
        };
        Some(command)
    }
}
