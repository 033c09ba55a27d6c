/// Decides whether a raw sensor line is worth logging.
pub trait LineFilter {
    fn accepts(&self, line: &str) -> bool;
}

impl<F> LineFilter for F
where
    F: Fn(&str) -> bool,
{
    fn accepts(&self, line: &str) -> bool {
        self(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRule {
    /// The marker occurs exactly once, as the first character.
    SoleLeadingMarker(char),
    Prefix(String),
}

impl LineFilter for FilterRule {
    fn accepts(&self, line: &str) -> bool {
        match self {
            FilterRule::SoleLeadingMarker(marker) => line.rfind(*marker) == Some(0),
            FilterRule::Prefix(prefix) => line.starts_with(prefix.as_str()),
        }
    }
}
