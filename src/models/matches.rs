use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Ongoing,
    Finished,
    Crashed,
}

impl MatchStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Finished => "finished",
            MatchStatus::Crashed => "crashed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Ongoing)
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(MatchStatus::Ongoing),
            "finished" => Ok(MatchStatus::Finished),
            "crashed" => Ok(MatchStatus::Crashed),
            _ => Err(anyhow::anyhow!("unknown match status {s:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatStatus {
    Ongoing,
    Disconnected,
    Finished,
}

impl StatStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatStatus::Ongoing => "ongoing",
            StatStatus::Disconnected => "disconnected",
            StatStatus::Finished => "finished",
        }
    }
}
