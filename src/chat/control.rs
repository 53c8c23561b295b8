//! Control identifiers
//!
//! Chat components dispatch back by `custom_id`. The two-step vote flow is
//! deliberately stateless between round-trips: the chosen vote's id rides in
//! the follow-up control's identifier, never in server-side session state.
//! All parsing and formatting of those identifiers lives here as tagged
//! unions so no call site does its own string splitting.

use crate::history::HistoryRole;

/// A component's `custom_id`, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlId {
    /// History pagination button: `paginate_<role>_<prev|next>_<page>`
    Paginate {
        role: HistoryRole,
        direction: PageDirection,
        page: u32,
    },
    /// Topic selection list for casting a vote: `vote_list`
    VoteList,
    /// Topic selection list for tallying: `tally_list`
    TallyList,
    /// Topic selection list for viewing results: `result_list`
    ResultList,
    /// Option selection for one vote, second step of the vote flow:
    /// `voteoption_<id>`
    VoteOption { create_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Prev,
    Next,
}

impl ControlId {
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "vote_list" => return Some(Self::VoteList),
            "tally_list" => return Some(Self::TallyList),
            "result_list" => return Some(Self::ResultList),
            _ => {}
        }
        if let Some(create_id) = custom_id.strip_prefix("voteoption_") {
            if create_id.is_empty() {
                return None;
            }
            return Some(Self::VoteOption {
                create_id: create_id.to_string(),
            });
        }
        if let Some(rest) = custom_id.strip_prefix("paginate_") {
            let mut parts = rest.split('_');
            let role = HistoryRole::parse(parts.next()?)?;
            let direction = match parts.next()? {
                "prev" => PageDirection::Prev,
                "next" => PageDirection::Next,
                _ => return None,
            };
            let page: u32 = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::Paginate { role, direction, page });
        }
        None
    }

    pub fn to_custom_id(&self) -> String {
        match self {
            Self::Paginate { role, direction, page } => {
                let dir = match direction {
                    PageDirection::Prev => "prev",
                    PageDirection::Next => "next",
                };
                format!("paginate_{}_{}_{}", role.as_str(), dir, page)
            }
            Self::VoteList => "vote_list".to_string(),
            Self::TallyList => "tally_list".to_string(),
            Self::ResultList => "result_list".to_string(),
            Self::VoteOption { create_id } => format!("voteoption_{}", create_id),
        }
    }
}

/// A select menu's chosen value, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectValue {
    /// `votelist_<id>`
    VoteTopic(String),
    /// `tallylist_<id>`
    TallyTopic(String),
    /// `resultlist_<id>`
    ResultTopic(String),
    /// `option_<index>`
    Choice(u32),
}

impl SelectValue {
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(id) = value.strip_prefix("votelist_") {
            return (!id.is_empty()).then(|| Self::VoteTopic(id.to_string()));
        }
        if let Some(id) = value.strip_prefix("tallylist_") {
            return (!id.is_empty()).then(|| Self::TallyTopic(id.to_string()));
        }
        if let Some(id) = value.strip_prefix("resultlist_") {
            return (!id.is_empty()).then(|| Self::ResultTopic(id.to_string()));
        }
        if let Some(index) = value.strip_prefix("option_") {
            return index.parse().ok().map(Self::Choice);
        }
        None
    }

    pub fn to_value(&self) -> String {
        match self {
            Self::VoteTopic(id) => format!("votelist_{}", id),
            Self::TallyTopic(id) => format!("tallylist_{}", id),
            Self::ResultTopic(id) => format!("resultlist_{}", id),
            Self::Choice(index) => format!("option_{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_round_trip() {
        let control = ControlId::Paginate {
            role: HistoryRole::Sender,
            direction: PageDirection::Next,
            page: 3,
        };
        let id = control.to_custom_id();
        assert_eq!(id, "paginate_sender_next_3");
        assert_eq!(ControlId::parse(&id), Some(control));
    }

    #[test]
    fn test_vote_option_carries_the_create_id() {
        let control = ControlId::VoteOption {
            create_id: "8f14e45f-ceea-4672-9b2a-5d1c1f9c0a77".to_string(),
        };
        let parsed = ControlId::parse(&control.to_custom_id());
        assert_eq!(parsed, Some(control));
    }

    #[test]
    fn test_select_values_round_trip() {
        for value in [
            SelectValue::VoteTopic("id1".to_string()),
            SelectValue::TallyTopic("id2".to_string()),
            SelectValue::ResultTopic("id3".to_string()),
            SelectValue::Choice(4),
        ] {
            assert_eq!(SelectValue::parse(&value.to_value()), Some(value));
        }
    }

    #[test]
    fn test_malformed_identifiers_are_rejected() {
        assert_eq!(ControlId::parse("paginate_sender_sideways_3"), None);
        assert_eq!(ControlId::parse("paginate_sender_next"), None);
        assert_eq!(ControlId::parse("voteoption_"), None);
        assert_eq!(ControlId::parse("unknown"), None);
        assert_eq!(SelectValue::parse("option_x"), None);
        assert_eq!(SelectValue::parse("votelist_"), None);
    }
}
