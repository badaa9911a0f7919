//! Reporting rollups over share entries.
//!
//! Everything here is a pure function of the entries, the person-name map,
//! and the date window. Results are recomputed on every load and never stored.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::date_range::DateRange;
use crate::error::SharetrackError;
use crate::paging::{SortDirection, SortState};
use crate::types::{title_case, Entry};

/// Contributor key for entries with neither a person nor a user id.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Totals across every entry in the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverallAgg {
    pub unique_users: usize,
    pub entries: usize,
    pub total_reached: i64,
    pub total_responses: i64,
    pub invites_reached: i64,
    pub conversations_reached: i64,
    pub story_share_reached: i64,
    pub gospel_share_reached: i64,
}

/// One day of the chart series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub reached: i64,
    pub responses: i64,
}

/// Per-contributor leaderboard row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgg {
    pub user_id: String,
    pub display_name: String,
    pub entries: usize,
    pub total_reached: i64,
    pub total_responses: i64,
    pub invites_reached: i64,
    pub conversations_reached: i64,
    pub story_share_reached: i64,
    pub gospel_share_reached: i64,
}

/// Personal dashboard summary cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_reached: i64,
    pub gospel_responses: i64,
    pub invites_reached: i64,
    pub conversations_reached: i64,
    pub story_share_reached: i64,
    pub gospel_share_reached: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub overall: OverallAgg,
    pub chart: Vec<ChartPoint>,
    pub by_user: Vec<UserAgg>,
}

/// Identity an entry is credited to: `person_id`, then `user_id`, then anonymous.
pub fn contributor_key(entry: &Entry) -> &str {
    entry
        .person_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| entry.user_id.as_deref().filter(|id| !id.is_empty()))
        .unwrap_or(ANONYMOUS_KEY)
}

/// Title-cased display name for a contributor key.
///
/// Unknown ids fall back to their first 8 characters.
pub fn format_display_name(id: &str, names: &HashMap<String, String>) -> String {
    if id.is_empty() || id == ANONYMOUS_KEY {
        return "Anonymous".to_string();
    }
    match names.get(id).filter(|n| !n.is_empty()) {
        Some(name) => title_case(name),
        None => title_case(&id.chars().take(8).collect::<String>()),
    }
}

// Reach credited to each share type; flags are independent so one entry can
// land in several buckets.
fn flag_reach(entry: &Entry) -> [i64; 4] {
    let reach = entry.number_reached;
    [
        if entry.church_invite { reach } else { 0 },
        if entry.spiritual_conversation { reach } else { 0 },
        if entry.story_share { reach } else { 0 },
        if entry.gospel_presentation { reach } else { 0 },
    ]
}

/// Single pass producing the overall totals, the per-day series and the
/// leaderboard (sorted by `total_reached` descending, ties in first-seen order).
pub fn aggregate_entries(
    entries: &[Entry],
    names: &HashMap<String, String>,
    range: &DateRange,
) -> Aggregates {
    let mut overall = OverallAgg::default();
    let mut by_date: BTreeMap<String, ChartPoint> = BTreeMap::new();
    let mut by_user: Vec<UserAgg> = Vec::new();
    let mut user_index: HashMap<String, usize> = HashMap::new();
    let mut unique: HashSet<String> = HashSet::new();

    for entry in entries.iter().filter(|e| range.contains(&e.entry_date)) {
        let reached = entry.number_reached;
        let responses = entry.effective_responses();
        let [invites, conversations, stories, gospel] = flag_reach(entry);

        overall.entries += 1;
        overall.total_reached += reached;
        overall.total_responses += responses;
        overall.invites_reached += invites;
        overall.conversations_reached += conversations;
        overall.story_share_reached += stories;
        overall.gospel_share_reached += gospel;

        let point = by_date
            .entry(entry.entry_date.clone())
            .or_insert_with(|| ChartPoint {
                date: entry.entry_date.clone(),
                ..Default::default()
            });
        point.reached += reached;
        point.responses += responses;

        let key = contributor_key(entry);
        if key != ANONYMOUS_KEY {
            unique.insert(key.to_string());
        }
        let idx = *user_index.entry(key.to_string()).or_insert_with(|| {
            by_user.push(UserAgg {
                user_id: key.to_string(),
                display_name: format_display_name(key, names),
                ..Default::default()
            });
            by_user.len() - 1
        });
        let row = &mut by_user[idx];
        row.entries += 1;
        row.total_reached += reached;
        row.total_responses += responses;
        row.invites_reached += invites;
        row.conversations_reached += conversations;
        row.story_share_reached += stories;
        row.gospel_share_reached += gospel;
    }

    overall.unique_users = unique.len();
    by_user.sort_by(|a, b| b.total_reached.cmp(&a.total_reached));

    Aggregates {
        overall,
        chart: by_date.into_values().collect(),
        by_user,
    }
}

/// Per-day series, ascending by date, with one point per distinct date.
pub fn chart_series(entries: &[Entry]) -> Vec<ChartPoint> {
    let mut by_date: BTreeMap<&str, ChartPoint> = BTreeMap::new();
    for entry in entries {
        let point = by_date
            .entry(entry.entry_date.as_str())
            .or_insert_with(|| ChartPoint {
                date: entry.entry_date.clone(),
                ..Default::default()
            });
        point.reached += entry.number_reached;
        point.responses += entry.effective_responses();
    }
    by_date.into_values().collect()
}

pub fn totals(entries: &[Entry]) -> Totals {
    entries.iter().fold(Totals::default(), |mut acc, entry| {
        let [invites, conversations, stories, gospel] = flag_reach(entry);
        acc.total_reached += entry.number_reached;
        acc.gospel_responses += entry.effective_responses();
        acc.invites_reached += invites;
        acc.conversations_reached += conversations;
        acc.story_share_reached += stories;
        acc.gospel_share_reached += gospel;
        acc
    })
}

/// Leaderboard columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserAggColumn {
    UserId,
    DisplayName,
    Entries,
    #[default]
    TotalReached,
    TotalResponses,
    InvitesReached,
    ConversationsReached,
    StoryShareReached,
    GospelShareReached,
}

impl UserAggColumn {
    pub const ALL: [UserAggColumn; 9] = [
        Self::UserId,
        Self::DisplayName,
        Self::Entries,
        Self::TotalReached,
        Self::TotalResponses,
        Self::InvitesReached,
        Self::ConversationsReached,
        Self::StoryShareReached,
        Self::GospelShareReached,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::DisplayName => "display_name",
            Self::Entries => "entries",
            Self::TotalReached => "total_reached",
            Self::TotalResponses => "total_responses",
            Self::InvitesReached => "invites_reached",
            Self::ConversationsReached => "conversations_reached",
            Self::StoryShareReached => "story_share_reached",
            Self::GospelShareReached => "gospel_share_reached",
        }
    }

    fn numeric(&self, row: &UserAgg) -> i64 {
        match self {
            Self::Entries => row.entries as i64,
            Self::TotalReached => row.total_reached,
            Self::TotalResponses => row.total_responses,
            Self::InvitesReached => row.invites_reached,
            Self::ConversationsReached => row.conversations_reached,
            Self::StoryShareReached => row.story_share_reached,
            Self::GospelShareReached => row.gospel_share_reached,
            Self::UserId | Self::DisplayName => 0,
        }
    }

    fn compare(&self, a: &UserAgg, b: &UserAgg) -> Ordering {
        match self {
            Self::UserId => a.user_id.cmp(&b.user_id),
            Self::DisplayName => a.display_name.cmp(&b.display_name),
            _ => self.numeric(a).cmp(&self.numeric(b)),
        }
    }
}

impl fmt::Display for UserAggColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserAggColumn {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                SharetrackError::InvalidInput(format!(
                    "unknown leaderboard column '{}'. Valid values: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Stable sort of leaderboard rows by the selected column.
pub fn sort_user_aggs(rows: &mut [UserAgg], sort: SortState<UserAggColumn>) {
    rows.sort_by(|a, b| {
        let ord = sort.column.compare(a, b);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(person: Option<&str>, date: &str, reached: i64) -> Entry {
        Entry {
            id: format!("e-{}-{}", date, reached),
            person_id: person.map(String::from),
            user_id: None,
            entry_date: date.to_string(),
            number_reached: reached,
            church_invite: false,
            spiritual_conversation: false,
            story_share: false,
            gospel_presentation: false,
            gospel_response: false,
            number_response: 0,
            notes: None,
            created_at: None,
        }
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("p1".to_string(), "ann LEE".to_string()),
            ("p2".to_string(), "bob".to_string()),
        ])
    }

    #[test]
    fn flag_sums_use_reach_and_overlap() {
        let mut a = entry(Some("p1"), "2024-01-05", 10);
        a.church_invite = true;
        a.story_share = true;
        let mut b = entry(Some("p2"), "2024-01-06", 4);
        b.church_invite = true;
        b.gospel_presentation = true;

        let agg = aggregate_entries(&[a, b], &names(), &DateRange::all_time());
        assert_eq!(agg.overall.invites_reached, 14);
        assert_eq!(agg.overall.story_share_reached, 10);
        assert_eq!(agg.overall.gospel_share_reached, 4);
        assert_eq!(agg.overall.conversations_reached, 0);
        assert_eq!(agg.overall.total_reached, 14);
    }

    #[test]
    fn responses_ignored_without_flag() {
        let mut a = entry(Some("p1"), "2024-01-05", 10);
        a.number_response = 5;
        let mut b = entry(Some("p1"), "2024-01-05", 10);
        b.gospel_response = true;
        b.number_response = 3;

        let agg = aggregate_entries(&[a, b], &names(), &DateRange::all_time());
        assert_eq!(agg.overall.total_responses, 3);
        assert_eq!(agg.by_user[0].total_responses, 3);
        assert_eq!(agg.chart[0].responses, 3);
    }

    #[test]
    fn same_date_merges_into_one_chart_point() {
        let entries = vec![
            entry(Some("p1"), "2024-01-07", 2),
            entry(Some("p2"), "2024-01-05", 3),
            entry(Some("p2"), "2024-01-07", 5),
        ];
        let agg = aggregate_entries(&entries, &names(), &DateRange::all_time());
        assert_eq!(
            agg.chart,
            vec![
                ChartPoint {
                    date: "2024-01-05".into(),
                    reached: 3,
                    responses: 0
                },
                ChartPoint {
                    date: "2024-01-07".into(),
                    reached: 7,
                    responses: 0
                },
            ]
        );
    }

    #[test]
    fn user_totals_sum_to_overall() {
        let entries = vec![
            entry(Some("p1"), "2024-01-05", 3),
            entry(Some("p2"), "2024-01-05", 8),
            entry(Some("p1"), "2024-01-06", 4),
        ];
        let agg = aggregate_entries(&entries, &names(), &DateRange::all_time());
        let sum: i64 = agg.by_user.iter().map(|u| u.total_reached).sum();
        assert_eq!(sum, agg.overall.total_reached);
        assert_eq!(agg.overall.unique_users, 2);
        assert_eq!(agg.by_user[0].user_id, "p2");
        assert_eq!(agg.by_user[1].entries, 2);
    }

    #[test]
    fn identity_fallback_and_anonymous_bucket() {
        let mut legacy = entry(None, "2024-01-05", 6);
        legacy.user_id = Some("u-legacy-1234".into());
        let anon = entry(None, "2024-01-05", 2);

        let agg = aggregate_entries(&[legacy, anon], &names(), &DateRange::all_time());
        assert_eq!(agg.overall.unique_users, 1);
        assert_eq!(agg.overall.entries, 2);
        let anon_row = agg.by_user.iter().find(|u| u.user_id == ANONYMOUS_KEY).unwrap();
        assert_eq!(anon_row.display_name, "Anonymous");
        assert_eq!(anon_row.total_reached, 2);
        let legacy_row = agg.by_user.iter().find(|u| u.user_id == "u-legacy-1234").unwrap();
        assert_eq!(legacy_row.display_name, "U-legacy");
    }

    #[test]
    fn window_filters_entries() {
        let range = DateRange {
            label: "Custom".into(),
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 6),
            end: None,
        };
        let entries = vec![
            entry(Some("p1"), "2024-01-05", 3),
            entry(Some("p1"), "2024-01-06", 4),
        ];
        let agg = aggregate_entries(&entries, &names(), &range);
        assert_eq!(agg.overall.entries, 1);
        assert_eq!(agg.overall.total_reached, 4);
    }

    #[test]
    fn display_names() {
        let map = names();
        assert_eq!(format_display_name("p1", &map), "Ann Lee");
        assert_eq!(format_display_name("abcdefghijkl", &map), "Abcdefgh");
        assert_eq!(format_display_name("", &map), "Anonymous");
        assert_eq!(format_display_name(ANONYMOUS_KEY, &map), "Anonymous");
    }

    #[test]
    fn empty_input_yields_empty_aggregates() {
        let agg = aggregate_entries(&[], &names(), &DateRange::all_time());
        assert_eq!(agg, Aggregates::default());
    }

    #[test]
    fn totals_match_personal_cards() {
        let mut a = entry(Some("p1"), "2024-01-05", 10);
        a.church_invite = true;
        a.gospel_response = true;
        a.number_response = 3;
        let mut b = entry(Some("p1"), "2024-01-06", 5);
        b.spiritual_conversation = true;
        b.number_response = 9;

        let t = totals(&[a, b]);
        assert_eq!(
            t,
            Totals {
                total_reached: 15,
                gospel_responses: 3,
                invites_reached: 10,
                conversations_reached: 5,
                story_share_reached: 0,
                gospel_share_reached: 0,
            }
        );
    }

    #[test]
    fn sort_by_name_and_numeric() {
        let mut rows = vec![
            UserAgg {
                user_id: "a".into(),
                display_name: "Zoe".into(),
                entries: 1,
                total_reached: 5,
                ..Default::default()
            },
            UserAgg {
                user_id: "b".into(),
                display_name: "Amy".into(),
                entries: 3,
                total_reached: 2,
                ..Default::default()
            },
        ];
        sort_user_aggs(
            &mut rows,
            SortState::new(UserAggColumn::DisplayName, SortDirection::Asc),
        );
        assert_eq!(rows[0].display_name, "Amy");
        sort_user_aggs(
            &mut rows,
            SortState::new(UserAggColumn::TotalReached, SortDirection::Desc),
        );
        assert_eq!(rows[0].display_name, "Zoe");
        sort_user_aggs(
            &mut rows,
            SortState::new(UserAggColumn::Entries, SortDirection::Desc),
        );
        assert_eq!(rows[0].entries, 3);
    }

    #[test]
    fn column_parse() {
        assert_eq!(
            "total-reached".parse::<UserAggColumn>().unwrap(),
            UserAggColumn::TotalReached
        );
        assert!("score".parse::<UserAggColumn>().is_err());
    }
}
