//! Store-backed dashboards built on the aggregation engine.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{
    aggregate_entries, chart_series, sort_user_aggs, totals, ChartPoint, OverallAgg, Totals,
    UserAgg, UserAggColumn,
};
use crate::auth::AuthContext;
use crate::date_range::DateRange;
use crate::error::SharetrackError;
use crate::paging::{paginate, Page, SortDirection, SortState};
use crate::store::{EntryFilter, RecordStore};
use crate::types::{Entry, Person};

/// Number of entries shown in the "recent" list of a personal dashboard.
pub const RECENT_ENTRIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalDashboard {
    pub person: Person,
    pub range: DateRange,
    pub totals: Totals,
    pub chart: Vec<ChartPoint>,
    /// Most recent entries regardless of the range.
    pub recent: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminDashboard {
    pub range: DateRange,
    pub overall: OverallAgg,
    pub chart: Vec<ChartPoint>,
    pub sort_column: String,
    pub sort_direction: SortDirection,
    pub leaderboard: Page<UserAgg>,
}

/// Dashboard for the caller, or for another person when `person_id` is given.
pub fn personal_dashboard<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    person_id: Option<&str>,
    range: DateRange,
) -> Result<PersonalDashboard, SharetrackError> {
    let person = match person_id {
        Some(id) if id != ctx.person_id() => store
            .get_person(id)?
            .ok_or_else(|| SharetrackError::NotFound(format!("person '{}'", id)))?,
        _ => ctx.person.clone(),
    };

    let in_range = store.query_entries(&EntryFilter {
        person_id: Some(person.id.clone()),
        start: range.start,
        end: range.end,
        direction: SortDirection::Asc,
        limit: None,
    })?;
    let recent = store.query_entries(&EntryFilter {
        person_id: Some(person.id.clone()),
        direction: SortDirection::Desc,
        limit: Some(RECENT_ENTRIES),
        ..Default::default()
    })?;

    Ok(PersonalDashboard {
        totals: totals(&in_range),
        chart: chart_series(&in_range),
        person,
        range,
        recent,
    })
}

/// Organization-wide totals, chart and a sorted, paginated leaderboard. Admin only.
pub fn admin_dashboard<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    range: DateRange,
    sort: SortState<UserAggColumn>,
    page: usize,
    page_size: usize,
) -> Result<AdminDashboard, SharetrackError> {
    ctx.require_admin()?;

    let names: HashMap<String, String> = store
        .list_people()?
        .into_iter()
        .map(|p| (p.id, p.full_name))
        .collect();
    let entries = store.query_entries(&EntryFilter {
        start: range.start,
        end: range.end,
        direction: SortDirection::Asc,
        ..Default::default()
    })?;

    let mut agg = aggregate_entries(&entries, &names, &range);
    sort_user_aggs(&mut agg.by_user, sort);
    tracing::debug!(
        "Aggregated {} entries into {} leaderboard rows",
        agg.overall.entries,
        agg.by_user.len()
    );

    Ok(AdminDashboard {
        range,
        overall: agg.overall,
        chart: agg.chart,
        sort_column: sort.column.to_string(),
        sort_direction: sort.direction,
        leaderboard: paginate(&agg.by_user, page, page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{resolve_session, Session};
    use crate::date_range::{date_range, RangeKey};
    use crate::db::Db;
    use crate::types::{NewEntry, NewPerson, Role};
    use chrono::NaiveDate;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn ctx(db: &Db, id: &str, email: &str, role: Option<Role>) -> AuthContext {
        resolve_session(
            db,
            Session {
                user_id: id.into(),
                email: email.into(),
                full_name: None,
                role_claim: role,
            },
        )
        .unwrap()
    }

    fn add(db: &Db, person_id: &str, date: &str, reached: i64, responses: i64) {
        db.insert_entry(&NewEntry {
            person_id: person_id.into(),
            entry_date: date.into(),
            number_reached: reached,
            church_invite: true,
            spiritual_conversation: false,
            story_share: false,
            gospel_presentation: false,
            gospel_response: responses > 0,
            number_response: responses,
            notes: None,
        })
        .unwrap();
    }

    #[test]
    fn test_personal_dashboard_range_and_recent() {
        let db = open_test_db();
        let me = ctx(&db, "u1", "me@example.com", None);
        add(&db, "u1", "2024-05-01", 5, 0);
        add(&db, "u1", "2024-05-13", 4, 2);
        add(&db, "u1", "2024-05-14", 6, 0);
        add(&db, "u1", "2024-05-14", 1, 1);

        let week = date_range(RangeKey::ThisWeek, NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        let dash = personal_dashboard(&db, &me, None, week).unwrap();

        assert_eq!(dash.totals.total_reached, 11);
        assert_eq!(dash.totals.gospel_responses, 3);
        assert_eq!(dash.chart.len(), 2);
        assert_eq!(dash.recent.len(), RECENT_ENTRIES);
        assert_eq!(dash.recent[0].entry_date, "2024-05-14");
        assert_eq!(dash.recent[2].entry_date, "2024-05-13");
    }

    #[test]
    fn test_personal_dashboard_for_other_person() {
        let db = open_test_db();
        let me = ctx(&db, "u1", "me@example.com", None);
        let other = db
            .insert_person(&NewPerson {
                id: None,
                email: "other@example.com".into(),
                full_name: "Other".into(),
                role: Role::User,
            })
            .unwrap();
        add(&db, &other.id, "2024-05-01", 9, 0);

        let dash = personal_dashboard(&db, &me, Some(&other.id), DateRange::all_time()).unwrap();
        assert_eq!(dash.person.full_name, "Other");
        assert_eq!(dash.totals.total_reached, 9);

        assert!(matches!(
            personal_dashboard(&db, &me, Some("missing"), DateRange::all_time()),
            Err(SharetrackError::NotFound(_))
        ));
    }

    #[test]
    fn test_admin_dashboard_requires_admin() {
        let db = open_test_db();
        let user = ctx(&db, "u1", "me@example.com", None);
        let result = admin_dashboard(
            &db,
            &user,
            DateRange::all_time(),
            SortState::new(UserAggColumn::TotalReached, SortDirection::Desc),
            1,
            10,
        );
        assert!(matches!(result, Err(SharetrackError::Forbidden(_))));
    }

    #[test]
    fn test_admin_dashboard_sorts_and_paginates() {
        let db = open_test_db();
        let admin = ctx(&db, "admin", "boss@example.com", Some(Role::Admin));
        for (i, reached) in [3, 9, 1].iter().enumerate() {
            let p = db
                .insert_person(&NewPerson {
                    id: Some(format!("p{}", i)),
                    email: format!("p{}@example.com", i),
                    full_name: format!("person {}", i),
                    role: Role::User,
                })
                .unwrap();
            add(&db, &p.id, "2024-05-14", *reached, 0);
        }
        add(&db, "admin", "2024-05-13", 2, 0);

        let dash = admin_dashboard(
            &db,
            &admin,
            DateRange::all_time(),
            SortState::new(UserAggColumn::TotalReached, SortDirection::Desc),
            1,
            2,
        )
        .unwrap();

        assert_eq!(dash.overall.unique_users, 4);
        assert_eq!(dash.overall.total_reached, 15);
        assert_eq!(dash.leaderboard.total, 4);
        assert_eq!(dash.leaderboard.total_pages(), 2);
        let names: Vec<&str> = dash
            .leaderboard
            .items
            .iter()
            .map(|u| u.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Person 1", "Person 0"]);
        assert_eq!(dash.sort_column, "total_reached");
    }
}
