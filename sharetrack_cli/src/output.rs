use anyhow::Result;
use serde::Serialize;
use sharetrack_lib::aggregate::{ChartPoint, OverallAgg, Totals, UserAgg};
use sharetrack_lib::types::{truncate_notes, Entry, Person};
use sharetrack_lib::CsvPreview;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
pub struct PersonRow {
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    #[serde(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    #[serde(rename = "Role")]
    role: String,
    #[tabled(rename = "Created")]
    #[serde(rename = "Created")]
    created: String,
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Tabled, Serialize)]
pub struct EntryRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Reached")]
    #[serde(rename = "Reached")]
    reached: i64,
    #[tabled(rename = "Shared")]
    #[serde(rename = "Shared")]
    shared: String,
    #[tabled(rename = "Responses")]
    #[serde(rename = "Responses")]
    responses: i64,
    #[tabled(rename = "Notes")]
    #[serde(rename = "Notes")]
    notes: String,
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Tabled, Serialize)]
pub struct LeaderRow {
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Entries")]
    #[serde(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Reached")]
    #[serde(rename = "Reached")]
    reached: i64,
    #[tabled(rename = "Responses")]
    #[serde(rename = "Responses")]
    responses: i64,
    #[tabled(rename = "Invites")]
    #[serde(rename = "Invites")]
    invites: i64,
    #[tabled(rename = "Conversations")]
    #[serde(rename = "Conversations")]
    conversations: i64,
    #[tabled(rename = "Stories")]
    #[serde(rename = "Stories")]
    stories: i64,
    #[tabled(rename = "Gospel")]
    #[serde(rename = "Gospel")]
    gospel: i64,
}

#[derive(Tabled, Serialize)]
pub struct ChartRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Reached")]
    #[serde(rename = "Reached")]
    reached: i64,
    #[tabled(rename = "Responses")]
    #[serde(rename = "Responses")]
    responses: i64,
}

#[derive(Tabled, Serialize)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: i64,
}

// -- Row builders --

pub fn build_person_rows(people: &[Person]) -> Vec<PersonRow> {
    people
        .iter()
        .map(|p| PersonRow {
            name: p.full_name.clone(),
            email: p.email.clone(),
            role: p.role.to_string(),
            created: p.created_at.chars().take(10).collect(),
            id: p.id.clone(),
        })
        .collect()
}

fn share_types(e: &Entry) -> String {
    let mut kinds = Vec::new();
    if e.church_invite {
        kinds.push("invite");
    }
    if e.spiritual_conversation {
        kinds.push("conversation");
    }
    if e.story_share {
        kinds.push("story");
    }
    if e.gospel_presentation {
        kinds.push("gospel");
    }
    if kinds.is_empty() {
        "-".to_string()
    } else {
        kinds.join(", ")
    }
}

pub fn build_entry_rows(entries: &[Entry]) -> Vec<EntryRow> {
    entries
        .iter()
        .map(|e| EntryRow {
            date: e.entry_date.clone(),
            reached: e.number_reached,
            shared: share_types(e),
            responses: e.effective_responses(),
            notes: truncate_notes(e.notes.as_deref()),
            id: e.id.clone(),
        })
        .collect()
}

pub fn build_leader_rows(users: &[UserAgg]) -> Vec<LeaderRow> {
    users
        .iter()
        .map(|u| LeaderRow {
            name: u.display_name.clone(),
            entries: u.entries,
            reached: u.total_reached,
            responses: u.total_responses,
            invites: u.invites_reached,
            conversations: u.conversations_reached,
            stories: u.story_share_reached,
            gospel: u.gospel_share_reached,
        })
        .collect()
}

pub fn build_chart_rows(points: &[ChartPoint]) -> Vec<ChartRow> {
    points
        .iter()
        .map(|p| ChartRow {
            date: p.date.clone(),
            reached: p.reached,
            responses: p.responses,
        })
        .collect()
}

pub fn build_totals_rows(t: &Totals) -> Vec<MetricRow> {
    vec![
        MetricRow { metric: "Total Reached", value: t.total_reached },
        MetricRow { metric: "Gospel Responses", value: t.gospel_responses },
        MetricRow { metric: "Church Invites", value: t.invites_reached },
        MetricRow { metric: "Spiritual Conversations", value: t.conversations_reached },
        MetricRow { metric: "Story Shares", value: t.story_share_reached },
        MetricRow { metric: "Gospel Presentations", value: t.gospel_share_reached },
    ]
}

pub fn build_overall_rows(o: &OverallAgg) -> Vec<MetricRow> {
    vec![
        MetricRow { metric: "Active Users", value: o.unique_users as i64 },
        MetricRow { metric: "Entries", value: o.entries as i64 },
        MetricRow { metric: "Total Reached", value: o.total_reached },
        MetricRow { metric: "Total Responses", value: o.total_responses },
        MetricRow { metric: "Church Invites", value: o.invites_reached },
        MetricRow { metric: "Spiritual Conversations", value: o.conversations_reached },
        MetricRow { metric: "Story Shares", value: o.story_share_reached },
        MetricRow { metric: "Gospel Presentations", value: o.gospel_share_reached },
    ]
}

// -- Rendering --

fn render_markdown<T: Tabled>(rows: &[T]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

fn render_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV output: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Print rows in a non-JSON format. JSON callers print the domain value with
/// [`print_json`] instead.
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Markdown => println!("{}", render_markdown(rows)),
        OutputFormat::Csv => print!("{}", render_csv(rows)?),
        OutputFormat::Table | OutputFormat::Json => println!("{}", Table::new(rows)),
    }
    Ok(())
}

/// Section heading for multi-table views; omitted for CSV so the output stays parseable.
pub fn print_heading(title: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Markdown => println!("\n### {}\n", title),
        OutputFormat::Table => println!("\n{}", title),
        OutputFormat::Csv | OutputFormat::Json => {}
    }
}

/// Import preview with the file's own headers.
pub fn render_preview(preview: &CsvPreview) -> String {
    let mut builder = Builder::default();
    builder.push_record(preview.headers.iter().cloned());
    for row in &preview.rows {
        builder.push_record(
            preview
                .headers
                .iter()
                .map(|h| row.get(h).cloned().unwrap_or_default()),
        );
    }
    builder.build().to_string()
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharetrack_lib::types::Role;
    use std::collections::HashMap;

    fn person() -> Person {
        Person {
            id: "p-123".into(),
            email: "ann@example.com".into(),
            full_name: "Ann Lee".into(),
            created_at: "2024-03-01T10:00:00.000Z".into(),
            role: Role::Admin,
        }
    }

    fn entry() -> Entry {
        Entry {
            id: "e-1".into(),
            person_id: Some("p-123".into()),
            user_id: None,
            entry_date: "2024-03-02".into(),
            number_reached: 8,
            church_invite: true,
            spiritual_conversation: false,
            story_share: true,
            gospel_presentation: false,
            gospel_response: false,
            number_response: 4,
            notes: Some("Talked with neighbors after church".into()),
            created_at: None,
        }
    }

    #[test]
    fn test_build_person_rows() {
        let rows = build_person_rows(&[person()]);
        assert_eq!(rows[0].role, "admin");
        assert_eq!(rows[0].created, "2024-03-01");
    }

    #[test]
    fn test_build_entry_rows() {
        let rows = build_entry_rows(&[entry()]);
        assert_eq!(rows[0].shared, "invite, story");
        assert_eq!(rows[0].responses, 0);
        assert_eq!(rows[0].notes, "Talked with neighbor...");
    }

    #[test]
    fn test_build_entry_rows_empty() {
        assert!(build_entry_rows(&[]).is_empty());
    }

    #[test]
    fn test_csv_person_headers() {
        let csv = render_csv(&build_person_rows(&[person()])).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, "Name,Email,Role,Created,ID");
    }

    #[test]
    fn test_csv_leader_headers() {
        let users = vec![UserAgg {
            user_id: "p-123".into(),
            display_name: "Ann Lee".into(),
            entries: 2,
            total_reached: 10,
            ..Default::default()
        }];
        let csv = render_csv(&build_leader_rows(&users)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Entries,Reached,Responses,Invites,Conversations,Stories,Gospel"
        );
        assert_eq!(lines.next().unwrap(), "Ann Lee,2,10,0,0,0,0,0");
    }

    #[test]
    fn test_markdown_entries_structure() {
        let md = render_markdown(&build_entry_rows(&[entry()]));
        assert!(md.contains('|'));
        assert!(md.contains("---"));
        assert!(md.contains("Reached"));
        assert!(md.contains("2024-03-02"));
    }

    #[test]
    fn test_totals_rows_cover_every_card() {
        let rows = build_totals_rows(&Totals {
            total_reached: 5,
            ..Default::default()
        });
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].value, 5);
    }

    #[test]
    fn test_preview_uses_file_headers() {
        let preview = CsvPreview {
            headers: vec!["email".into(), "full_name".into()],
            rows: vec![HashMap::from([
                ("email".to_string(), "a@b.com".to_string()),
                ("full_name".to_string(), "Ann".to_string()),
            ])],
            total_rows: 1,
        };
        let text = render_preview(&preview);
        let header_line = text.lines().nth(1).unwrap();
        assert!(header_line.contains("email"));
        assert!(header_line.contains("full_name"));
        assert!(text.contains("a@b.com"));
    }
}
