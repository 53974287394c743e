//! Output formatting utilities for markdown and JSON.

use crate::aggregate::{DashboardSummary, DateRangeStats};
use crate::rollup::StaffPage;
use crate::types::{TaskRecord, format_timestamp};
use crate::views::TaskPage;
use serde::Serialize;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Render any serializable value as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or("-").replace('|', "\\|")
}

/// Format the headline counts as markdown.
pub fn format_summary_markdown(title: &str, summary: &DashboardSummary) -> String {
    let mut md = format!("## {}\n", title);
    md.push_str(&format!("- **total**: {}\n", summary.total_tasks));
    md.push_str(&format!("- **completed**: {}\n", summary.completed_tasks));
    md.push_str(&format!("- **pending**: {}\n", summary.pending_tasks));
    md.push_str(&format!("- **overdue**: {}\n", summary.overdue_tasks));
    md.push_str(&format!(
        "- **completion rate**: {:.1}%\n",
        summary.completion_rate
    ));
    if !summary.failed.is_empty() {
        let failed: Vec<String> = summary
            .failed
            .iter()
            .map(|k| format!("{:?}", k).to_lowercase())
            .collect();
        md.push_str(&format!("- **unavailable**: {}\n", failed.join(", ")));
    }
    md
}

/// Format date-range statistics as markdown.
pub fn format_range_stats_markdown(stats: &DateRangeStats) -> String {
    let bound = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    let mut md = format!("## Checklist {} to {}\n", bound(stats.start), bound(stats.end));
    md.push_str(&format!("- **total**: {}\n", stats.total_tasks));
    md.push_str(&format!("- **completed**: {}\n", stats.completed_tasks));
    md.push_str(&format!("- **pending**: {}\n", stats.pending_tasks));
    md.push_str(&format!("- **overdue**: {}\n", stats.overdue_tasks));
    md.push_str(&format!("- **completion rate**: {:.1}%\n", stats.completion_rate));
    md
}

/// Format task rows as a markdown table.
pub fn format_tasks_markdown(tasks: &[TaskRecord]) -> String {
    if tasks.is_empty() {
        return "No tasks found.\n".to_string();
    }
    let mut md = String::from("| id | start | assignee | department | status | description |\n");
    md.push_str("|---:|---|---|---|---|---|\n");
    for task in tasks {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            task.task_id,
            format_timestamp(&task.task_start_date),
            cell(task.name.as_deref()),
            cell(task.department.as_deref()),
            cell(task.status.as_deref()),
            cell(task.task_description.as_deref()),
        ));
    }
    md
}

/// Format one task page, with a paging footer.
pub fn format_task_page_markdown(page: &TaskPage) -> String {
    let mut md = format_tasks_markdown(&page.tasks);
    md.push_str(&format!(
        "\npage {} ({} of {} rows){}\n",
        page.page,
        page.tasks.len(),
        page.total,
        if page.has_more() { ", more available" } else { "" }
    ));
    md
}

/// Format a staff rollup page as a markdown table.
pub fn format_staff_markdown(page: &StaffPage) -> String {
    if page.staff.is_empty() {
        return "No staff found.\n".to_string();
    }
    let mut md = String::from("| staff | total | completed | pending | progress |\n");
    md.push_str("|---|---:|---:|---:|---:|\n");
    for s in &page.staff {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {}% |\n",
            cell(Some(&s.name)),
            s.total_tasks,
            s.completed_tasks,
            s.pending_tasks,
            s.progress
        ));
    }
    if let Some(total) = page.total_staff {
        md.push_str(&format!("\n{} staff in total", total));
        if let Some(users) = page.total_users {
            md.push_str(&format!(", {} users", users));
        }
        md.push('\n');
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;

    #[test]
    fn pipes_are_escaped_in_cells() {
        let mut task = TaskRecord::new(7, "Ravi", parse_timestamp("2025-06-10T09:00").unwrap());
        task.task_description = Some("check a|b".into());
        let md = format_tasks_markdown(&[task]);
        assert!(md.contains("| 7 | 2025-06-10T09:00:00 | Ravi | - | - | check a\\|b |"));
    }

    #[test]
    fn summary_lists_unavailable_counts() {
        let summary = DashboardSummary {
            total_tasks: 4,
            completed_tasks: 1,
            pending_tasks: 0,
            overdue_tasks: 0,
            completion_rate: 25.0,
            failed: vec![crate::aggregate::CountKind::Pending],
        };
        let md = format_summary_markdown("Checklist", &summary);
        assert!(md.contains("- **completion rate**: 25.0%"));
        assert!(md.contains("- **unavailable**: pending"));
    }
}
