//! Arguments for the lifecycle subcommands.

use crate::types::{
    ChecklistSubmission, DelegationOutcome, DelegationSubmission, NewTask, parse_timestamp,
};
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Assignee name
    #[arg(long)]
    pub doer: String,

    #[arg(long)]
    pub description: String,

    /// Due date/time, e.g. 2025-06-10 or 2025-06-10T09:00
    #[arg(long)]
    pub due: String,

    /// "one-time" goes to delegation, anything else to checklist
    #[arg(long, default_value = "daily")]
    pub frequency: String,

    #[arg(long, default_value = "")]
    pub department: String,

    /// Name of the person assigning
    #[arg(long, default_value = "")]
    pub given_by: String,

    #[arg(long)]
    pub reminders: bool,

    #[arg(long)]
    pub require_attachment: bool,
}

impl AssignArgs {
    pub fn to_task(&self) -> Result<NewTask> {
        let due_date = parse_timestamp(&self.due)
            .ok_or_else(|| anyhow!("unrecognised due date '{}'", self.due))?;
        Ok(NewTask {
            department: self.department.clone(),
            given_by: self.given_by.clone(),
            doer: self.doer.clone(),
            description: self.description.clone(),
            due_date,
            frequency: self.frequency.clone(),
            enable_reminders: self.reminders,
            require_attachment: self.require_attachment,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum SubmitCommand {
    /// Record a status for one or more checklist tasks
    Checklist(ChecklistSubmitArgs),

    /// Close or extend a delegation task
    Delegation(DelegationSubmitArgs),
}

#[derive(Args, Debug)]
pub struct ChecklistSubmitArgs {
    /// Task ids
    #[arg(required = true, num_args = 1..)]
    pub task_ids: Vec<i64>,

    /// Status to record, e.g. Yes or No
    #[arg(long, default_value = "Yes")]
    pub status: String,

    #[arg(long)]
    pub remarks: Option<String>,

    /// Image reference
    #[arg(long)]
    pub image: Option<String>,
}

impl ChecklistSubmitArgs {
    pub fn to_submissions(&self) -> Vec<ChecklistSubmission> {
        self.task_ids
            .iter()
            .map(|&task_id| ChecklistSubmission {
                task_id,
                status: self.status.clone(),
                remarks: self.remarks.clone(),
                image: self.image.clone(),
            })
            .collect()
    }
}

#[derive(Args, Debug)]
pub struct DelegationSubmitArgs {
    pub task_id: i64,

    /// Move the task to this date instead of closing it
    #[arg(long, value_name = "DATE")]
    pub extend: Option<String>,

    #[arg(long)]
    pub reason: Option<String>,

    #[arg(long)]
    pub image_url: Option<String>,
}

impl DelegationSubmitArgs {
    pub fn to_submission(&self) -> Result<DelegationSubmission> {
        let outcome = match &self.extend {
            None => DelegationOutcome::Done,
            Some(date) => DelegationOutcome::Extend {
                next_extend_date: Some(
                    parse_timestamp(date)
                        .ok_or_else(|| anyhow!("unrecognised extension date '{}'", date))?,
                ),
            },
        };
        Ok(DelegationSubmission {
            task_id: self.task_id,
            outcome,
            reason: self.reason.clone(),
            image_url: self.image_url.clone(),
        })
    }
}

#[derive(Args, Debug)]
pub struct MarkDoneArgs {
    #[arg(required = true, num_args = 1..)]
    pub task_ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    pub name: String,

    /// Account role (user or admin)
    #[arg(long, default_value = "user")]
    pub account_role: String,

    /// Comma-separated department allow-list
    #[arg(long)]
    pub account_access: Option<String>,

    #[arg(long)]
    pub department: Option<String>,
}
