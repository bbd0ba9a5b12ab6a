//! Ticket form model, payload types, and quality scoring
//!
//! `TaskPayload` is the immutable request unit submitted to a channel and
//! is wire-compatible with the automation webhook body. `TicketForm` is
//! the editable draft the CLI loads from YAML, with the structured summary
//! segments and the weighted completeness score.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use settingstore::Lang;

/// What the backend automation should do with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Analyze,
    Create,
    Coach,
    Preview,
}

/// Request metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMeta {
    pub source: String,
    pub timestamp: i64,
    pub action: ActionType,
}

/// Ticket fields as submitted to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketData {
    pub project_key: String,
    pub project_name: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub assignee: String,
    pub estimated_points: u32,
}

/// The immutable request unit submitted to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub meta: PayloadMeta,
    pub data: TicketData,
}

impl TaskPayload {
    pub fn new(action: ActionType, data: TicketData) -> Self {
        Self {
            meta: PayloadMeta {
                source: "ticketcoach".to_string(),
                timestamp: Utc::now().timestamp_millis(),
                action,
            },
            data,
        }
    }

    /// Assemble the review request sent as the user message in structured
    /// (skill) mode
    pub fn review_request(&self, lang: Lang) -> String {
        let d = &self.data;
        match lang {
            Lang::Zh => format!(
                "请帮我审阅以下 JIRA 任务描述并给出改进建议：\n\n\
                 **项目**: {}\n\
                 **任务类型**: {}\n\
                 **摘要**: {}\n\
                 **描述**:\n{}\n\
                 **经办人**: {}\n\
                 **故事点**: {}",
                d.project_name,
                d.issue_type,
                d.summary,
                if d.description.is_empty() { "（未填写）" } else { &d.description },
                if d.assignee.is_empty() { "（未分配）" } else { &d.assignee },
                d.estimated_points
            ),
            Lang::En => format!(
                "Please review the following JIRA task description and provide improvement suggestions:\n\n\
                 **Project**: {}\n\
                 **Issue Type**: {}\n\
                 **Summary**: {}\n\
                 **Description**:\n{}\n\
                 **Assignee**: {}\n\
                 **Story Points**: {}",
                d.project_name,
                d.issue_type,
                d.summary,
                if d.description.is_empty() { "(empty)" } else { &d.description },
                if d.assignee.is_empty() { "(unassigned)" } else { &d.assignee },
                d.estimated_points
            ),
        }
    }

    /// Raw text used by the free-form coach mode: the description, or the
    /// summary when no description was written
    pub fn free_text(&self) -> String {
        if self.data.description.trim().is_empty() {
            self.data.summary.clone()
        } else {
            self.data.description.clone()
        }
    }
}

/// Structured summary segments composing `[vehicle][product][layer][component][detail]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryParts {
    pub vehicle: String,
    pub product: String,
    pub layer: String,
    pub component: String,
    pub detail: String,
}

impl SummaryParts {
    fn segments(&self) -> [&str; 5] {
        [&self.vehicle, &self.product, &self.layer, &self.component, &self.detail]
    }

    /// Compose the bracketed summary string; empty segments render as
    /// `[...]` placeholders, and a fully empty summary composes to ""
    pub fn compose(&self) -> String {
        let segments = self.segments();
        if segments.iter().all(|s| s.is_empty()) {
            return String::new();
        }
        segments
            .iter()
            .map(|s| format!("[{}]", if s.is_empty() { "..." } else { s }))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.segments().iter().all(|s| !s.is_empty())
    }
}

/// Editable ticket draft loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketForm {
    pub project_key: String,
    pub project_name: String,
    pub issue_type: String,
    pub assignee: String,
    pub estimated_points: u32,
    pub description: String,
    pub summary: SummaryParts,
}

impl Default for TicketForm {
    fn default() -> Self {
        Self {
            project_key: String::new(),
            project_name: String::new(),
            issue_type: "Story".to_string(),
            assignee: String::new(),
            estimated_points: 3,
            description: String::new(),
            summary: SummaryParts::default(),
        }
    }
}

// quality score weights; sum to 100
const W_PROJECT: u32 = 8;
const W_ISSUE_TYPE: u32 = 8;
const W_ASSIGNEE: u32 = 8;
const W_POINTS: u32 = 6;
const W_SEGMENT: u32 = 8;
const W_DETAIL: u32 = 10;
const W_DESC_PRESENT: u32 = 10;
const W_DESC_LENGTH: u32 = 18;

/// Description length at which the length weight saturates
const DESC_FULL_LENGTH: usize = 200;

impl TicketForm {
    /// All fields required for submission are filled
    pub fn can_submit(&self) -> bool {
        !self.project_key.is_empty()
            && !self.issue_type.is_empty()
            && !self.assignee.is_empty()
            && self.estimated_points > 0
            && !self.description.trim().is_empty()
            && self.summary.is_complete()
    }

    /// Weighted completeness score, 0-100
    pub fn quality_score(&self) -> u32 {
        let mut score = 0;
        if !self.project_key.is_empty() {
            score += W_PROJECT;
        }
        if !self.issue_type.is_empty() {
            score += W_ISSUE_TYPE;
        }
        if !self.assignee.is_empty() {
            score += W_ASSIGNEE;
        }
        if self.estimated_points > 0 {
            score += W_POINTS;
        }
        for segment in [&self.summary.vehicle, &self.summary.product, &self.summary.layer, &self.summary.component] {
            if !segment.is_empty() {
                score += W_SEGMENT;
            }
        }
        if !self.summary.detail.is_empty() {
            score += W_DETAIL;
        }

        let desc = self.description.trim();
        if !desc.is_empty() {
            score += W_DESC_PRESENT;
            let length_score = (desc.chars().count() * W_DESC_LENGTH as usize / DESC_FULL_LENGTH) as u32;
            score += length_score.min(W_DESC_LENGTH);
        }

        score.min(100)
    }

    /// Flatten the draft into the wire-format ticket fields
    pub fn to_data(&self) -> TicketData {
        TicketData {
            project_key: self.project_key.clone(),
            project_name: self.project_name.clone(),
            issue_type: self.issue_type.clone(),
            summary: self.summary.compose(),
            description: self.description.clone(),
            assignee: self.assignee.clone(),
            estimated_points: self.estimated_points,
        }
    }
}
