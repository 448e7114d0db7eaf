//! Automation templates offered during onboarding.

use serde::Serialize;

/// A starter automation from the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationTemplate {
    pub id: &'static str,
    pub category: &'static str,
    pub name: &'static str,
    pub trigger: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

pub const AUTOMATION_CATALOG: &[AutomationTemplate] = &[
    AutomationTemplate {
        id: "morning_brief",
        category: "planning",
        name: "Morning brief",
        trigger: "Every weekday at 7:30",
        action: "Summarize today's calendar, top tasks and weather",
        description: "Start the day with a single short overview instead of checking five apps.",
    },
    AutomationTemplate {
        id: "evening_review",
        category: "planning",
        name: "Evening review",
        trigger: "Every day at 21:00",
        action: "List what got done and carry unfinished tasks forward",
        description: "Close the day with a quick look back so nothing silently slips.",
    },
    AutomationTemplate {
        id: "focus_guard",
        category: "focus",
        name: "Focus guard",
        trigger: "When a focus block starts",
        action: "Mute notifications and set your status to busy",
        description: "Protect deep-work time without having to remember to silence everything.",
    },
    AutomationTemplate {
        id: "overload_triage",
        category: "wellbeing",
        name: "Overload triage",
        trigger: "When more than 10 tasks are overdue",
        action: "Suggest three tasks to drop or defer",
        description: "When the list gets heavy, get a short, kind shortlist instead of a wall of red.",
    },
    AutomationTemplate {
        id: "habit_nudge",
        category: "habits",
        name: "Habit nudge",
        trigger: "When a daily habit is still open at 18:00",
        action: "Send one reminder",
        description: "A single nudge for habits you care about, never more than once a day.",
    },
    AutomationTemplate {
        id: "inbox_digest",
        category: "communication",
        name: "Inbox digest",
        trigger: "Twice a day",
        action: "Group new email into needs-reply, FYI and noise",
        description: "Check email on your schedule with the important messages already pulled out.",
    },
    AutomationTemplate {
        id: "weekly_reset",
        category: "planning",
        name: "Weekly reset",
        trigger: "Sundays at 17:00",
        action: "Review goals and draft next week's priorities",
        description: "A short weekly ritual to line up the week with what you actually want.",
    },
    AutomationTemplate {
        id: "bill_reminder",
        category: "finance",
        name: "Bill reminder",
        trigger: "Three days before a bill is due",
        action: "Remind you with the amount and payee",
        description: "Never pay a late fee because a due date hid in an email.",
    },
];

pub fn find_template(id: &str) -> Option<&'static AutomationTemplate> {
    AUTOMATION_CATALOG.iter().find(|t| t.id == id)
}

/// Result of toggling an automation on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    LimitReached,
    UnknownTemplate,
}

/// Toggle `id` in `selected`, enabling at most `cap` templates.
pub fn toggle(selected: &mut Vec<String>, id: &str, cap: usize) -> ToggleOutcome {
    if find_template(id).is_none() {
        return ToggleOutcome::UnknownTemplate;
    }
    if let Some(pos) = selected.iter().position(|s| s == id) {
        selected.remove(pos);
        return ToggleOutcome::Disabled;
    }
    if selected.len() >= cap {
        return ToggleOutcome::LimitReached;
    }
    selected.push(id.to_string());
    ToggleOutcome::Enabled
}
