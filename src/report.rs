//! Report composition: turns one command's entries plus the collaborator
//! outputs into the three outbound messages.

use crate::chart::CHART_FILE_NAME;
use crate::period::Period;
use crate::types::{Attachment, Outbound, ReportEntry};

pub const CHART_CAPTION: &str = "\n ### **🫧 이만큼의 시간표** \n";

/// One line of the task list: the entry plus the sentence picked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskLine {
    pub name: String,
    pub done: u32,
    pub complete: bool,
    pub sentence: String,
}

impl TaskLine {
    pub fn new(entry: &ReportEntry, sentence: String) -> Self {
        Self {
            name: entry.name.clone(),
            done: entry.done,
            complete: entry.is_complete(),
            sentence,
        }
    }

    fn render(&self) -> String {
        if self.complete {
            format!("- ** {}님 모든 과제 수행 완료! ** {}", self.name, self.sentence)
        } else {
            format!(
                "- ** {}님 {}개 과제 수행 완료! ** {}",
                self.name, self.done, self.sentence
            )
        }
    }
}

pub struct ReportContext<'a> {
    pub period: Period,
    pub intro: &'a str,
    pub closing: &'a str,
    pub entries: &'a [ReportEntry],
    pub tasks: &'a [TaskLine],
    /// Encoded chart image, if rendering succeeded.
    pub chart: Option<Vec<u8>>,
}

pub fn total_minutes(entries: &[ReportEntry]) -> u64 {
    entries.iter().map(|e| u64::from(e.minutes)).sum()
}

/// `H시간 M분`, dropping whichever part is zero (`0분` for zero).
pub fn format_duration(minutes: u64) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, m) => format!("{m}분"),
        (h, 0) => format!("{h}시간"),
        (h, m) => format!("{h}시간 {m}분"),
    }
}

/// Distinct names in first-appearance order, each with the `님` honorific.
pub fn member_list(entries: &[ReportEntry]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for e in entries {
        if !seen.contains(&e.name.as_str()) {
            seen.push(&e.name);
        }
    }
    seen.iter()
        .map(|n| format!("{n}님"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compose(ctx: ReportContext<'_>) -> [Outbound; 3] {
    let title = Outbound::text(format!(
        "## **이만큼 리포트 — {}월 {}주차**\n> {} \n",
        ctx.period.month, ctx.period.week, ctx.intro
    ));

    let chart = Outbound {
        content: CHART_CAPTION.to_string(),
        attachment: ctx.chart.map(|bytes| Attachment {
            name: CHART_FILE_NAME.to_string(),
            bytes,
        }),
    };

    let task_list = ctx
        .tasks
        .iter()
        .map(TaskLine::render)
        .collect::<Vec<_>>()
        .join("\n");
    let closing = Outbound::text(format!(
        "### **🫧 과제완료**\n{}\n### **🫧 이만큼의 마무리**\n>  ** 오늘은 {}과 {}을 함께 했어요. ** \n> {}",
        task_list,
        member_list(ctx.entries),
        format_duration(total_minutes(ctx.entries)),
        ctx.closing
    ));

    [title, chart, closing]
}
