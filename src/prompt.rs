use chrono::NaiveDate;

use crate::core::models::MessageRecord;

/// Text every posted summary starts with. Messages containing it are never
/// fed back into the summarizer.
pub const SUMMARY_MARKER: &str = "[Summary] Topic:";

/// Behavioural instruction sent with every generation request.
pub const SYSTEM_INSTRUCTION: &str = "You summarize Telegram forum topic discussions. \
    If any individual message would violate safety guidelines, ignore that message instead of refusing the task. \
    Return concise bullet points with key decisions, questions, and action items.";

/// Background knowledge that steers terminology in the group's jargon.
pub const GLOSSARY: &str = "\
1. The group mainly discusses on-chain crypto activity, airdrop farming, and DEX/perp volume farming.\n\
2. Common terms: wash trading (self-matched volume), Binance Alpha points farming, gas optimisation, \
multi-account interaction (Sybil), and anti-Sybil defences.";

/// Run-wide facts that go into every prompt.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub window_label: String,
    pub window_hours: i64,
    pub today: NaiveDate,
    pub language: String,
    pub vip_speakers: Vec<String>,
}

/// Flatten a message to a single prompt line: newlines become spaces and
/// other control characters are dropped.
#[must_use]
pub fn sanitize_line(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Render messages as `[YYYY-MM-DD HH:MM] sender: text` lines under a
/// time-range note.
#[must_use]
pub fn format_messages(messages: &[MessageRecord], truncated: bool, window_label: &str) -> String {
    let lines = messages
        .iter()
        .map(|m| {
            format!(
                "[{}] {}: {}",
                m.time.format("%Y-%m-%d %H:%M"),
                sanitize_line(&m.sender),
                sanitize_line(&m.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut note = format!("Time range: {window_label}");
    if truncated {
        note.push_str(&format!(
            "\n(Only the most recent {} messages are included; older ones were cut for length.)",
            messages.len()
        ));
    }
    format!("{note}\n{lines}")
}

fn requirements(ctx: &PromptContext) -> String {
    let mut rules = vec![
        format!("1. Language: write the whole summary in {}.", ctx.language),
        "2. Content: extract useful farming strategies, new alpha opportunities and technical details. Skip pure small talk.".to_string(),
        "3. Attribution: name the speaker for every claim, tip or instruction you report.".to_string(),
        "4. Safety: if a message is offensive or inappropriate, skip it silently; never refuse the task.".to_string(),
        format!("5. Start the summary by stating the time range \"{}\".", ctx.window_label),
    ];
    if !ctx.vip_speakers.is_empty() {
        rules.push(format!(
            "6. Priority speakers: {}. If any of them spoke, summarize their views or instructions first in a separate section.",
            ctx.vip_speakers.join(", ")
        ));
    }
    rules.join("\n")
}

fn output_format(ctx: &PromptContext) -> String {
    let mut sections = vec!["- 🔥 Hot topics: the 1-3 most discussed projects or strategies".to_string()];
    if !ctx.vip_speakers.is_empty() {
        sections.push(format!(
            "- 🗣️ What {} said: only when they spoke, otherwise omit this section",
            ctx.vip_speakers.join(" / ")
        ));
    }
    sections.push("- 📝 Key points: bullet list of technical details and conclusions".to_string());
    sections.join("\n")
}

/// Prompt for summarizing a block of formatted messages directly.
#[must_use]
pub fn build_topic_prompt(ctx: &PromptContext, topic_title: &str, conversation: &str) -> String {
    format!(
        "You are the AI secretary of this crypto farming community. Today is {today}.\n\
         Below is the conversation in the topic \"{title}\" from the past {hours} hours.\n\
         Time range: {label}\n\n\
         [Background]\n{glossary}\n\n\
         [Requirements]\n{rules}\n\n\
         [Output format]\n{format}\n\n\
         Conversation:\n{conversation}",
        today = ctx.today.format("%Y-%m-%d"),
        title = sanitize_line(topic_title),
        hours = ctx.window_hours,
        label = ctx.window_label,
        glossary = GLOSSARY,
        rules = requirements(ctx),
        format = output_format(ctx),
    )
}

/// Prompt for one slice of a large topic.
#[must_use]
pub fn build_chunk_prompt(
    ctx: &PromptContext,
    topic_title: &str,
    part: usize,
    parts: usize,
    conversation: &str,
) -> String {
    format!(
        "You are the AI secretary of this crypto farming community. Today is {today}.\n\
         The topic \"{title}\" was too long to summarize at once. This is part {part} of {parts}, \
         in chronological order.\n\
         Time range: {label}\n\n\
         [Background]\n{glossary}\n\n\
         [Requirements]\n{rules}\n\
         Write a partial summary of this part only; it will be merged with the other parts later.\n\n\
         Conversation:\n{conversation}",
        today = ctx.today.format("%Y-%m-%d"),
        title = sanitize_line(topic_title),
        label = ctx.window_label,
        glossary = GLOSSARY,
        rules = requirements(ctx),
    )
}

/// Prompt that merges partial summaries into the final one.
#[must_use]
pub fn build_combine_prompt(ctx: &PromptContext, topic_title: &str, partials: &str) -> String {
    format!(
        "You are the AI secretary of this crypto farming community. Today is {today}.\n\
         The following are partial summaries, in chronological order, of the topic \"{title}\" \
         over the past {hours} hours.\n\
         Time range: {label}\n\n\
         [Background]\n{glossary}\n\n\
         [Requirements]\n{rules}\n\
         Merge them into a single summary. Remove duplicates and keep speaker attribution.\n\n\
         [Output format]\n{format}\n\n\
         Partial summaries:\n{partials}",
        today = ctx.today.format("%Y-%m-%d"),
        title = sanitize_line(topic_title),
        hours = ctx.window_hours,
        label = ctx.window_label,
        glossary = GLOSSARY,
        rules = requirements(ctx),
        format = output_format(ctx),
    )
}
