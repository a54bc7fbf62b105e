//! Prompt composition
//!
//! Turns an analysis record into one prompt per narration stage. Pure and
//! deterministic: the same record always yields the same prompts in the same
//! order, and nothing here touches the network.
//!
//! Discipline differences (score wording, whether high or low scores are
//! good, what kind of exercises to suggest) live in `DisciplineVoice`; the
//! stage templates are shared.

use crate::error::PipelineError;
use crate::models::{AnalysisRecord, Discipline, MovementScore, PromptStage, StagePrompt};

/// How many movements to quote as highlights / low points
const HIGHLIGHT_COUNT: usize = 3;

const HOST_PREAMBLE: &str = "You are the host of a warm, knowledgeable equestrian training podcast. \
Speak directly to the rider in a conversational tone. Write plain spoken prose only: \
no headings, no bullet points, no stage directions.";

/// Discipline-specific wording
struct DisciplineVoice {
    sport: &'static str,
    sheet: &'static str,
    official: &'static str,
    /// Higher movement scores are better (dressage marks) or worse (jumping faults)
    higher_is_better: bool,
    exercise_hint: &'static str,
}

impl DisciplineVoice {
    fn for_discipline(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Dressage => Self {
                sport: "dressage",
                sheet: "test",
                official: "judge",
                higher_is_better: true,
                exercise_hint: "schooling exercises such as transitions within the gait, \
                    circles and serpentines, and lateral work",
            },
            Discipline::ShowJumping => Self {
                sport: "show jumping",
                sheet: "round",
                official: "course judge",
                higher_is_better: false,
                exercise_hint: "gymnastic grids, pole work for striding, \
                    and flatwork for rhythm and adjustability",
            },
            Discipline::Eventing => Self {
                sport: "eventing",
                sheet: "competition",
                official: "judge",
                higher_is_better: true,
                exercise_hint: "exercises that build rhythm, balance and confidence \
                    across the dressage, cross-country and jumping phases",
            },
            Discipline::Other => Self {
                sport: "riding",
                sheet: "test",
                official: "judge",
                higher_is_better: true,
                exercise_hint: "practical schooling exercises",
            },
        }
    }
}

/// Build the ordered stage prompts for `record`
///
/// Fails fast with `MissingIdentity` before any network work when the
/// record has no owner or analysis id. Missing optional fields substitute
/// as empty text.
pub fn compose_prompts(record: &AnalysisRecord) -> Result<Vec<StagePrompt>, PipelineError> {
    record.artifact_key()?;

    let voice = DisciplineVoice::for_discipline(record.discipline);
    let facts = Facts::from_record(record, &voice);

    Ok(PromptStage::ALL
        .iter()
        .map(|&stage| StagePrompt {
            stage,
            prompt: render_stage(stage, &voice, &facts),
        })
        .collect())
}

/// Record fields pre-rendered as text
struct Facts {
    rider: String,
    horse: String,
    test_name: String,
    score_line: String,
    strengths: String,
    weaknesses: String,
    judge_comments: String,
    recommendations: String,
    best_movements: String,
    weakest_movements: String,
}

impl Facts {
    fn from_record(record: &AnalysisRecord, voice: &DisciplineVoice) -> Self {
        let (best, weakest) = highlight_movements(&record.movement_scores, voice.higher_is_better);

        Self {
            rider: text_or_empty(&record.rider_name),
            horse: text_or_empty(&record.horse_name),
            test_name: text_or_empty(&record.test_name),
            score_line: score_line(record, voice),
            strengths: join_phrases(&record.strengths),
            weaknesses: join_phrases(&record.weaknesses),
            judge_comments: join_sentences(&record.judge_comments),
            recommendations: join_phrases(&record.recommendations),
            best_movements: best,
            weakest_movements: weakest,
        }
    }
}

fn render_stage(stage: PromptStage, voice: &DisciplineVoice, facts: &Facts) -> String {
    match stage {
        PromptStage::Overview => format!(
            "{preamble}\n\n\
            Write the opening segment (about 250 words) of an episode reviewing a {sport} {sheet}.\n\
            Rider: {rider}\n\
            Horse: {horse}\n\
            {sheet_title}: {test_name}\n\
            Result: {score_line}\n\
            {official_title} remarks: {comments}\n\n\
            Welcome the rider, set the scene, and summarise the overall result.",
            preamble = HOST_PREAMBLE,
            sport = voice.sport,
            sheet = voice.sheet,
            sheet_title = capitalize(voice.sheet),
            official_title = capitalize(voice.official),
            rider = facts.rider,
            horse = facts.horse,
            test_name = facts.test_name,
            score_line = facts.score_line,
            comments = facts.judge_comments,
        ),
        PromptStage::Strengths => format!(
            "{preamble}\n\n\
            Continue the episode (about 300 words) by celebrating what went well in this {sport} {sheet}.\n\
            Strengths: {strengths}\n\
            Best scoring elements: {best}\n\n\
            Explain why each strength matters and how {rider} and {horse} can build on it.",
            preamble = HOST_PREAMBLE,
            sport = voice.sport,
            sheet = voice.sheet,
            strengths = facts.strengths,
            best = facts.best_movements,
            rider = facts.rider,
            horse = facts.horse,
        ),
        PromptStage::FocusAreas => format!(
            "{preamble}\n\n\
            Continue the episode (about 350 words) with the areas to focus on next.\n\
            Areas to improve: {weaknesses}\n\
            Lowest scoring elements: {weakest}\n\
            {official_title} comments: {comments}\n\n\
            For each area, explain what the {official} was looking for and suggest {exercises}. \
            Keep the tone constructive.",
            preamble = HOST_PREAMBLE,
            weaknesses = facts.weaknesses,
            weakest = facts.weakest_movements,
            official_title = capitalize(voice.official),
            official = voice.official,
            comments = facts.judge_comments,
            exercises = voice.exercise_hint,
        ),
        PromptStage::Closing => format!(
            "{preamble}\n\n\
            Write the closing segment (about 200 words) of the episode.\n\
            Recommendations: {recommendations}\n\
            Result: {score_line}\n\n\
            Turn the recommendations into a short practice plan for the coming weeks \
            and end with an encouraging sign-off for {rider} and {horse}.",
            preamble = HOST_PREAMBLE,
            recommendations = facts.recommendations,
            score_line = facts.score_line,
            rider = facts.rider,
            horse = facts.horse,
        ),
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "a, b and c"
fn join_phrases(items: &[String]) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    match items.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Sentences joined with spaces, each terminated
fn join_sentences(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.ends_with(|c| matches!(c, '.' | '!' | '?')) {
                s.to_string()
            } else {
                format!("{}.", s)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        let text = format!("{:.2}", rounded);
        text.trim_end_matches('0').to_string()
    }
}

fn score_line(record: &AnalysisRecord, voice: &DisciplineVoice) -> String {
    match (record.percentage, record.total_score, voice.higher_is_better) {
        (Some(pct), Some(total), true) => {
            format!("{}% ({} points)", format_number(pct), format_number(total))
        }
        (Some(pct), None, true) => format!("{}%", format_number(pct)),
        (_, Some(total), false) => format!("{} faults", format_number(total)),
        (None, Some(total), true) => format!("{} points", format_number(total)),
        (Some(pct), None, false) => format!("{}%", format_number(pct)),
        (None, None, _) => String::new(),
    }
}

/// Best and weakest scored elements, each "name (score)", ties broken by
/// sheet order
fn highlight_movements(scores: &[MovementScore], higher_is_better: bool) -> (String, String) {
    if scores.is_empty() {
        return (String::new(), String::new());
    }

    let mut ranked: Vec<(usize, &MovementScore)> = scores.iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| {
        let ordering = if higher_is_better {
            b.score.total_cmp(&a.score)
        } else {
            a.score.total_cmp(&b.score)
        };
        ordering.then(ia.cmp(ib))
    });

    let describe = |entries: &[&(usize, &MovementScore)]| {
        let names: Vec<String> = entries
            .iter()
            .map(|(_, m)| format!("{} ({})", m.movement.trim(), format_number(m.score)))
            .collect();
        join_phrases(&names)
    };

    let best: Vec<_> = ranked.iter().take(HIGHLIGHT_COUNT).collect();
    let weakest: Vec<_> = ranked.iter().rev().take(HIGHLIGHT_COUNT).collect();
    (describe(&best), describe(&weakest))
}
