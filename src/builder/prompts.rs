//! Prompt construction for the two generation stages.

use crate::store::operations::clusters::ClusterEntry;
use crate::store::operations::questions::QuestionType;
use crate::store::operations::words::Word;

pub fn format_cluster_info(entries: &[ClusterEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("- **{}**: {} — {}", e.word, e.meaning, e.distinction))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_enrichment(words: &[Word]) -> String {
    if words.is_empty() {
        return String::new();
    }
    let listed = words
        .iter()
        .map(|w| {
            let short: String = w.definition.chars().take(60).collect();
            format!("**{}** ({})", w.word, short)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "For richer context, you may weave in these vocabulary words: {listed}\n\
         But only if they fit naturally — do not force them."
    )
}

pub struct PromptContext<'a> {
    pub cluster_title: &'a str,
    pub cluster_info: &'a str,
    pub target_word: &'a str,
    pub target_meaning: &'a str,
    pub target_distinction: &'a str,
    pub enrichment_section: &'a str,
}

const STAGE1_JSON_SHAPE: &str = r#"Respond in this exact JSON format only, with no other text:
{
  "stem": "...",
  "choices": ["word1", "word2", "word3", "word4"],
  "correct_index": 0,
  "explanation": "Why this word fits best",
  "context_sentence": "Full sentence using the correct word"
}"#;

const INFLECTION_RULE: &str = "ALL four choices MUST be conjugated/inflected identically to fit \
the same grammatical slot. If the sentence needs a past tense verb, make every choice past \
tense. The student chooses based on MEANING, not grammar.";

fn prompt_header(ctx: &PromptContext<'_>) -> String {
    format!(
        "Here is the vocabulary cluster \"{title}\":\n{info}\n\n\
         Target word: **{word}**\n\
         Meaning: {meaning}\n\
         Key distinction: {distinction}\n\n\
         {enrichment}\n",
        title = ctx.cluster_title,
        info = ctx.cluster_info,
        word = ctx.target_word,
        meaning = ctx.target_meaning,
        distinction = ctx.target_distinction,
        enrichment = ctx.enrichment_section,
    )
}

pub fn stage1_prompt(question_type: QuestionType, ctx: &PromptContext<'_>) -> String {
    let header = prompt_header(ctx);
    let instructions = match question_type {
        QuestionType::FillBlank => format!(
            "You are generating a vocabulary quiz question: fill-in-the-blank, testing precise \
             word choice among near-synonyms.\n\n{header}\
             Instructions:\n\
             1. Write a rich, natural English sentence (15-30 words) where ONLY the target word \
             fits perfectly, making its specific shade of meaning clearly the best choice.\n\
             2. Replace the target word with \"___\" in the stem.\n\
             3. Provide exactly 4 choices: the correct word and 3 distractors from the SAME \
             cluster, plausible but specifically wrong based on the distinctions.\n\
             4. Write a brief explanation (1-2 sentences) of why the correct word fits and the \
             best distractor doesn't.\n\
             5. Provide the full sentence with the answer filled in (for narration).\n\n\
             {INFLECTION_RULE}\n\n"
        ),
        QuestionType::BestFit => format!(
            "You are generating a vocabulary quiz question: \"best fit\", testing understanding \
             of subtle word distinctions.\n\n{header}\
             Instructions:\n\
             1. Write a short scenario (2-3 sentences) where a specific quality, action, or \
             characteristic is described WITHOUT using any of the cluster words.\n\
             2. Ask: \"Which word best describes [the key element]?\"\n\
             3. The scenario must make the target word clearly the best fit.\n\
             4. Provide exactly 4 choices from the same cluster.\n\
             5. Write a brief explanation.\n\
             6. Provide a sentence using the correct word that captures the scenario.\n\n"
        ),
        QuestionType::Distinction => format!(
            "You are generating a vocabulary quiz question testing explicit knowledge of the \
             distinction between near-synonyms.\n\n{header}\
             Instructions:\n\
             1. Ask a question about the key distinction of the target word, e.g. \"Which word \
             specifically implies [distinctive quality]?\"\n\
             2. The question should test the PRECISE shade of meaning.\n\
             3. Provide exactly 4 choices from the same cluster.\n\
             4. Write a brief explanation referencing the key distinction.\n\
             5. Provide a sentence illustrating the correct word's distinctive meaning.\n\n"
        ),
    };
    format!("{instructions}{STAGE1_JSON_SHAPE}")
}

/// Stage 2: per-choice annotation for a validated stage-1 question.
pub fn choice_details_prompt(
    ctx: &PromptContext<'_>,
    stem: &str,
    choices: &[String],
    correct_index: usize,
) -> String {
    let listed = choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are annotating a vocabulary quiz question.\n\n\
         Here is the vocabulary cluster \"{title}\":\n{info}\n\n\
         Question stem: {stem}\n\
         Choices:\n{listed}\n\
         The correct choice is number {correct}.\n\n\
         For EACH choice, in order, provide: the choice text, its dictionary base form, its \
         meaning, its key distinction within the cluster, and one sentence on why it is correct \
         or why it does not fit THIS question. Reference the question context, not just the \
         generic definition.\n\n\
         Respond in this exact JSON format only, with no other text:\n\
         {{\n\
           \"choice_details\": [\n\
             {{\"word\": \"...\", \"base_word\": \"...\", \"meaning\": \"...\", \
         \"distinction\": \"...\", \"why\": \"...\"}},\n\
             {{\"word\": \"...\", \"base_word\": \"...\", \"meaning\": \"...\", \
         \"distinction\": \"...\", \"why\": \"...\"}},\n\
             {{\"word\": \"...\", \"base_word\": \"...\", \"meaning\": \"...\", \
         \"distinction\": \"...\", \"why\": \"...\"}},\n\
             {{\"word\": \"...\", \"base_word\": \"...\", \"meaning\": \"...\", \
         \"distinction\": \"...\", \"why\": \"...\"}}\n\
           ]\n\
         }}",
        title = ctx.cluster_title,
        info = ctx.cluster_info,
        correct = correct_index + 1,
    )
}

/// Retry prompts carry the exact validation failure so the generator can
/// self-correct instead of repeating the mistake.
pub fn with_feedback(prompt: &str, previous_error: &str) -> String {
    format!(
        "{prompt}\n\nYour previous attempt was rejected: {previous_error}\n\
         Fix exactly this problem and respond again with only the JSON object."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(info: &'a str) -> PromptContext<'a> {
        PromptContext {
            cluster_title: "Being Brief",
            cluster_info: info,
            target_word: "terse",
            target_meaning: "brief to the point of seeming rude",
            target_distinction: "implies curtness",
            enrichment_section: "",
        }
    }

    #[test]
    fn stage1_fill_blank_mentions_blank_and_json() {
        let info = "- **terse**: brief — curt";
        let p = stage1_prompt(QuestionType::FillBlank, &ctx(info));
        assert!(p.contains("___"));
        assert!(p.contains("\"correct_index\""));
        assert!(p.contains("**terse**"));
        assert!(p.contains("inflected identically"));
    }

    #[test]
    fn stage2_lists_choices_in_order() {
        let info = "- **terse**: brief — curt";
        let choices = vec![
            "terse".to_string(),
            "laconic".to_string(),
            "curt".to_string(),
            "pithy".to_string(),
        ];
        let p = choice_details_prompt(&ctx(info), "The ___ reply.", &choices, 0);
        assert!(p.contains("1. terse"));
        assert!(p.contains("4. pithy"));
        assert!(p.contains("correct choice is number 1"));
        assert!(p.contains("\"base_word\""));
    }

    #[test]
    fn feedback_appends_specific_reason() {
        let p = with_feedback("BASE", "choices must be a list of 4 (got 3)");
        assert!(p.starts_with("BASE"));
        assert!(p.contains("got 3"));
    }

    #[test]
    fn enrichment_is_empty_for_no_words() {
        assert_eq!(format_enrichment(&[]), "");
    }
}
