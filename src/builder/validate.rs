//! Stage-1 / stage-2 response validation and auto-repair.
//!
//! Every rejection produces a precise, human-readable reason; the builder
//! feeds that reason back into the retry prompt.

use crate::builder::inflect::{is_inflection, matches_target};
use crate::constants::{BLANK_MARKER, CHOICE_COUNT};
use crate::store::operations::questions::{ChoiceDetail, QuestionType};

#[derive(Debug, Clone)]
pub struct Stage1Draft {
    pub stem: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub context_sentence: String,
}

/// Accept `correct_index` as an integer or a numeric string.
fn coerce_index(value: &serde_json::Value) -> Result<usize, String> {
    if let Some(n) = value.as_u64() {
        return Ok(n as usize);
    }
    if let Some(n) = value.as_i64() {
        if n >= 0 {
            return Ok(n as usize);
        }
        return Err(format!("correct_index must be between 0 and 3 (got {n})"));
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<usize>() {
            return Ok(n);
        }
    }
    Err(format!("correct_index must be an integer (got {value})"))
}

fn required_str(value: &serde_json::Value, field: &str) -> Result<String, String> {
    match value.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(format!("missing required field '{field}'")),
    }
}

/// Collapse blank-marker variants (`____`, `[blank]`, `(blank)`) to `___`.
fn normalize_blank(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut chars = stem.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            let mut run = 1;
            while chars.peek() == Some(&'_') {
                chars.next();
                run += 1;
            }
            if run >= 2 {
                out.push_str(BLANK_MARKER);
            } else {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    for variant in ["[blank]", "(blank)", "[BLANK]", "(BLANK)", "[Blank]", "(Blank)"] {
        out = out.replace(variant, BLANK_MARKER);
    }
    out
}

fn initial_is_vowel(word: &str) -> Option<bool> {
    word.chars()
        .next()
        .map(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
}

/// When choices mix vowel- and consonant-initial words, an `a ___` / `an
/// ___` article before the blank leaks the answer's phonology; neutralize
/// it to `a(n) ___`.
fn neutralize_article(stem: &str, choices: &[String]) -> String {
    let classes: Vec<bool> = choices.iter().filter_map(|c| initial_is_vowel(c)).collect();
    let mixed = classes.iter().any(|&v| v) && classes.iter().any(|&v| !v);
    if !mixed {
        return stem.to_string();
    }
    // Rebuild word-by-word so "extra ___" is not mistaken for "a ___".
    let mut words: Vec<String> = stem.split(' ').map(|w| w.to_string()).collect();
    for i in 0..words.len().saturating_sub(1) {
        if !words[i + 1].starts_with(BLANK_MARKER) {
            continue;
        }
        let replacement = match words[i].as_str() {
            "a" | "an" => "a(n)",
            "A" | "An" => "A(n)",
            _ => continue,
        };
        words[i] = replacement.to_string();
    }
    words.join(" ")
}

fn sentence_contains_word(sentence: &str, target: &str) -> bool {
    sentence
        .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|t| !t.is_empty())
        .any(|token| matches_target(token, target))
}

/// Validate a stage-1 response, repairing what can be repaired:
/// `correct_index` rewrites onto an exact or inflected match for the
/// target, blank markers are normalized, and leaking articles neutralized.
pub fn validate_stage1(
    value: &serde_json::Value,
    target_word: &str,
    question_type: QuestionType,
) -> Result<Stage1Draft, String> {
    let stem = required_str(value, "stem")?;
    let explanation = required_str(value, "explanation")?;
    let context_sentence = required_str(value, "context_sentence")?;

    let raw_choices = value
        .get("choices")
        .and_then(|v| v.as_array())
        .ok_or_else(|| "missing required field 'choices'".to_string())?;
    let mut choices = Vec::with_capacity(CHOICE_COUNT);
    for c in raw_choices {
        match c.as_str() {
            Some(s) if !s.trim().is_empty() => choices.push(s.trim().to_string()),
            _ => return Err("choices must all be non-empty strings".to_string()),
        }
    }
    if choices.len() != CHOICE_COUNT {
        return Err(format!(
            "choices must be a list of {CHOICE_COUNT} (got {})",
            choices.len()
        ));
    }
    for (i, a) in choices.iter().enumerate() {
        for b in choices.iter().skip(i + 1) {
            if a.to_lowercase() == b.to_lowercase() {
                return Err(format!("choices must be distinct (duplicate '{a}')"));
            }
        }
    }

    let raw_index = value
        .get("correct_index")
        .ok_or_else(|| "missing required field 'correct_index'".to_string())?;
    let mut correct_index = coerce_index(raw_index)?;
    if correct_index >= CHOICE_COUNT {
        return Err(format!(
            "correct_index must be between 0 and 3 (got {correct_index})"
        ));
    }

    // The claimed correct choice must be the target word; repair by
    // searching for an exact match first, then an inflected form.
    if !choices[correct_index].eq_ignore_ascii_case(target_word.trim()) {
        if let Some(exact) = choices
            .iter()
            .position(|c| c.eq_ignore_ascii_case(target_word.trim()))
        {
            correct_index = exact;
        } else if let Some(inflected) = choices
            .iter()
            .position(|c| is_inflection(c, target_word))
        {
            correct_index = inflected;
        } else {
            return Err(format!(
                "target word '{target_word}' must be one of the choices"
            ));
        }
    }

    let mut stem = stem;
    if question_type == QuestionType::FillBlank {
        stem = normalize_blank(&stem);
        if !stem.contains(BLANK_MARKER) {
            return Err(format!("stem must contain the {BLANK_MARKER} blank marker"));
        }
        stem = neutralize_article(&stem, &choices);
    }

    if !sentence_contains_word(&context_sentence, target_word) {
        return Err(format!(
            "context_sentence must contain the target word '{target_word}'"
        ));
    }

    Ok(Stage1Draft {
        stem,
        choices,
        correct_index,
        explanation,
        context_sentence,
    })
}

/// Validate a stage-2 response: a `choice_details` array of four objects
/// parallel to the choices.
pub fn validate_choice_details(
    value: &serde_json::Value,
    choices: &[String],
) -> Result<Vec<ChoiceDetail>, String> {
    let raw = value
        .get("choice_details")
        .and_then(|v| v.as_array())
        .ok_or_else(|| "missing required field 'choice_details'".to_string())?;
    if raw.len() != choices.len() {
        return Err(format!(
            "choice_details must have {} entries (got {})",
            choices.len(),
            raw.len()
        ));
    }

    let mut details = Vec::with_capacity(choices.len());
    for (i, entry) in raw.iter().enumerate() {
        let word = required_str(entry, "word")
            .map_err(|e| format!("choice_details[{i}]: {e}"))?;
        if !word.eq_ignore_ascii_case(choices[i].trim()) {
            return Err(format!(
                "choice_details[{i}].word must equal choice '{}' (got '{word}')",
                choices[i]
            ));
        }
        let base_word = entry
            .get("base_word")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| word.clone());
        let meaning = required_str(entry, "meaning")
            .map_err(|e| format!("choice_details[{i}]: {e}"))?;
        let distinction = entry
            .get("distinction")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let why = entry
            .get("why")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        details.push(ChoiceDetail {
            word,
            base_word,
            meaning,
            distinction,
            why,
        });
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_payload() -> serde_json::Value {
        json!({
            "stem": "Her ___ reply ended the meeting early.",
            "choices": ["terse", "laconic", "curt", "pithy"],
            "correct_index": 0,
            "explanation": "Terse implies brevity that borders on rudeness.",
            "context_sentence": "Her terse reply ended the meeting early."
        })
    }

    #[test]
    fn valid_payload_passes() {
        let draft = validate_stage1(&valid_payload(), "terse", QuestionType::FillBlank).unwrap();
        assert_eq!(draft.correct_index, 0);
        assert_eq!(draft.choices.len(), 4);
    }

    #[test]
    fn missing_field_names_the_field() {
        let mut v = valid_payload();
        v.as_object_mut().unwrap().remove("explanation");
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("'explanation'"));
    }

    #[test]
    fn wrong_choice_count_reports_count() {
        let mut v = valid_payload();
        v["choices"] = json!(["terse", "laconic", "curt"]);
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("got 3"));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut v = valid_payload();
        v["correct_index"] = json!(7);
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("between 0 and 3"));
    }

    #[test]
    fn negative_index_is_rejected() {
        let mut v = valid_payload();
        v["correct_index"] = json!(-1);
        assert!(validate_stage1(&v, "terse", QuestionType::FillBlank).is_err());
    }

    #[test]
    fn string_index_is_coerced() {
        let mut v = valid_payload();
        v["correct_index"] = json!("0");
        let draft = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap();
        assert_eq!(draft.correct_index, 0);
    }

    #[test]
    fn duplicate_choices_rejected_case_insensitively() {
        let mut v = valid_payload();
        v["choices"] = json!(["terse", "Terse", "curt", "pithy"]);
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("distinct"));
    }

    #[test]
    fn misplaced_index_is_rewritten_to_exact_match() {
        let mut v = valid_payload();
        v["correct_index"] = json!(2);
        let draft = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap();
        assert_eq!(draft.correct_index, 0);
    }

    #[test]
    fn inflected_choice_is_accepted() {
        let v = json!({
            "stem": "With practice she ___ the judges into agreement.",
            "choices": ["cajoled", "beguiled", "flattered", "wheedled"],
            "correct_index": 0,
            "explanation": "Cajole implies gentle persistent persuasion.",
            "context_sentence": "With practice she cajoled the judges into agreement."
        });
        let draft = validate_stage1(&v, "cajole", QuestionType::FillBlank).unwrap();
        assert_eq!(draft.correct_index, 0);
        assert_eq!(draft.choices[0], "cajoled");
    }

    #[test]
    fn target_absent_from_choices_is_rejected() {
        let mut v = valid_payload();
        v["choices"] = json!(["laconic", "brusque", "curt", "pithy"]);
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("must be one of the choices"));
    }

    #[test]
    fn blank_variants_are_normalized() {
        let mut v = valid_payload();
        v["stem"] = json!("Her _____ reply ended the meeting.");
        let draft = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap();
        assert!(draft.stem.contains("___"));
        assert!(!draft.stem.contains("____"));

        let mut v = valid_payload();
        v["stem"] = json!("Her [blank] reply ended the meeting.");
        let draft = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap();
        assert!(draft.stem.contains("___"));
    }

    #[test]
    fn missing_blank_is_rejected_for_fill_blank_only() {
        let mut v = valid_payload();
        v["stem"] = json!("Which word fits best here?");
        assert!(validate_stage1(&v, "terse", QuestionType::FillBlank).is_err());
        assert!(validate_stage1(&v, "terse", QuestionType::BestFit).is_ok());
    }

    #[test]
    fn context_sentence_must_mention_target_or_inflection() {
        let mut v = valid_payload();
        v["context_sentence"] = json!("A sentence about something else entirely.");
        let err = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap_err();
        assert!(err.contains("context_sentence"));

        let mut v = valid_payload();
        v["context_sentence"] = json!("Tersely, she ended the meeting.");
        assert!(validate_stage1(&v, "terse", QuestionType::FillBlank).is_ok());
    }

    #[test]
    fn mixed_initials_neutralize_article() {
        let v = json!({
            "stem": "It was an ___ remark.",
            "choices": ["acerbic", "terse", "curt", "pithy"],
            "correct_index": 0,
            "explanation": "x",
            "context_sentence": "It was an acerbic remark."
        });
        let draft = validate_stage1(&v, "acerbic", QuestionType::FillBlank).unwrap();
        assert!(draft.stem.contains("a(n) ___"));
    }

    #[test]
    fn uniform_initials_keep_article() {
        let v = json!({
            "stem": "It was a ___ remark.",
            "choices": ["terse", "curt", "pithy", "brusque"],
            "correct_index": 0,
            "explanation": "x",
            "context_sentence": "It was a terse remark."
        });
        let draft = validate_stage1(&v, "terse", QuestionType::FillBlank).unwrap();
        assert!(draft.stem.contains("a ___"));
        assert!(!draft.stem.contains("a(n)"));
    }

    #[test]
    fn choice_details_must_be_parallel() {
        let choices: Vec<String> = ["terse", "laconic", "curt", "pithy"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let v = json!({
            "choice_details": [
                {"word": "terse", "base_word": "terse", "meaning": "m", "distinction": "d", "why": "w"},
                {"word": "curt", "base_word": "curt", "meaning": "m", "distinction": "d", "why": "w"},
                {"word": "laconic", "base_word": "laconic", "meaning": "m", "distinction": "d", "why": "w"},
                {"word": "pithy", "base_word": "pithy", "meaning": "m", "distinction": "d", "why": "w"}
            ]
        });
        let err = validate_choice_details(&v, &choices).unwrap_err();
        assert!(err.contains("choice_details[1]"));
    }

    #[test]
    fn choice_details_accepts_matching_order_and_defaults_base_word() {
        let choices: Vec<String> = ["cajoled", "beguiled", "flattered", "wheedled"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let v = json!({
            "choice_details": [
                {"word": "cajoled", "base_word": "cajole", "meaning": "m", "distinction": "d", "why": "w"},
                {"word": "beguiled", "meaning": "m", "distinction": "d", "why": "w"},
                {"word": "flattered", "base_word": "flatter", "meaning": "m", "distinction": "d"},
                {"word": "wheedled", "base_word": "wheedle", "meaning": "m", "distinction": "d", "why": "w"}
            ]
        });
        let details = validate_choice_details(&v, &choices).unwrap();
        assert_eq!(details[0].base_word, "cajole");
        assert_eq!(details[1].base_word, "beguiled");
        assert_eq!(details[2].why, "");
    }

    #[test]
    fn wrong_detail_count_reports_counts() {
        let choices: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let v = json!({"choice_details": [{"word": "a", "meaning": "m"}]});
        let err = validate_choice_details(&v, &choices).unwrap_err();
        assert!(err.contains("got 1"));
    }
}
