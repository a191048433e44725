//! Two-stage question generation.
//!
//! Stage 1 asks the generator for stem + choices; stage 2 asks for the
//! per-choice annotations. Each stage retries with targeted feedback, and
//! stage 2 falls back to cluster-entry lookups when the generator cannot
//! produce a usable annotation list.

pub mod inflect;
pub mod parse;
pub mod prompts;
pub mod validate;

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::constants::{GENERATION_TEMPERATURE, MAX_GENERATION_ATTEMPTS};
use crate::providers::GenerationBackend;
use crate::store::operations::clusters::{Cluster, ClusterEntry};
use crate::store::operations::questions::{ChoiceDetail, PairQuestionCount, Question, QuestionType};
use crate::store::{Store, StoreError};

use self::prompts::PromptContext;
use self::validate::Stage1Draft;

const TYPE_WEIGHTS: &[(QuestionType, f64)] = &[
    (QuestionType::FillBlank, 0.60),
    (QuestionType::BestFit, 0.25),
    (QuestionType::Distinction, 0.15),
];

/// A resolved generation target: the cluster, the member entry, and an
/// optional forced question type.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub cluster: Cluster,
    pub entry: ClusterEntry,
    pub question_type: Option<QuestionType>,
}

pub struct QuestionBuilder {
    store: Arc<Store>,
    backend: Arc<dyn GenerationBackend>,
    limits: LimitsConfig,
}

impl QuestionBuilder {
    pub fn new(
        store: Arc<Store>,
        backend: Arc<dyn GenerationBackend>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            store,
            backend,
            limits,
        }
    }

    fn pick_question_type() -> QuestionType {
        let r: f64 = rand::thread_rng().gen();
        let mut cumulative = 0.0;
        for (qtype, weight) in TYPE_WEIGHTS {
            cumulative += weight;
            if r <= cumulative {
                return *qtype;
            }
        }
        QuestionType::FillBlank
    }

    /// Resolve a (word, cluster) pair into a build target, if the cluster
    /// is eligible and the word is a member.
    pub fn resolve_target(
        &self,
        word: &str,
        cluster_title: &str,
    ) -> Result<Option<BuildTarget>, StoreError> {
        let Some(cluster) = self.store.get_cluster_by_title(cluster_title)? else {
            return Ok(None);
        };
        if !cluster.is_eligible() {
            return Ok(None);
        }
        let Some(entry) = cluster.entry_for_word(word).cloned() else {
            return Ok(None);
        };
        Ok(Some(BuildTarget {
            cluster,
            entry,
            question_type: None,
        }))
    }

    /// Categorical target selection weighted by 1/(1+ready_count), so
    /// uncovered pairs dominate and saturated ones fade out.
    pub fn select_target(&self) -> Result<Option<BuildTarget>, StoreError> {
        let counts = self.store.get_word_cluster_question_counts()?;
        if counts.is_empty() {
            return Ok(None);
        }

        let weights: Vec<f64> = counts
            .iter()
            .map(|c| 1.0 / (1.0 + c.ready_count as f64))
            .collect();
        let total: f64 = weights.iter().sum();
        let mut roll = rand::thread_rng().gen::<f64>() * total;
        let mut picked: &PairQuestionCount = &counts[0];
        for (pair, weight) in counts.iter().zip(&weights) {
            roll -= weight;
            picked = pair;
            if roll <= 0.0 {
                break;
            }
        }
        self.resolve_target(&picked.word, &picked.cluster_title)
    }

    /// Generate one question. Returns `Ok(None)` when no target is
    /// available or every attempt was rejected; callers move on to the
    /// next slot.
    pub async fn build(&self, target: Option<BuildTarget>) -> Result<Option<Question>, StoreError> {
        let target = match target {
            Some(t) => Some(t),
            None => self.select_target()?,
        };
        let Some(target) = target else {
            return Ok(None);
        };
        if !target.cluster.is_eligible() {
            return Ok(None);
        }

        let question_type = target.question_type.unwrap_or_else(Self::pick_question_type);

        let enrichment_count = rand::thread_rng()
            .gen_range(self.limits.enrichment_words_min..=self.limits.enrichment_words_max);
        let enrichment = self.store.get_enrichment_words(enrichment_count)?;
        let cluster_info = prompts::format_cluster_info(&target.cluster.entries);
        let enrichment_section = prompts::format_enrichment(&enrichment);
        let ctx = PromptContext {
            cluster_title: &target.cluster.title,
            cluster_info: &cluster_info,
            target_word: &target.entry.word,
            target_meaning: &target.entry.meaning,
            target_distinction: &target.entry.distinction,
            enrichment_section: &enrichment_section,
        };

        let Some(draft) = self.generate_stage1(&ctx, question_type, &target.entry.word).await
        else {
            return Ok(None);
        };

        let choice_details = self.generate_choice_details(&ctx, &target, &draft).await;

        Ok(Some(Question {
            id: Uuid::new_v4().to_string(),
            question_type,
            target_word: target.entry.word.clone(),
            cluster_title: target.cluster.title.clone(),
            stem: draft.stem,
            choices: draft.choices,
            correct_index: draft.correct_index,
            explanation: draft.explanation,
            context_sentence: draft.context_sentence,
            choice_details,
            generated_at: Utc::now(),
            source: self.backend.id(),
            answered_at: None,
            chosen_index: None,
            was_correct: None,
            response_time_ms: None,
            session_id: None,
        }))
    }

    async fn generate_stage1(
        &self,
        ctx: &PromptContext<'_>,
        question_type: QuestionType,
        target_word: &str,
    ) -> Option<Stage1Draft> {
        let base_prompt = prompts::stage1_prompt(question_type, ctx);
        let mut feedback: Option<String> = None;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let prompt = match &feedback {
                Some(reason) => prompts::with_feedback(&base_prompt, reason),
                None => base_prompt.clone(),
            };
            let response = match self.backend.generate(&prompt, GENERATION_TEMPERATURE).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Stage-1 generation call failed");
                    continue;
                }
            };
            let Some(value) = parse::extract_json(&response) else {
                feedback = Some("response did not contain a valid JSON object".to_string());
                continue;
            };
            match validate::validate_stage1(&value, target_word, question_type) {
                Ok(draft) => return Some(draft),
                Err(reason) => {
                    tracing::debug!(attempt, %reason, "Stage-1 response rejected");
                    feedback = Some(reason);
                }
            }
        }
        tracing::warn!(
            target_word,
            attempts = MAX_GENERATION_ATTEMPTS,
            "Giving up on stage-1 generation"
        );
        None
    }

    async fn generate_choice_details(
        &self,
        ctx: &PromptContext<'_>,
        target: &BuildTarget,
        draft: &Stage1Draft,
    ) -> Vec<ChoiceDetail> {
        let base_prompt =
            prompts::choice_details_prompt(ctx, &draft.stem, &draft.choices, draft.correct_index);
        let mut feedback: Option<String> = None;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let prompt = match &feedback {
                Some(reason) => prompts::with_feedback(&base_prompt, reason),
                None => base_prompt.clone(),
            };
            let response = match self.backend.generate(&prompt, GENERATION_TEMPERATURE).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Stage-2 generation call failed");
                    continue;
                }
            };
            let Some(value) = parse::extract_json(&response) else {
                feedback = Some("response did not contain a valid JSON object".to_string());
                continue;
            };
            match validate::validate_choice_details(&value, &draft.choices) {
                Ok(details) => return details,
                Err(reason) => {
                    tracing::debug!(attempt, %reason, "Stage-2 response rejected");
                    feedback = Some(reason);
                }
            }
        }

        tracing::warn!("Falling back to cluster entries for choice annotations");
        fallback_choice_details(&target.cluster, &draft.choices)
    }
}

/// Annotate choices from the cluster itself: match each choice to an entry
/// directly or through a suffix-stripped base form. `why` stays empty.
fn fallback_choice_details(cluster: &Cluster, choices: &[String]) -> Vec<ChoiceDetail> {
    choices
        .iter()
        .map(|choice| {
            let entry = cluster.entry_for_word(choice).or_else(|| {
                inflect::base_candidates(choice)
                    .into_iter()
                    .find_map(|base| cluster.entry_for_word(&base))
            });
            match entry {
                Some(e) => ChoiceDetail {
                    word: choice.clone(),
                    base_word: e.word.clone(),
                    meaning: e.meaning.clone(),
                    distinction: e.distinction.clone(),
                    why: String::new(),
                },
                None => ChoiceDetail {
                    word: choice.clone(),
                    base_word: choice.clone(),
                    meaning: String::new(),
                    distinction: String::new(),
                    why: String::new(),
                },
            }
        })
        .collect()
}
