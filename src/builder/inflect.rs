//! Morphological inflection matching for answer choices.
//!
//! Generators are asked to conjugate all four choices identically, so the
//! accepted choice is often an inflected form of the target word. The
//! recognizer covers common English suffixes plus e-dropping and y→i stem
//! changes; it is deliberately shallow (no irregular forms).

const SUFFIXES: &[&str] = &[
    "s", "es", "ed", "d", "ing", "ly", "er", "est", "tion", "ment", "ness", "ous", "ive", "al",
];

/// True when `candidate` is a recognized inflection of `base`
/// (case-insensitive, excluding equality).
pub fn is_inflection(candidate: &str, base: &str) -> bool {
    let candidate = candidate.trim().to_lowercase();
    let base = base.trim().to_lowercase();
    if candidate == base || base.is_empty() {
        return false;
    }

    for suffix in SUFFIXES {
        if candidate == format!("{base}{suffix}") {
            return true;
        }
        // e-dropping: cajole -> cajoling
        if let Some(stem) = base.strip_suffix('e') {
            if candidate == format!("{stem}{suffix}") {
                return true;
            }
        }
        // y -> i: wily -> wilier, wiliest, wiliness
        if let Some(stem) = base.strip_suffix('y') {
            if candidate == format!("{stem}i{suffix}") {
                return true;
            }
        }
    }
    false
}

/// True when `candidate` equals `base` or is an inflection of it.
pub fn matches_target(candidate: &str, base: &str) -> bool {
    candidate.trim().to_lowercase() == base.trim().to_lowercase()
        || is_inflection(candidate, base)
}

/// Candidate base forms of an inflected word, most specific first. Used by
/// the stage-2 fallback to map a choice back onto a cluster entry.
pub fn base_candidates(word: &str) -> Vec<String> {
    let word = word.trim().to_lowercase();
    let mut out = vec![word.clone()];
    for suffix in SUFFIXES {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.is_empty() {
                continue;
            }
            out.push(stem.to_string());
            out.push(format!("{stem}e"));
            if let Some(inner) = stem.strip_suffix('i') {
                if !inner.is_empty() {
                    out.push(format!("{inner}y"));
                }
            }
        }
    }
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_suffixes_match() {
        assert!(is_inflection("cajoled", "cajole"));
        assert!(is_inflection("terser", "terse"));
        assert!(is_inflection("quickly", "quick"));
        assert!(is_inflection("refinement", "refine"));
        assert!(is_inflection("boxes", "box"));
    }

    #[test]
    fn e_dropping_matches() {
        assert!(is_inflection("cajoling", "cajole"));
        assert!(is_inflection("beguiling", "beguile"));
    }

    #[test]
    fn y_to_i_matches() {
        assert!(is_inflection("wilier", "wily"));
        assert!(is_inflection("happiness", "happy"));
    }

    #[test]
    fn equality_is_not_an_inflection() {
        assert!(!is_inflection("terse", "terse"));
        assert!(matches_target("terse", "Terse"));
    }

    #[test]
    fn unrelated_words_do_not_match() {
        assert!(!is_inflection("laconic", "terse"));
        assert!(!matches_target("laconic", "terse"));
    }

    #[test]
    fn case_is_ignored() {
        assert!(is_inflection("Cajoled", "cajole"));
        assert!(matches_target("WHEEDLED", "wheedled"));
    }

    #[test]
    fn base_candidates_recover_stem_forms() {
        let candidates = base_candidates("cajoling");
        assert!(candidates.contains(&"cajole".to_string()));

        let candidates = base_candidates("wilier");
        assert!(candidates.contains(&"wily".to_string()));

        let candidates = base_candidates("flattered");
        assert!(candidates.contains(&"flatter".to_string()));
    }
}
