//! Key formats for the sled trees. Words are case-insensitive identifiers
//! and never contain `:`, so `word` always comes first in composite keys.

pub fn word_key(word: &str) -> String {
    word.trim().to_lowercase()
}

pub fn cluster_key(title: &str) -> String {
    title.trim().to_lowercase()
}

pub fn question_key(question_id: &str) -> String {
    question_id.to_string()
}

pub fn progress_key(word: &str, cluster_title: &str) -> String {
    format!("{}:{}", word_key(word), cluster_key(cluster_title))
}

/// Zero-padded so lexicographic iteration matches id order.
pub fn session_key(session_id: i64) -> String {
    format!("{:020}", session_id.max(0))
}

pub fn audio_key(sentence_hash: &str) -> String {
    sentence_hash.to_string()
}

pub fn file_mtime_key(file_path: &str) -> String {
    file_path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_key_is_normalized() {
        assert_eq!(word_key(" Terse "), "terse");
    }

    #[test]
    fn progress_key_pairs_word_and_cluster() {
        assert_eq!(
            progress_key("Terse", "Being Brief"),
            "terse:being brief"
        );
    }

    #[test]
    fn session_keys_order_by_id() {
        assert!(session_key(2) > session_key(1));
        assert!(session_key(10) > session_key(9));
    }
}
