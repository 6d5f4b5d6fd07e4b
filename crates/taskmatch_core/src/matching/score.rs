//! Literal token-overlap scoring.

use crate::model::directory::Candidate;
use crate::model::work::WorkItem;
use std::collections::BTreeSet;

/// Lowercased, whitespace-separated words of a work-item name.
pub fn keyword_set(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Lowercased, comma-separated tags with surrounding whitespace trimmed.
pub fn tag_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pre-tokenized candidate tags, reused across all work items of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagProfile {
    pub skills: BTreeSet<String>,
    pub domains: BTreeSet<String>,
}

impl TagProfile {
    pub fn of(candidate: &Candidate) -> Self {
        Self {
            skills: tag_set(&candidate.skills),
            domains: tag_set(&candidate.domains),
        }
    }

    /// `|skills ∩ keywords| + |domains ∩ keywords|`.
    ///
    /// A tag present in both sets counts twice.
    pub fn score_keywords(&self, keywords: &BTreeSet<String>) -> u32 {
        let skill_hits = self.skills.intersection(keywords).count();
        let domain_hits = self.domains.intersection(keywords).count();
        (skill_hits + domain_hits) as u32
    }
}

/// Match score between a candidate and a work item. Zero means no signal.
pub fn score(candidate: &Candidate, item: &WorkItem) -> u32 {
    TagProfile::of(candidate).score_keywords(&keyword_set(&item.name))
}

#[cfg(test)]
mod tests {
    use super::{keyword_set, score, tag_set};
    use crate::model::directory::Candidate;
    use crate::model::work::WorkItem;

    fn candidate(skills: &str, domains: &str) -> Candidate {
        Candidate::new(1, "dev@example.com", skills, domains)
    }

    fn item(name: &str) -> WorkItem {
        WorkItem::new(10, 1, name)
    }

    #[test]
    fn literal_tokens_only() {
        let work = item("Implement authentication logic");

        assert_eq!(score(&candidate("api,auth", ""), &work), 0);
        assert_eq!(score(&candidate("authentication", ""), &work), 1);
    }

    #[test]
    fn skills_and_domains_contribute_equally() {
        let work = item("Design database schema");

        let as_skills = score(&candidate("database,schema", ""), &work);
        let as_domains = score(&candidate("", "database,schema"), &work);
        let split = score(&candidate("schema", "database"), &work);
        let swapped = score(&candidate("database", "schema"), &work);

        assert_eq!(as_skills, 2);
        assert_eq!(as_domains, 2);
        assert_eq!(split, 2);
        assert_eq!(swapped, 2);
    }

    #[test]
    fn matching_ignores_case_and_padding_around_tags() {
        let work = item("Build REST API Gateway");
        assert_eq!(score(&candidate(" Rest , api ", "GATEWAY"), &work), 3);
    }

    #[test]
    fn empty_profiles_score_zero() {
        assert_eq!(score(&candidate("", ""), &item("anything at all")), 0);
        assert_eq!(score(&candidate("rust", "backend"), &item("")), 0);
    }

    #[test]
    fn punctuation_is_part_of_the_token() {
        // Whitespace splitting keeps "api," as one word.
        assert_eq!(score(&candidate("api", ""), &item("Design api, docs")), 0);
    }

    #[test]
    fn tag_set_drops_empty_entries() {
        let tags = tag_set("rust,,  ,Go");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("rust"));
        assert!(tags.contains("go"));
    }

    #[test]
    fn keyword_set_deduplicates_words() {
        assert_eq!(keyword_set("test the test suite").len(), 3);
    }
}
