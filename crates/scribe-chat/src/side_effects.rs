//! Detection of project mutations announced in assistant text

/// Kinds of mutation the assistant can announce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectKind {
    Created,
    Updated,
    Deleted,
}

/// Fixed marker substrings. Exact and case-sensitive.
pub const MARKERS: &[(&str, SideEffectKind)] = &[
    ("Nouvelle user story créée", SideEffectKind::Created),
    ("User story mise à jour", SideEffectKind::Updated),
    ("User story supprimée", SideEffectKind::Deleted),
];

/// Decides whether a finalized message reports a server-side mutation
pub trait SideEffectDetector: Send + Sync {
    fn detect(&self, text: &str) -> bool;

    /// Kinds found in `text`, for logging. Detectors without kinds report none.
    fn matched(&self, _text: &str) -> Vec<SideEffectKind> {
        Vec::new()
    }
}

/// Substring scan over [`MARKERS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerClassifier;

impl SideEffectDetector for MarkerClassifier {
    fn detect(&self, text: &str) -> bool {
        MARKERS.iter().any(|(marker, _)| text.contains(marker))
    }

    /// Kinds whose marker appears in `text`, in marker order
    fn matched(&self, text: &str) -> Vec<SideEffectKind> {
        MARKERS
            .iter()
            .filter(|(marker, _)| text.contains(marker))
            .map(|(_, kind)| *kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_creation() {
        assert!(MarkerClassifier.detect("✅ Nouvelle user story créée: X"));
    }

    #[test]
    fn test_detects_update_and_deletion() {
        assert!(MarkerClassifier.detect("✏️ User story mise à jour : login"));
        assert!(MarkerClassifier.detect("🗑️ User story supprimée"));
    }

    #[test]
    fn test_plain_text_is_not_a_side_effect() {
        assert!(!MarkerClassifier.detect("Bonjour! Comment puis-je vous aider ?"));
        assert!(!MarkerClassifier.detect(""));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!MarkerClassifier.detect("nouvelle user story créée"));
        assert!(!MarkerClassifier.detect("USER STORY SUPPRIMÉE"));
    }

    #[test]
    fn test_accents_are_part_of_the_marker() {
        assert!(!MarkerClassifier.detect("Nouvelle user story creee"));
    }

    #[test]
    fn test_matched_lists_every_kind() {
        let text = "User story supprimée. Nouvelle user story créée: Y";
        assert_eq!(
            MarkerClassifier.matched(text),
            vec![SideEffectKind::Created, SideEffectKind::Deleted]
        );
        assert!(MarkerClassifier.matched("Bonjour").is_empty());
    }

    #[test]
    fn test_custom_detector_reports_no_kinds() {
        struct Never;
        impl SideEffectDetector for Never {
            fn detect(&self, _text: &str) -> bool {
                false
            }
        }
        assert!(Never.matched("Nouvelle user story créée").is_empty());
    }
}
