use axon_sdk::errors::{TutorError, TutorErrorExt};
use axon_sdk::types::DocumentKind;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_error_user_hint_never_leaks_cause(cause in "[a-z]{12,40}") {
        let errs = vec![
            TutorError::Configuration(cause.clone()),
            TutorError::NotFound(cause.clone()),
            TutorError::Upstream(cause.clone()),
            TutorError::UnsupportedInput(cause.clone()),
            TutorError::Processing(cause.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&cause));
        }
    }

    #[test]
    fn test_into_processing_is_idempotent(cause in "\\PC*") {
        let once = TutorError::Upstream(cause).into_processing();
        let message = once.to_string();
        let twice = once.into_processing();
        prop_assert_eq!(twice.to_string(), message);
    }

    #[test]
    fn test_document_kind_ignores_extension_case(
        stem in "[a-zA-Z0-9_]{1,16}",
        ext in "(pdf|PDF|Pdf|docx|DOCX|doc|txt|TXT|csv|Csv)",
    ) {
        let kind = DocumentKind::from_filename(&format!("{}.{}", stem, ext));
        let lower = DocumentKind::from_filename(&format!("{}.{}", stem, ext.to_lowercase()));
        prop_assert!(kind.is_some());
        prop_assert_eq!(kind, lower);
    }

    #[test]
    fn test_unknown_extensions_are_rejected(
        stem in "[a-z]{1,8}",
        ext in "(png|jpg|mp3|exe|md|html)",
    ) {
        prop_assert_eq!(DocumentKind::from_filename(&format!("{}.{}", stem, ext)), None);
    }
}
