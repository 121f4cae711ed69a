//! Annotation normalization
//!
//! Every annotation crossing the protocol boundary, inbound from the client
//! or outbound from the inference engine, passes through [`normalize`].
//! After it succeeds the declared kind always agrees with the payload.

use tracing::trace;

use crate::types::{Annotation, AnnotationValue};
use crate::{ExtensionError, Result};

/// Validate an annotation and repair its kind tag from the payload
///
/// # Errors
///
/// - [`ExtensionError::ProtocolViolation`] if no payload is populated
/// - [`ExtensionError::ProtocolViolation`] if the payload is outside the
///   recognized set
pub fn normalize(mut annotation: Annotation) -> Result<Annotation> {
    let kind = match annotation.value.as_ref().map(AnnotationValue::kind) {
        None => return Err(ExtensionError::protocol_violation("missing annotation value")),
        Some(None) => {
            return Err(ExtensionError::protocol_violation("unrecognized annotation kind"));
        }
        Some(Some(kind)) => kind,
    };

    if annotation.kind != kind {
        trace!(declared = ?annotation.kind, actual = ?kind, "Repairing annotation kind");
        annotation.kind = kind;
    }

    Ok(annotation)
}

/// Normalize a list, failing on the first invalid annotation
pub fn normalize_all(annotations: Vec<Annotation>) -> Result<Vec<Annotation>> {
    annotations.into_iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationKind, Event, Motion};
    use proptest::prelude::*;

    #[test]
    fn unspecified_kind_is_repaired_from_payload() {
        let annotation = Annotation {
            kind: AnnotationKind::Unspecified,
            ..Annotation::classification("dark", 1.0)
        };

        let normalized = normalize(annotation).unwrap();
        assert_eq!(normalized.kind, AnnotationKind::Classification);
    }

    #[test]
    fn mismatched_kind_is_overwritten() {
        let annotation = Annotation {
            kind: AnnotationKind::Text,
            ..Annotation::new(AnnotationValue::Motion(Motion { region: None }))
        };

        assert_eq!(normalize(annotation).unwrap().kind, AnnotationKind::Motion);
    }

    #[test]
    fn matching_annotation_is_unchanged() {
        let annotation = Annotation::text("plate ABC123").with_subtype("ocr");
        assert_eq!(normalize(annotation.clone()).unwrap(), annotation);
    }

    #[test]
    fn missing_value_is_a_protocol_violation() {
        let annotation = Annotation { kind: AnnotationKind::Classification, ..Default::default() };

        match normalize(annotation) {
            Err(ExtensionError::ProtocolViolation { reason }) => {
                assert_eq!(reason, "missing annotation value");
            }
            other => panic!("expected protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_value_is_a_protocol_violation() {
        let annotation =
            Annotation { value: Some(AnnotationValue::Unrecognized), ..Default::default() };

        match normalize(annotation) {
            Err(ExtensionError::ProtocolViolation { reason }) => {
                assert_eq!(reason, "unrecognized annotation kind");
            }
            other => panic!("expected protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn normalize_all_stops_at_first_invalid() {
        let annotations = vec![
            Annotation::new(AnnotationValue::Event(Event {
                name: "door_open".into(),
                properties: Default::default(),
            })),
            Annotation::default(),
        ];

        assert!(normalize_all(annotations).is_err());
        assert!(normalize_all(Vec::new()).unwrap().is_empty());
    }

    fn arb_kind() -> impl Strategy<Value = AnnotationKind> {
        prop_oneof![
            Just(AnnotationKind::Unspecified),
            Just(AnnotationKind::Classification),
            Just(AnnotationKind::Motion),
            Just(AnnotationKind::Entity),
            Just(AnnotationKind::Text),
            Just(AnnotationKind::Event),
            Just(AnnotationKind::Other),
        ]
    }

    proptest! {
        #[test]
        fn normalized_kind_always_matches_payload(declared in arb_kind(), label in "[a-z]{1,8}") {
            let annotation = Annotation { kind: declared, ..Annotation::entity(label, 0.5, None) };
            let normalized = normalize(annotation).unwrap();

            prop_assert_eq!(normalized.kind, AnnotationKind::Entity);
            let payload_kind = normalized.value.as_ref().and_then(AnnotationValue::kind);
            prop_assert_eq!(Some(normalized.kind), payload_kind);
        }
    }
}
