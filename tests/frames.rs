#[cfg(test)]
mod tests {
    use lucy_client::api::models_ws::{WsClientFrame, WsServerFrame};
    use lucy_client::stream::TypingBuffer;
    use serde_json::{json, Value};

    fn parse(value: Value) -> WsServerFrame {
        WsServerFrame::parse(&value.to_string())
    }

    #[test]
    fn test_outgoing_frame_shapes() {
        let message = WsClientFrame::message("hello", Some("s1")).to_json().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&message).unwrap(),
            json!({ "message": "hello", "session_id": "s1" })
        );

        let cancel = WsClientFrame::cancel(None).to_json().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&cancel).unwrap(),
            json!({ "cancel": true, "session_id": null })
        );
    }

    #[test]
    fn test_incoming_priority_order() {
        assert_eq!(
            parse(json!({ "cancelled": true, "partial": true, "delta": "x" })),
            WsServerFrame::Cancelled
        );
        assert_eq!(
            parse(json!({ "partial": true, "final": true, "delta": "a", "response": "b" })),
            WsServerFrame::Partial { delta: "a".to_string() }
        );
        assert_eq!(
            parse(json!({ "final": true, "response": "R" })),
            WsServerFrame::Final { response: "R".to_string() }
        );
        assert_eq!(
            parse(json!({ "session_id": "s1", "response": "hi", "t": 0.3 })),
            WsServerFrame::Plain {
                response: "hi".to_string(),
                session_id: Some("s1".to_string())
            }
        );
    }

    #[test]
    fn test_markers_use_loose_truthiness() {
        assert_eq!(parse(json!({ "cancelled": 1 })), WsServerFrame::Cancelled);
        assert_eq!(
            parse(json!({ "cancelled": 0, "partial": "yes", "delta": "d" })),
            WsServerFrame::Partial { delta: "d".to_string() }
        );
        assert!(matches!(
            parse(json!({ "cancelled": false, "partial": null, "final": "" })),
            WsServerFrame::Unknown(_)
        ));
    }

    #[test]
    fn test_final_without_response_is_empty_text() {
        assert_eq!(
            parse(json!({ "final": true })),
            WsServerFrame::Final { response: String::new() }
        );
    }

    #[test]
    fn test_malformed_frames_are_unknown() {
        assert_eq!(
            WsServerFrame::parse("{not json"),
            WsServerFrame::Unknown("{not json".to_string())
        );
        assert!(matches!(parse(json!([1, 2, 3])), WsServerFrame::Unknown(_)));
        assert!(matches!(parse(json!({ "response": "" })), WsServerFrame::Unknown(_)));
    }

    #[test]
    fn test_partials_join_with_single_spaces() {
        let sequences: [&[&str]; 4] = [
            &["hola"],
            &["hola", "qué", "tal"],
            &["Lucy", "está", "pensando", "..."],
            &["a", "b", "c", "d", "e", "f"],
        ];

        for deltas in sequences {
            let mut draft = TypingBuffer::new();
            for delta in deltas {
                draft.push(delta);
            }
            assert_eq!(draft.text(), Some(deltas.join(" ").as_str()));
        }
    }

    #[test]
    fn test_empty_first_fragment_adds_no_leading_space() {
        let mut draft = TypingBuffer::new();
        assert_eq!(draft.push(""), "");
        assert_eq!(draft.push("hola"), "hola");
        assert!(draft.is_accumulating());
    }

    #[test]
    fn test_final_replaces_accumulated_text() {
        let mut draft = TypingBuffer::new();
        draft.push("borrador");
        draft.push("parcial");

        let done = draft.finalize("Respuesta definitiva");
        assert_eq!(done.text, "Respuesta definitiva");
        assert!(done.had_draft);
        assert_eq!(draft, TypingBuffer::Absent);
    }

    #[test]
    fn test_cancel_yields_empty_message() {
        let mut draft = TypingBuffer::new();
        draft.push("algo");

        let done = draft.cancel();
        assert_eq!(done.text, "");
        assert!(done.had_draft);
        assert!(!draft.is_accumulating());

        let again = draft.cancel();
        assert!(!again.had_draft);
    }
}
