use preload_core::{update, Msg, PreloadSession, SessionConfig};

#[test]
fn update_is_noop() {
    let session = PreloadSession::new(SessionConfig::default());
    let (next, effects) = update(session.clone(), Msg::NoOp);

    assert_eq!(session, next);
    assert!(effects.is_empty());
}
