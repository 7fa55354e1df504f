//! Session fitting and operation tests against a scripted engine.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::{Scenario, ScriptedFactory};
use contextfit_core::{EngineError, Error, OutputChannel, ProviderError};
use contextfit_session::{
    Session, SessionOptions, architect_with_aider, ask_aider, code_with_aider, fit_session,
};

fn options(read: &[&str]) -> SessionOptions {
    SessionOptions::new("/w", "test/model")
        .with_read_files(read.iter().copied())
        .with_write_tokens(100)
}

fn readonly_names(session: &Session) -> Vec<String> {
    session.snapshot().readonly().map(|r| r.name.clone()).collect()
}

/// A sink that records everything written to it.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<u8>>>);

impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Recorder {
    fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

// --- Fitting ---

#[test]
fn drops_least_important_candidate_until_reply_fits() {
    let factory = ScriptedFactory::new(
        Scenario::new(1000, 200)
            .text("A", 400)
            .text("B", 300)
            .text("C", 250),
    );
    let session = fit_session(&factory, &options(&["A", "B", "C"]), OutputChannel::discard())
        .unwrap();

    let mut names = readonly_names(&session);
    names.sort();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(session.remaining_tokens(), 100);
    assert_eq!(session.snapshot().total_tokens, 900);
    assert_eq!(session.dropped(), ["C".to_string()]);
    assert_eq!(factory.creates.get(), 2);
}

#[test]
fn fitting_context_is_kept_whole() {
    let factory = ScriptedFactory::new(Scenario::new(1000, 100).text("A", 200).text("B", 200));
    let session = fit_session(&factory, &options(&["A", "B"]), OutputChannel::discard()).unwrap();
    assert_eq!(readonly_names(&session).len(), 2);
    assert!(session.dropped().is_empty());
    assert_eq!(factory.creates.get(), 1);
}

#[test]
fn narrows_one_candidate_per_step() {
    let factory = ScriptedFactory::new(
        Scenario::new(1000, 100)
            .text("a", 300)
            .text("b", 300)
            .text("c", 300)
            .text("d", 300),
    );
    let session =
        fit_session(&factory, &options(&["a", "b", "c", "d"]), OutputChannel::discard()).unwrap();
    // 100 + 2×300 = 700 leaves 300 ≥ 100; 3×300 would leave 0
    assert_eq!(session.dropped(), ["d".to_string(), "c".to_string()]);
    assert_eq!(factory.creates.get(), 3);
}

#[test]
fn writable_files_are_never_dropped() {
    let factory = ScriptedFactory::new(
        Scenario::new(1000, 100)
            .text("main.rs", 500)
            .text("a.md", 200)
            .text("b.md", 200),
    );
    let opts = options(&["a.md", "b.md"]).with_write_files(["main.rs"]);
    let session = fit_session(&factory, &opts, OutputChannel::discard()).unwrap();
    assert_eq!(session.snapshot().writable().count(), 1);
    assert_eq!(readonly_names(&session), vec!["a.md"]);
    assert_eq!(session.remaining_tokens(), 200);
}

// --- Exhaustion ---

#[test]
fn strict_mode_fails_when_writable_files_alone_overflow() {
    let factory = ScriptedFactory::new(Scenario::new(1000, 200).text("huge.rs", 1200));
    let opts = options(&[]).with_write_files(["huge.rs"]);
    let err = fit_session(&factory, &opts, OutputChannel::discard()).unwrap_err();
    match err {
        Error::ContextExhausted {
            write_tokens,
            remaining_tokens,
            max_tokens,
        } => {
            assert_eq!(write_tokens, 100);
            assert_eq!(remaining_tokens, -400);
            assert_eq!(max_tokens, 1000);
        }
        other => panic!("expected ContextExhausted, got {other:?}"),
    }
}

#[test]
fn lenient_mode_returns_overflowing_session() {
    let factory = ScriptedFactory::new(Scenario::new(1000, 200).text("huge.rs", 1200));
    let opts = options(&[]).with_write_files(["huge.rs"]).lenient();
    let session = fit_session(&factory, &opts, OutputChannel::discard()).unwrap();
    assert_eq!(session.remaining_tokens(), -400);
}

#[test]
fn last_candidate_is_never_dropped() {
    let factory = ScriptedFactory::new(Scenario::new(1000, 200).text("A", 900).text("B", 400));
    let strict = fit_session(&factory, &options(&["A", "B"]), OutputChannel::discard());
    assert!(matches!(strict, Err(Error::ContextExhausted { .. })));

    let lenient = fit_session(&factory, &options(&["A", "B"]).lenient(), OutputChannel::discard())
        .unwrap();
    assert_eq!(readonly_names(&lenient), vec!["A"]);
    assert_eq!(lenient.dropped(), ["B".to_string()]);
    assert_eq!(lenient.remaining_tokens(), -100);
}

#[test]
fn single_candidate_overflow_keeps_the_candidate_when_lenient() {
    let factory = ScriptedFactory::new(Scenario::new(1000, 200).text("A", 900));
    let session =
        fit_session(&factory, &options(&["A"]).lenient(), OutputChannel::discard()).unwrap();
    assert_eq!(readonly_names(&session), vec!["A"]);
    assert_eq!(session.remaining_tokens(), -100);
}

#[test]
fn unknown_model_metadata_means_no_headroom() {
    let mut scenario = Scenario::new(0, 10).text("A", 10);
    scenario.max_tokens = None;
    scenario.unit_cost = None;
    let factory = ScriptedFactory::new(scenario);

    let err = fit_session(&factory, &options(&["A"]), OutputChannel::discard()).unwrap_err();
    assert!(matches!(err, Error::ContextExhausted { max_tokens: 0, .. }));

    let session =
        fit_session(&factory, &options(&["A"]).lenient(), OutputChannel::discard()).unwrap();
    assert_eq!(session.snapshot().total_cost, 0.0);
}

#[test]
fn engine_construction_failure_propagates() {
    let factory = ScriptedFactory::failing();
    let err = fit_session(&factory, &options(&["A"]), OutputChannel::discard()).unwrap_err();
    assert!(matches!(err, Error::Engine(EngineError::NotFound(_))));
}

#[test]
fn unreadable_writable_file_propagates() {
    // Writable files must be text or images.
    let factory = ScriptedFactory::new(Scenario::new(1000, 0).binary("blob.bin"));
    let opts = options(&[]).with_write_files(["blob.bin"]);
    let err = fit_session(&factory, &opts, OutputChannel::discard()).unwrap_err();
    assert!(matches!(err, Error::Engine(EngineError::Io { .. })));
}

// --- Accounting rules ---

#[test]
fn readonly_images_are_not_accounted() {
    let factory = ScriptedFactory::new(
        Scenario::new(10_000, 100)
            .image("logo.png", 765)
            .image("diagram.png", 1105)
            .text("notes.md", 50),
    );
    let opts = options(&["logo.png", "notes.md"]).with_write_files(["diagram.png"]);
    let session = fit_session(&factory, &opts, OutputChannel::discard()).unwrap();

    let files = &session.snapshot().files;
    assert!(!files.contains_key("logo.png"));
    assert_eq!(files["diagram.png"].tokens, 1105);
    assert!(!files["diagram.png"].readonly);
    assert_eq!(files["notes.md"].tokens, 50);
}

#[test]
fn readonly_binary_files_are_not_accounted() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).binary("data.bin"));
    let session =
        fit_session(&factory, &options(&["data.bin"]), OutputChannel::discard()).unwrap();
    assert!(session.snapshot().files.is_empty());
}

#[test]
fn promoting_readonly_to_writable_leaves_one_record() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).text("lib.rs", 40));
    let mut session = fit_session(&factory, &options(&["lib.rs"]), OutputChannel::discard())
        .unwrap();
    assert!(session.snapshot().files["lib.rs"].readonly);

    session.add_writable_files(&["lib.rs"]).unwrap();
    assert_eq!(session.snapshot().files.len(), 1);
    assert!(!session.snapshot().files["lib.rs"].readonly);
    assert_eq!(session.engine().readonly_files().len(), 0);
}

#[test]
fn repo_map_tokens_count_toward_total() {
    let factory = ScriptedFactory::new(
        Scenario::new(10_000, 100)
            .text("a.rs", 10)
            .text("b.rs", 10)
            .repo_map(64),
    );
    let session = fit_session(&factory, &options(&["a.rs"]), OutputChannel::discard()).unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.repo_map_tokens, 64);
    assert_eq!(snapshot.total_tokens, 100 + 64 + 10);
}

// --- Operations ---

#[test]
fn adding_files_returns_notices_and_reloads() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).text("a.rs", 10).text("b.rs", 20));
    let recorder = Recorder::default();
    let mut session =
        fit_session(&factory, &options(&[]), OutputChannel::new(recorder.clone())).unwrap();

    let notices = session.add_readonly_files(&["a.rs", "missing.rs"]).unwrap();
    assert!(notices.contains("Added a.rs to read-only files"));
    assert!(notices.contains("missing.rs does not exist"));
    assert_eq!(session.snapshot().total_tokens, 110);

    // Re-adding is a no-op for membership but still reloads.
    session.add_readonly_files(&["a.rs"]).unwrap();
    assert_eq!(session.snapshot().files.len(), 1);
    assert!(recorder.is_empty());
}

#[test]
fn failed_writable_batch_still_reloads_snapshot() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).text("a.rs", 10));
    let output = OutputChannel::discard();
    let mut session = fit_session(&factory, &options(&[]), output.clone()).unwrap();

    let err = session.add_writable_files(&["a.rs", "../escape.rs"]).unwrap_err();
    assert!(matches!(err, Error::Engine(EngineError::OutsideWorkspace(_))));

    // a.rs was tracked before the failing path and is accounted for.
    assert_eq!(session.engine().writable_files().len(), 1);
    assert_eq!(session.snapshot().files.len(), 1);
    assert_eq!(session.remaining_tokens(), 10_000 - 110);
    assert_eq!(output.depth(), 0);
}

#[test]
fn failed_readonly_batch_still_reloads_snapshot() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).text("a.rs", 10));
    let mut session = fit_session(&factory, &options(&[]), OutputChannel::discard()).unwrap();

    assert!(session.add_readonly_files(&["a.rs", "/etc/passwd"]).is_err());
    assert!(session.snapshot().files["a.rs"].readonly);
    assert_eq!(session.snapshot().total_tokens, 110);
}

#[test]
fn send_returns_captured_reply_and_keeps_sink_clean() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).text("a.rs", 10));
    let recorder = Recorder::default();
    let output = OutputChannel::new(recorder.clone());
    let mut session = fit_session(&factory, &options(&["a.rs"]), output.clone()).unwrap();

    let reply = session.ask("What does a.rs do?").unwrap();
    assert_eq!(reply, "scripted reply\n");
    assert!(recorder.is_empty());
    assert_eq!(output.depth(), 0);

    // The recorded turn shows up after a reload.
    let snapshot = session.reload().unwrap();
    assert_eq!(snapshot.chat_tokens, 2 * common::CHAT_TOKENS_PER_MESSAGE);
}

#[test]
fn dispatch_failure_propagates_and_restores_output() {
    let factory = ScriptedFactory::new(Scenario::new(10_000, 100).failing_dispatch("offline"));
    let output = OutputChannel::discard();
    let mut session = fit_session(&factory, &options(&[]), output.clone()).unwrap();

    let err = session.code("Refactor").unwrap_err();
    assert!(matches!(
        err,
        Error::Engine(EngineError::Dispatch(ProviderError::Network(_)))
    ));
    assert_eq!(output.depth(), 0);
}

#[test]
fn request_operations_fit_and_send() {
    let factory = ScriptedFactory::new(
        Scenario::new(1000, 200)
            .text("A", 400)
            .text("B", 300)
            .text("C", 250),
    );
    let opts = options(&["A", "B", "C"]);

    assert_eq!(ask_aider(&factory, &opts, "q", true).unwrap(), "scripted reply\n");
    assert_eq!(architect_with_aider(&factory, &opts, "plan", true).unwrap(), "scripted reply\n");
    assert_eq!(code_with_aider(&factory, &opts, "edit", true).unwrap(), "scripted reply\n");
    // Two engine builds per request: full set, then without C.
    assert_eq!(factory.creates.get(), 6);
}

#[test]
fn request_operations_respect_strictness() {
    let factory = ScriptedFactory::new(Scenario::new(100, 200));
    let strict = ask_aider(&factory, &options(&[]), "q", true);
    assert!(matches!(strict, Err(Error::ContextExhausted { .. })));

    let lenient = ask_aider(&factory, &options(&[]), "q", false).unwrap();
    assert_eq!(lenient, "scripted reply\n");
}

#[test]
fn per_call_strictness_overrides_lenient_options() {
    let factory = ScriptedFactory::new(Scenario::new(100, 200));
    let opts = options(&[]).lenient();

    let err = code_with_aider(&factory, &opts, "edit", true).unwrap_err();
    assert!(matches!(err, Error::ContextExhausted { .. }));
    let plan = architect_with_aider(&factory, &opts, "plan", false).unwrap();
    assert_eq!(plan, "scripted reply\n");
}
