use tether_core::event_queue::{BACKSPACE, CARRIAGE_RETURN, normalize_paste};
use tether_core::registry::parse_invocation;
use tether_core::{
    Command, CommandParser, Dispatch, DrainOutcome, EditorState, EventClass, EventQueue,
    FormField, InputEvent, LineEditor, NetworkReply, NetworkRequest, Renderer, ScriptError,
    ScriptRegistry, Session, Transcript, UnsupportedCommand, html_escape,
};

fn press_all(session: &mut Session<Transcript>, text: &str) -> Option<String> {
    let mut completed = None;
    for ch in text.chars() {
        if let Some(line) = session.push_event(InputEvent::press(ch)) {
            completed = Some(line);
        }
    }
    completed
}

// ============================================================================
// InputEvent Tests
// ============================================================================

#[test]
fn test_press_event_keeps_code_point() {
    let ev = InputEvent::press('a');
    assert_eq!(ev.code(), 97);
    assert_eq!(ev.class(), EventClass::Press);
    assert_eq!(ev.key_code(), 97);
}

#[test]
fn test_down_event_offset() {
    let ev = InputEvent::down(65).unwrap();
    assert_eq!(ev.code(), 65 + 256);
    assert_eq!(ev.class(), EventClass::Down);
    assert_eq!(ev.key_code(), 65);
}

#[test]
fn test_up_event_offset() {
    let ev = InputEvent::up(13).unwrap();
    assert_eq!(ev.code(), 13 + 512);
    assert_eq!(ev.class(), EventClass::Up);
    assert_eq!(ev.key_code(), 13);
}

#[test]
fn test_high_code_point_is_press_class() {
    let ev = InputEvent::press('€');
    assert_eq!(ev.class(), EventClass::Press);
    assert!(!ev.is_printable());
}

#[test]
fn test_backspace_recognised_in_press_and_down_class() {
    assert!(InputEvent::press('\u{8}').is_backspace());
    assert!(InputEvent::down(BACKSPACE).unwrap().is_backspace());
    assert!(!InputEvent::up(BACKSPACE).unwrap().is_backspace());
}

#[test]
fn test_carriage_return_only_in_press_class() {
    assert!(InputEvent::press('\r').is_carriage_return());
    assert!(!InputEvent::down(CARRIAGE_RETURN).unwrap().is_carriage_return());
}

#[test]
fn test_printable_range_bounds() {
    assert!(InputEvent::press(' ').is_printable());
    assert!(InputEvent::press('~').is_printable());
    assert!(!InputEvent::press('\u{7f}').is_printable());
    assert!(!InputEvent::press('\u{1f}').is_printable());
}

// ============================================================================
// EventQueue Tests
// ============================================================================

#[test]
fn test_queue_pop_preserves_append_order() {
    let mut q = EventQueue::new();
    for ch in "xyz".chars() {
        q.append(InputEvent::press(ch));
    }
    assert_eq!(q.pop_one().map(|e| e.as_char()), Some('x'));
    assert_eq!(q.pop_one().map(|e| e.as_char()), Some('y'));
    assert_eq!(q.pop_one().map(|e| e.as_char()), Some('z'));
    assert!(q.pop_one().is_none());
}

#[test]
fn test_queue_drain_all_empties() {
    let mut q = EventQueue::new();
    q.append(InputEvent::press('a'));
    q.append(InputEvent::down(65).unwrap());
    q.append(InputEvent::up(65).unwrap());
    let blob = q.drain_all();
    assert_eq!(blob.chars().map(|c| c as u32).collect::<Vec<_>>(), vec![97, 321, 577]);
    assert!(q.is_empty());
    assert_eq!(q.drain_all(), "");
}

#[test]
fn test_queue_underflow_is_empty_not_error() {
    let mut q = EventQueue::new();
    assert!(q.pop_one().is_none());
    assert_eq!(q.len(), 0);
}

#[test]
fn test_normalize_paste() {
    assert_eq!(normalize_paste("a\u{2003}b"), "a b");
    assert_eq!(normalize_paste("one\r\ntwo\n"), "one\rtwo\r");
}

#[test]
fn test_append_paste_counts_events() {
    let mut q = EventQueue::new();
    assert_eq!(q.append_paste("ab\r\nc"), 4);
    assert_eq!(q.drain_all(), "ab\rc");
}

// ============================================================================
// LineEditor Tests
// ============================================================================

#[test]
fn test_editor_starts_idle() {
    let ed = LineEditor::new();
    assert_eq!(ed.state(), EditorState::Idle);
    assert_eq!(ed.buffer(), "");
}

#[test]
fn test_idle_editor_leaves_queue_alone() {
    let mut ed = LineEditor::new();
    let mut q = EventQueue::new();
    q.append(InputEvent::press('a'));
    assert_eq!(ed.drain(&mut q), DrainOutcome::Skipped);
    assert_eq!(q.len(), 1);
}

#[test]
fn test_backspaces_apply_left_to_right() {
    let mut ed = LineEditor::new();
    ed.activate();
    for ch in "abc\u{8}\u{8}de\u{8}f".chars() {
        ed.apply(InputEvent::press(ch));
    }
    assert_eq!(ed.buffer(), "adf");
}

#[test]
fn test_backspace_on_empty_buffer_is_harmless() {
    let mut ed = LineEditor::new();
    ed.activate();
    ed.apply(InputEvent::down(BACKSPACE).unwrap());
    assert_eq!(ed.buffer(), "");
    assert!(ed.is_reading());
}

#[test]
fn test_non_printable_events_are_consumed_without_effect() {
    let mut ed = LineEditor::new();
    let mut q = EventQueue::new();
    ed.activate();
    q.append(InputEvent::down(65).unwrap());
    q.append(InputEvent::press('a'));
    q.append(InputEvent::up(65).unwrap());
    q.append(InputEvent::press('\t'));
    q.append(InputEvent::press('é'));
    assert_eq!(ed.drain(&mut q), DrainOutcome::Pending);
    assert_eq!(ed.buffer(), "a");
    assert!(q.is_empty());
}

#[test]
fn test_carriage_return_completes_and_keeps_rest_queued() {
    let mut ed = LineEditor::new();
    let mut q = EventQueue::new();
    ed.activate();
    for ch in "hi\rnext".chars() {
        q.append(InputEvent::press(ch));
    }
    assert_eq!(ed.drain(&mut q), DrainOutcome::Completed("hi".to_string()));
    assert_eq!(ed.state(), EditorState::Idle);
    assert_eq!(ed.buffer(), "");
    assert_eq!(q.drain_all(), "next");
}

#[test]
fn test_activation_resets_buffer() {
    let mut ed = LineEditor::new();
    ed.activate();
    ed.apply(InputEvent::press('x'));
    ed.activate();
    assert_eq!(ed.buffer(), "");
}

#[test]
fn test_cancel_discards_partial_line() {
    let mut ed = LineEditor::new();
    ed.activate();
    ed.apply(InputEvent::press('x'));
    assert_eq!(ed.cancel(), Some("x".to_string()));
    assert_eq!(ed.state(), EditorState::Idle);
    assert_eq!(ed.cancel(), None);
}

// ============================================================================
// Renderer Tests
// ============================================================================

#[test]
fn test_html_escape() {
    assert_eq!(html_escape("<b>&\""), "&lt;b&gt;&amp;&quot;");
    assert_eq!(html_escape("plain"), "plain");
}

#[test]
fn test_append_escaped_never_emits_markup() {
    let mut t = Transcript::new();
    t.append_escaped("<b>&\"");
    assert_eq!(t.page(), "&lt;b&gt;&amp;&quot;");
}

#[test]
fn test_append_raw_is_verbatim() {
    let mut t = Transcript::new();
    t.append_raw("<b>bold</b>");
    assert_eq!(t.page(), "<b>bold</b>");
}

#[test]
fn test_set_page_replaces_output() {
    let mut t = Transcript::new();
    t.append_escaped("old");
    t.set_page("<i>new</i>");
    assert_eq!(t.page(), "<i>new</i>");
    t.set_page("");
    assert_eq!(t.page(), "");
}

#[test]
fn test_refresh_prompt_escapes_and_scrolls() {
    let mut t = Transcript::new();
    t.refresh_prompt("a<b");
    assert_eq!(t.prompt(), "a&lt;b");
    assert_eq!(t.scrolls(), 1);
}

#[test]
fn test_transcript_drops_oldest_fragments_over_limit() {
    let mut t = Transcript::with_limit(8);
    t.append_raw("aaaa");
    t.append_raw("bbbb");
    t.append_raw("cccc");
    assert_eq!(t.page(), "bbbbcccc");
}

#[test]
fn test_transcript_keeps_oversized_newest_fragment() {
    let mut t = Transcript::with_limit(4);
    t.append_raw("0123456789");
    assert_eq!(t.page(), "0123456789");
}

// ============================================================================
// CommandParser Tests
// ============================================================================

#[test]
fn test_parse_every_prefix() {
    assert_eq!(CommandParser::parse("s"), Command::Sync);
    assert_eq!(CommandParser::parse("ahey"), Command::Alert("hey".into()));
    assert_eq!(CommandParser::parse("jclear"), Command::Script("clear".into()));
    assert_eq!(CommandParser::parse("c_"), Command::SetCursor("_".into()));
    assert_eq!(CommandParser::parse("p<p>"), Command::Page("<p>".into()));
    assert_eq!(CommandParser::parse("ook"), Command::Type("ok".into()));
    assert_eq!(CommandParser::parse("O<br>"), Command::RawType("<br>".into()));
    assert_eq!(CommandParser::parse("i"), Command::GetEvent);
    assert_eq!(CommandParser::parse("I"), Command::GetEvents);
    assert_eq!(CommandParser::parse("r"), Command::ReadLine);
    assert!(matches!(CommandParser::parse("hGET|u"), Command::Http(_)));
}

#[test]
fn test_parse_unknown_prefix() {
    assert_eq!(
        CommandParser::parse("zzz"),
        Command::Unsupported(UnsupportedCommand { prefix: Some('z') })
    );
}

#[test]
fn test_parse_empty_message() {
    let cmd = CommandParser::parse("");
    assert_eq!(cmd, Command::Unsupported(UnsupportedCommand { prefix: None }));
    assert_eq!(cmd.prefix(), None);
}

#[test]
fn test_parse_multibyte_prefix() {
    let cmd = CommandParser::parse("ñrest");
    assert_eq!(cmd.prefix(), Some('ñ'));
}

#[test]
fn test_unsupported_display() {
    let e = UnsupportedCommand { prefix: Some('z') };
    assert_eq!(e.to_string(), "Unknown message prefix \"z\"");
}

#[test]
fn test_command_encode_matches_parse() {
    for msg in ["s", "ahello", "o<tag>", "I", "hPOST|http://x|~k|a|b"] {
        assert_eq!(CommandParser::parse(msg).encode(), msg);
    }
}

#[test]
fn test_expects_reply() {
    assert!(Command::Sync.expects_reply());
    assert!(Command::GetEvents.expects_reply());
    assert!(!Command::Type("x".into()).expects_reply());
    assert!(!Command::Alert("x".into()).expects_reply());
}

// ============================================================================
// NetworkRequest Tests
// ============================================================================

#[test]
fn test_decode_pairs() {
    let req = NetworkRequest::decode("GET|http://x|a|1|b|2");
    assert_eq!(req.method, "GET");
    assert_eq!(req.url, "http://x");
    assert_eq!(req.values(), vec![("a", "1"), ("b", "2")]);
}

#[test]
fn test_decode_tail_sentinel() {
    let req = NetworkRequest::decode("POST|http://x|~note|hello|world");
    assert_eq!(
        req.fields,
        vec![FormField::Tail {
            key: "note".into(),
            value: "hello|world".into()
        }]
    );
    assert_eq!(req.value("note"), Some("hello|world"));
}

#[test]
fn test_decode_pairs_then_tail() {
    let req = NetworkRequest::decode("POST|u|a|1|~body|x|y|z");
    assert_eq!(req.values(), vec![("a", "1"), ("body", "x|y|z")]);
}

#[test]
fn test_decode_tail_with_nothing_after() {
    let req = NetworkRequest::decode("POST|u|~empty");
    assert_eq!(req.value("empty"), Some(""));
}

#[test]
fn test_decode_missing_fields_are_empty() {
    let req = NetworkRequest::decode("");
    assert_eq!(req.method, "");
    assert_eq!(req.url, "");
    assert!(req.fields.is_empty());

    let req = NetworkRequest::decode("GET");
    assert_eq!(req.method, "GET");
    assert_eq!(req.url, "");
}

#[test]
fn test_decode_dangling_key_gets_empty_value() {
    let req = NetworkRequest::decode("POST|u|a|1|b");
    assert_eq!(req.value("b"), Some(""));
}

#[test]
fn test_duplicate_keys_last_value_first_position() {
    let req = NetworkRequest::decode("POST|u|a|1|b|2|a|3");
    assert_eq!(req.values(), vec![("a", "3"), ("b", "2")]);
}

#[test]
fn test_only_exact_post_has_body() {
    assert!(NetworkRequest::new("POST", "u").has_body());
    assert!(!NetworkRequest::new("post", "u").has_body());
    assert!(!NetworkRequest::new("GET", "u").has_body());
}

#[test]
fn test_request_builder_encode() {
    let req = NetworkRequest::new("POST", "http://x")
        .field("a", "1")
        .tail("text", "p|q");
    assert_eq!(req.encode(), "POST|http://x|a|1|~text|p|q");
    assert_eq!(NetworkRequest::decode(&req.encode()), req);
}

// ============================================================================
// NetworkReply Tests
// ============================================================================

#[test]
fn test_status_204_encoding() {
    let encoded = NetworkReply::new(204, "body|text").encode();
    let mut chars = encoded.chars();
    assert_eq!(chars.next(), Some('\u{2}'));
    assert_eq!(chars.next(), Some('\u{4}'));
    assert_eq!(chars.as_str(), "body|text");
}

#[test]
fn test_status_200_encoding() {
    assert_eq!(NetworkReply::new(200, "ok").encode(), "\u{2}\u{0}ok");
}

#[test]
fn test_unreachable_status_wraps_to_ffff() {
    let encoded = NetworkReply::unreachable().encode();
    assert_eq!(encoded, "\u{ffff}\u{ffff}");
}

#[test]
fn test_reply_decode_reconstructs_status() {
    for status in [0, 200, 204, 404, 500, -1, -150] {
        let decoded = NetworkReply::decode(&NetworkReply::new(status, "b").encode()).unwrap();
        assert_eq!(decoded.status, status);
        assert_eq!(decoded.body, "b");
    }
}

#[test]
fn test_reply_decode_too_short() {
    assert!(NetworkReply::decode("").is_none());
    assert!(NetworkReply::decode("\u{2}").is_none());
}

// ============================================================================
// ScriptRegistry Tests
// ============================================================================

#[test]
fn test_parse_invocation() {
    assert_eq!(parse_invocation("echo hello world"), Some(("echo", "hello world")));
    assert_eq!(parse_invocation("  clear  "), Some(("clear", "")));
    assert_eq!(parse_invocation("   "), None);
}

#[test]
fn test_builtin_clear() {
    let registry = ScriptRegistry::with_builtins();
    let mut t = Transcript::new();
    t.append_raw("old");
    t.set_cursor("_");
    registry.invoke("clear", &mut t).unwrap();
    assert_eq!(t.page(), "");
    assert_eq!(t.cursor(), "");
}

#[test]
fn test_builtin_echo_escapes() {
    let registry = ScriptRegistry::with_builtins();
    let mut t = Transcript::new();
    registry.invoke("echo <x>", &mut t).unwrap();
    assert_eq!(t.page(), "&lt;x&gt;");
}

#[test]
fn test_unknown_operation() {
    let registry = ScriptRegistry::with_builtins();
    let mut t = Transcript::new();
    let err = registry.invoke("alert(1)", &mut t).unwrap_err();
    assert!(matches!(err, ScriptError::Unknown(name) if name == "alert(1)"));
}

#[test]
fn test_empty_registry_has_no_builtins() {
    let registry = ScriptRegistry::empty();
    assert!(!registry.contains("clear"));
    assert_eq!(registry.names().count(), 0);
}

#[test]
fn test_custom_operation_and_failure() {
    let mut registry = ScriptRegistry::empty();
    registry.register("title", |args, r| {
        r.set_cursor(args);
        Ok(())
    });
    registry.register("boom", |_, _| anyhow::bail!("kaput"));

    let mut t = Transcript::new();
    registry.invoke("title hello", &mut t).unwrap();
    assert_eq!(t.cursor(), "hello");

    let err = registry.invoke("boom", &mut t).unwrap_err();
    assert!(err.to_string().contains("kaput"));
}

// ============================================================================
// Session Tests
// ============================================================================

#[test]
fn test_session_sync_replies_empty() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(s.handle_message("s"), Dispatch::Reply(String::new()));
}

#[test]
fn test_session_render_commands_have_no_reply() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(s.handle_message("o<hi>"), Dispatch::NoReply);
    assert_eq!(s.handle_message("O<b>x</b>"), Dispatch::NoReply);
    assert_eq!(s.handle_message("c|"), Dispatch::NoReply);
    assert_eq!(s.handle_message("anotice"), Dispatch::NoReply);
    assert_eq!(s.renderer().page(), "&lt;hi&gt;<b>x</b>");
    assert_eq!(s.renderer().cursor(), "|");
    assert_eq!(s.renderer().alerts(), &["notice".to_string()]);
}

#[test]
fn test_session_page_replaces() {
    let mut s = Session::new(Transcript::new());
    s.handle_message("oold");
    s.handle_message("p<h1>new</h1>");
    assert_eq!(s.renderer().page(), "<h1>new</h1>");
}

#[test]
fn test_session_getevent_drains_in_order() {
    let mut s = Session::new(Transcript::new());
    press_all(&mut s, "ab");
    assert_eq!(s.handle_message("i"), Dispatch::Reply("a".into()));
    assert_eq!(s.handle_message("i"), Dispatch::Reply("b".into()));
    assert_eq!(s.handle_message("i"), Dispatch::Reply(String::new()));
}

#[test]
fn test_session_getevents_returns_everything() {
    let mut s = Session::new(Transcript::new());
    press_all(&mut s, "abc");
    assert_eq!(s.handle_message("i"), Dispatch::Reply("a".into()));
    assert_eq!(s.handle_message("I"), Dispatch::Reply("bc".into()));
    assert_eq!(s.handle_message("I"), Dispatch::Reply(String::new()));
    assert!(s.queue().is_empty());
}

#[test]
fn test_session_events_stay_queued_while_idle() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(press_all(&mut s, "ls\r"), None);
    assert_eq!(s.queue().len(), 3);
    assert_eq!(s.renderer().prompt(), "");
}

#[test]
fn test_session_readline_consumes_already_queued_line() {
    let mut s = Session::new(Transcript::new());
    press_all(&mut s, "ls\rpwd");
    assert_eq!(s.handle_message("r"), Dispatch::Reply("ls".into()));
    assert_eq!(s.renderer().page(), "ls\n");
    assert_eq!(s.handle_message("I"), Dispatch::Reply("pwd".into()));
    assert!(s.queue().is_empty());
}

#[test]
fn test_session_readline_waits_then_completes_on_input() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(s.handle_message("r"), Dispatch::NoReply);
    assert_eq!(s.editor().state(), EditorState::Reading);

    assert_eq!(press_all(&mut s, "1 <"), None);
    assert_eq!(s.renderer().prompt(), "1 &lt;");

    assert_eq!(s.push_event(InputEvent::press('\r')), Some("1 <".into()));
    assert_eq!(s.editor().state(), EditorState::Idle);
    assert_eq!(s.renderer().page(), "1 &lt;\n");
    assert_eq!(s.renderer().prompt(), "");
}

#[test]
fn test_session_backspace_down_edits_line() {
    let mut s = Session::new(Transcript::new());
    s.handle_message("r");
    press_all(&mut s, "abc");
    s.push_event(InputEvent::down(BACKSPACE).unwrap());
    assert_eq!(s.editor().buffer(), "ab");
    assert_eq!(s.renderer().prompt(), "ab");
}

#[test]
fn test_session_paste_completes_line() {
    let mut s = Session::new(Transcript::new());
    s.handle_message("r");
    assert_eq!(s.push_paste("first\nsecond"), Some("first".into()));
    assert_eq!(s.handle_message("I"), Dispatch::Reply("second".into()));
    assert!(s.queue().is_empty());
}

#[test]
fn test_session_cancel_read_line_replies_empty() {
    let mut s = Session::new(Transcript::new());
    s.handle_message("r");
    press_all(&mut s, "part");
    assert_eq!(s.cancel_read_line(), Some(String::new()));
    assert_eq!(s.editor().state(), EditorState::Idle);
    assert_eq!(s.cancel_read_line(), None);
}

#[test]
fn test_session_unknown_prefix_one_error_line_no_reply() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(s.handle_message("z"), Dispatch::NoReply);
    let fragments: Vec<&str> = s.renderer().fragments().collect();
    assert_eq!(fragments, vec!["ERROR - Unknown message prefix &quot;z&quot;\n"]);
}

#[test]
fn test_session_http_defers_to_network() {
    let mut s = Session::new(Transcript::new());
    match s.handle_message("hGET|http://x|a|1") {
        Dispatch::Network(req) => {
            assert_eq!(req.method, "GET");
            assert_eq!(req.value("a"), Some("1"));
        }
        other => panic!("Expected Network, got {:?}", other),
    }
}

#[test]
fn test_session_script_runs_registered_operation() {
    let mut s = Session::new(Transcript::new());
    s.handle_message("oline");
    assert_eq!(s.handle_message("jclear"), Dispatch::NoReply);
    assert_eq!(s.renderer().page(), "");
}

#[test]
fn test_session_script_unknown_renders_error() {
    let mut s = Session::new(Transcript::new());
    assert_eq!(s.handle_message("jwindow.close()"), Dispatch::NoReply);
    assert!(s.renderer().page().starts_with("ERROR - unknown script operation"));
}

#[test]
fn test_sessions_are_independent() {
    let mut a = Session::new(Transcript::new());
    let mut b = Session::new(Transcript::new());
    press_all(&mut a, "x");
    assert_ne!(a.id(), b.id());
    assert_eq!(b.handle_message("I"), Dispatch::Reply(String::new()));
    assert_eq!(a.handle_message("I"), Dispatch::Reply("x".into()));
}
