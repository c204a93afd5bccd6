//! Unit tests for settings snapshots and display settings.

use rstest::rstest;

use super::*;
use crate::tests::support::ScriptedChannel;

const DUMP: &str = "\
anal.arch = x86
asm.arch = x86
asm.bits = 64
asm.comment = a comment with spaces
asm.bytes = false
scr.color = 3
asm.pseudo = true
";

#[rstest]
fn parse_keeps_prefixed_three_field_lines() {
    let snapshot = SettingsSnapshot::parse(DUMP, "asm.");
    let captured: Vec<(&str, &str)> = snapshot.iter().collect();
    assert_eq!(
        captured,
        vec![
            ("asm.arch", "x86"),
            ("asm.bits", "64"),
            ("asm.bytes", "false"),
            ("asm.pseudo", "true"),
        ]
    );
    assert_eq!(snapshot.prefix(), "asm.");
    assert_eq!(snapshot.get("asm.bits"), Some("64"));
    assert_eq!(snapshot.get("scr.color"), None);
}

#[rstest]
#[case("asm.arch x86")]
#[case("asm.arch : x86")]
#[case("")]
fn parse_skips_other_layouts(#[case] line: &str) {
    assert!(SettingsSnapshot::parse(line, "asm.").is_empty());
}

#[rstest]
fn capture_then_restore_replays_in_order() {
    let channel = ScriptedChannel::new().reply(SETTINGS_DUMP_COMMAND, DUMP);
    let handle = channel.clone();
    let executor = CommandExecutor::new(channel);

    let snapshot = SettingsSnapshot::capture(&executor, "asm.").expect("capture");
    snapshot.restore(&executor).expect("restore");

    assert_eq!(
        handle.sent(),
        vec![
            "e",
            "e asm.arch=x86",
            "e asm.bits=64",
            "e asm.bytes=false",
            "e asm.pseudo=true",
        ]
    );
}

#[rstest]
fn empty_snapshot_restores_nothing() {
    let channel = ScriptedChannel::new().reply(SETTINGS_DUMP_COMMAND, DUMP);
    let handle = channel.clone();
    let executor = CommandExecutor::new(channel);

    let snapshot = SettingsSnapshot::capture(&executor, "nope.").expect("capture");
    assert!(snapshot.is_empty());
    snapshot.restore(&executor).expect("restore");

    assert_eq!(handle.sent(), vec!["e"]);
}

#[rstest]
fn failed_assignment_aborts_restore() {
    let channel = ScriptedChannel::new().fail("e asm.bits=64");
    let handle = channel.clone();
    let executor = CommandExecutor::new(channel);
    let snapshot = SettingsSnapshot::parse(DUMP, "asm.");

    let error = snapshot.restore(&executor).expect_err("should fail");

    assert!(matches!(
        error,
        SessionError::BatchAborted { failed_index: 1, .. }
    ));
    assert_eq!(handle.sent(), vec!["e asm.arch=x86", "e asm.bits=64"]);
}

#[rstest]
fn display_settings_parse_booleans() {
    let replies = [
        "arm", "32", "true", "false", "true", "garbage", "", "false", "true",
    ];
    let settings = DisplaySettings::from_replies(&replies);

    assert_eq!(settings.arch.as_deref(), Some("arm"));
    assert_eq!(settings.bits, Some(32));
    assert_eq!(settings.bytes, Some(true));
    assert_eq!(settings.flags, Some(false));
    assert_eq!(settings.lines, None);
    assert_eq!(settings.xrefs, None);
    assert_eq!(settings.pseudo, Some(true));
}

#[rstest]
fn display_settings_query_every_key() {
    let channel = ScriptedChannel::new()
        .reply("e asm.arch", "x86\n")
        .reply("e asm.bits", "64\n")
        .reply("e asm.offset", "true\n");
    let handle = channel.clone();
    let executor = CommandExecutor::new(channel);

    let settings = DisplaySettings::load(&executor).expect("load");

    let expected: Vec<String> = DISPLAY_SETTING_KEYS
        .iter()
        .map(|key| format!("e {key}"))
        .collect();
    assert_eq!(handle.sent(), expected);
    assert_eq!(settings.arch.as_deref(), Some("x86"));
    assert_eq!(settings.bits, Some(64));
    assert_eq!(settings.offset, Some(true));
    assert_eq!(settings.bytes, None);
}
