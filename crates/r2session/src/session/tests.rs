//! Unit tests for the session facade.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::catalog::CategoryRegistry;
use crate::format::FormatDescriptor;
use crate::tests::support::ScriptedChannel;

const DUMP: &str = "asm.arch = x86\nasm.bits = 64\nscr.utf8 = true\n";

#[fixture]
fn channel() -> ScriptedChannel {
    ScriptedChannel::new()
}

fn session_over(channel: &ScriptedChannel) -> Session {
    Session::with_channel(channel.clone())
}

#[rstest]
fn nested_snapshots_are_rejected(channel: ScriptedChannel) {
    let scripted = channel.reply("e", DUMP);
    let mut session = session_over(&scripted);

    session.store_settings("asm.").expect("first capture");
    let error = session.store_settings("asm.").expect_err("nested capture");

    assert!(matches!(error, SessionError::SnapshotPending));
    assert_eq!(scripted.sent(), vec!["e"]);
}

#[rstest]
fn restore_releases_the_snapshot(channel: ScriptedChannel) {
    let scripted = channel.reply("e", DUMP);
    let mut session = session_over(&scripted);

    session.store_default_settings().expect("capture");
    assert!(session.has_pending_settings());
    session.restore_settings().expect("restore");
    assert!(!session.has_pending_settings());
    session.restore_settings().expect("second restore is a no-op");

    assert_eq!(
        scripted.sent(),
        vec!["e", "e asm.arch=x86", "e asm.bits=64"]
    );
}

#[rstest]
fn configured_prefix_drives_default_capture(channel: ScriptedChannel) {
    let scripted = channel.reply("e", DUMP);
    let mut session = session_over(&scripted).with_settings_prefix("scr.");

    let snapshot = session.store_default_settings().expect("capture");

    assert_eq!(snapshot.get("scr.utf8"), Some("true"));
    assert_eq!(snapshot.len(), 1);
}

#[rstest]
fn flag_lookup_canonicalises_input(channel: ScriptedChannel) {
    let scripted = channel.reply(
        "fs *;fj",
        r#"[{"name":"sym.main","offset":255,"size":4}]"#,
    );
    let mut session = session_over(&scripted);

    session.rebuild_flags().expect("rebuild");

    assert_eq!(session.flag_names_at("0x00FF").expect("valid"), vec!["sym.main"]);
    assert_eq!(
        session.flag_address("sym.main").map(|addr| addr.to_string()),
        Some(String::from("0xff"))
    );
    assert!(matches!(
        session.flag_names_at("main"),
        Err(SessionError::InvalidAddress(_))
    ));
}

#[rstest]
fn flag_space_helpers(channel: ScriptedChannel) {
    let scripted = channel.reply("fj", r#"[{"name":"str.hello","offset":8192,"size":6}]"#);
    let session = session_over(&scripted);

    session.set_flag_space("strings").expect("select");
    let flags = session.list_flags().expect("list");

    assert_eq!(flags[0].name, "str.hello");
    assert_eq!(flags[0].size, 6);
    assert!(session.flags().is_empty());
    assert_eq!(scripted.sent(), vec!["fs strings", "fj"]);
}

#[rstest]
fn sections_and_plugins_refresh_through_session(channel: ScriptedChannel) {
    let scripted = channel
        .reply("iSj", r#"[{"vaddr":4096,"vsize":16,"perm":"-r-x"}]"#)
        .reply("Lh", "md5\nsha1\n");
    let mut session = session_over(&scripted);

    session.reload_sections().expect("reload");
    session.refresh_plugins("hash").expect("refresh");

    assert_eq!(session.classify(4100), AddressKind::Instruction);
    assert_eq!(session.plugins("hash")[1].text("name"), Some("sha1"));
}

#[rstest]
fn custom_catalog_serves_its_categories(channel: ScriptedChannel) {
    let registry = CategoryRegistry::builder()
        .register("cmd", FormatDescriptor::positional("L.", "name"))
        .build();
    let scripted = channel.reply("L.", "r2ghidra
");
    let mut session =
        session_over(&scripted).with_catalog(PluginCatalog::new(Arc::new(registry)));

    session.refresh_plugins("cmd").expect("refresh");

    assert_eq!(session.plugins("cmd")[0].text("name"), Some("r2ghidra"));
    assert!(matches!(
        session.refresh_plugins("egg"),
        Err(SessionError::UnknownCategory { .. })
    ));
    assert!(session.catalog().is_loaded("cmd"));
}

#[rstest]
fn config_helpers_build_assignments(channel: ScriptedChannel) {
    let scripted = channel.reply("e asm.bits", "64\n");
    let session = session_over(&scripted);

    assert_eq!(session.config_get("asm.bits").expect("get"), "64");
    session.config_set("asm.bits", "32").expect("set");
    session.disable_utf8().expect("utf8");

    assert_eq!(
        scripted.sent(),
        vec!["e asm.bits", "e asm.bits=32", "e scr.utf8=false"]
    );
}

#[rstest]
#[case(None, "\"pa nop\"")]
#[case(Some(0x1000), "\"pa nop\"@0x1000")]
fn assemble_quotes_the_opcode(
    channel: ScriptedChannel,
    #[case] offset: Option<u64>,
    #[case] expected: &str,
) {
    let scripted = channel.reply(expected, "90\n");
    let session = session_over(&scripted);

    assert_eq!(session.assemble("nop", offset).expect("assemble"), "90");
}

#[rstest]
fn printing_commands_address_offsets_in_hex(channel: ScriptedChannel) {
    let session = session_over(&channel);

    session.hexdump(0x400, 64).expect("px");
    session.disassembly_text(0x400, 8).expect("pD");
    session.disassemble_bytes("9090", Some(0x10)).expect("pad");
    session.analyze_all().expect("aa");

    assert_eq!(
        channel.sent(),
        vec!["px 64@0x400", "pD 8@0x400", "pad 9090@0x10", "aa"]
    );
}

#[rstest]
fn disassembly_around_concatenates_both_listings(channel: ScriptedChannel) {
    let scripted = channel
        .reply("pdj -2@0x100", r#"[{"offset":250},{"offset":252}]"#)
        .reply("pdj 1@0x100", r#"[{"offset":256}]"#);
    let session = session_over(&scripted);

    let instructions = session.disassembly_around(0x100, 2, 1).expect("around");

    let offsets: Vec<&Value> = instructions.iter().map(|op| &op["offset"]).collect();
    assert_eq!(offsets, vec![&json!(250), &json!(252), &json!(256)]);
}

#[rstest]
fn json_helpers_decode_replies(channel: ScriptedChannel) {
    let scripted = channel
        .reply("aoj 1 @ 0x100", r#"[{"mnemonic":"nop","size":1}]"#)
        .reply("pcj @0x100!3", "[144,144,195]\n")
        .reply("ij", r#"{"core":{"file":"/bin/ls"}}"#)
        .reply("isj", "")
        .reply("b", "0x100\n");
    let session = session_over(&scripted);

    let op = session.analyze_op(0x100).expect("aoj").expect("one op");
    assert_eq!(op["mnemonic"], json!("nop"));
    assert_eq!(session.bytes(0x100, 3).expect("pcj"), vec![0x90, 0x90, 0xc3]);
    assert_eq!(session.bin_info().expect("ij")["core"]["file"], json!("/bin/ls"));
    assert!(session.bin_symbols().expect("isj").is_empty());
    assert!(session.alive().expect("b"));
}

#[rstest]
fn channel_failures_surface_with_the_command(channel: ScriptedChannel) {
    let scripted = channel.fail("irj");
    let session = session_over(&scripted);

    let error = session.bin_relocs().expect_err("should fail");

    assert!(matches!(
        error,
        SessionError::Channel { ref command, .. } if command == "irj"
    ));
}

#[rstest]
fn open_reports_missing_engine() {
    let config = Config {
        engine_binary: Some("r2session-test-missing-engine".into()),
        ..Config::default()
    };

    let error = Session::open(&config, Path::new("/bin/true")).expect_err("should fail");

    assert!(matches!(error, SessionError::Open { .. }));
}
