//! Unit tests for the section classifier.

use rstest::{fixture, rstest};

use super::*;
use crate::tests::support::ScriptedChannel;

fn section(start: u64, size: u64, permissions: &str) -> Section {
    Section {
        start,
        size,
        permissions: permissions.to_owned(),
        name: None,
    }
}

#[fixture]
fn overlapping() -> SectionClassifier {
    SectionClassifier::from_sections(vec![section(0x0, 0x10, "r-x"), section(0x8, 0x4, "rw-")])
}

#[rstest]
#[case(0x0, AddressKind::Instruction)]
#[case(0x9, AddressKind::Instruction)]
#[case(0xf, AddressKind::Instruction)]
#[case(0x10, AddressKind::Unknown)]
#[case(0x20, AddressKind::Unknown)]
fn first_match_wins(
    overlapping: SectionClassifier,
    #[case] address: u64,
    #[case] expected: AddressKind,
) {
    assert_eq!(overlapping.classify(address), expected);
}

#[rstest]
fn non_executable_is_memory() {
    let classifier = SectionClassifier::from_sections(vec![section(0x2000, 0x100, "rw-")]);
    assert_eq!(classifier.classify(0x2010), AddressKind::Memory);
    assert_eq!(classifier.classify(0x2010).to_string(), "memory");
}

#[rstest]
fn range_end_does_not_overflow() {
    let classifier = SectionClassifier::from_sections(vec![section(u64::MAX - 1, 0x10, "r-x")]);
    assert_eq!(classifier.classify(u64::MAX), AddressKind::Instruction);
    assert_eq!(classifier.classify(0), AddressKind::Unknown);
}

#[rstest]
fn empty_sections_contain_nothing() {
    let classifier = SectionClassifier::from_sections(vec![section(0x10, 0, "r-x")]);
    assert_eq!(classifier.classify(0x10), AddressKind::Unknown);
}

#[rstest]
fn reload_prefers_virtual_fields() {
    let channel = ScriptedChannel::new().reply(
        SECTION_LISTING_COMMAND,
        r#"[{"name":".text","size":16,"vsize":32,"paddr":1024,"vaddr":4096,"perm":"-r-x"},
            {"name":".data","size":8,"addr":8192,"flags":"-rw-"}]"#,
    );
    let executor = CommandExecutor::new(channel);
    let mut classifier = SectionClassifier::default();

    classifier.reload(&executor).expect("reload");

    let sections = classifier.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].start, 4096);
    assert_eq!(sections[0].size, 32);
    assert_eq!(sections[0].name.as_deref(), Some(".text"));
    assert_eq!(sections[1].permissions, "-rw-");
    assert_eq!(classifier.classify(4096 + 20), AddressKind::Instruction);
    assert_eq!(classifier.classify(8192), AddressKind::Memory);
}

#[rstest]
fn reload_accepts_wrapped_listing() {
    let sections = parse_sections(r#"{"sections":[{"addr":0,"size":4,"perm":"r--"}]}"#)
        .expect("parse");
    assert_eq!(sections, vec![section(0, 4, "r--")]);
}

#[rstest]
fn missing_start_is_a_shape_error() {
    let error = parse_sections(r#"[{"size":4,"perm":"r--"}]"#).expect_err("should fail");
    assert!(matches!(error, DecodeError::Shape { .. }));
}

#[rstest]
fn failed_reload_keeps_previous_table(overlapping: SectionClassifier) {
    let mut classifier = overlapping;
    let executor =
        CommandExecutor::new(ScriptedChannel::new().reply(SECTION_LISTING_COMMAND, "[{"));

    let error = classifier.reload(&executor).expect_err("should fail");

    assert!(matches!(error, SessionError::Decode(_)));
    assert_eq!(classifier.sections().len(), 2);
}
