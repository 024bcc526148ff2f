// End-to-end decoding with real DBC files on disk
use can_batch_decoder::{Converter, ConverterConfig, DecoderError, PayloadOverflow, SignalValue};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const HEADER: &str = r#"
VERSION ""

NS_ :
    NS_DESC_
    CM_
    BA_DEF_
    BA_
    VAL_

BS_:

BU_: ECU1 ECU2
"#;

fn dbc(messages: &str) -> String {
    format!("{}\n{}", HEADER, messages)
}

fn powertrain() -> String {
    dbc(r#"
BO_ 100 EngineStatus: 8 ECU1
 SG_ RPM : 16|16@1+ (0.25,0) [0|16383.75] "rpm" ECU2
 SG_ Running : 0|1@1+ (1,0) [0|1] "" ECU2
 SG_ Gear : 8|4@1+ (1,0) [0|15] "" ECU2

BO_ 200 Brakes: 8 ECU1
 SG_ Pressure : 7|16@0+ (1,0) [0|65535] "kPa" ECU2
"#)
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn names(signals: &can_batch_decoder::DecodedSignals) -> BTreeSet<&str> {
    signals.keys().map(String::as_str).collect()
}

#[test]
fn decodes_signals_from_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());

    let converter = Converter::new(&path).unwrap();
    let stats = converter.database_stats();
    assert_eq!(stats.num_messages, 2);
    assert_eq!(stats.num_signals, 4);

    let signals = converter
        .decode(br#"{"frames":[{"id":100,"data":"01030a00"}]}"#)
        .unwrap();

    assert_eq!(names(&signals), BTreeSet::from(["Gear", "RPM", "Running"]));
    assert_eq!(signals["RPM"], SignalValue::Float(2.5));
    assert_eq!(signals["Running"], SignalValue::Boolean(true));
    assert_eq!(signals["Gear"], SignalValue::Integer(3));
}

#[test]
fn decodes_motorola_signal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());

    let converter = Converter::new(&path).unwrap();
    let signals = converter.decode(br#"{"frames":[{"id":200,"data":"1234"}]}"#).unwrap();

    assert_eq!(signals["Pressure"], SignalValue::Integer(0x1234));
}

#[test]
fn first_source_wins_across_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a_powertrain.dbc"), &powertrain());
    write(
        &dir.path().join("b_override.DBC"),
        &dbc(r#"
BO_ 100 Replacement: 8 ECU1
 SG_ Other : 0|8@1+ (1,0) [0|255] "" ECU2

BO_ 300 Extra: 8 ECU1
 SG_ ExtraValue : 0|8@1+ (1,0) [0|255] "" ECU2
"#),
    );
    write(&dir.path().join("readme.txt"), "not a dbc");

    let converter = Converter::new(dir.path()).unwrap();
    assert_eq!(converter.table().can_ids(), vec![100, 200, 300]);
    assert_eq!(converter.table().get(100).unwrap().name, "EngineStatus");

    let signals = converter
        .decode(br#"{"frames":[{"id":100,"data":"00000a00"},{"id":300,"data":"2a"}]}"#)
        .unwrap();
    assert!(!signals.contains_key("Other"));
    assert_eq!(signals["RPM"], SignalValue::Float(2.5));
    assert_eq!(signals["ExtraValue"], SignalValue::Integer(42));
}

#[test]
fn nested_directories_are_scanned() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("vehicle").join("body").join("powertrain.dbc"), &powertrain());

    let converter = Converter::new(dir.path()).unwrap();
    assert_eq!(converter.table().len(), 2);
}

#[test]
fn directory_named_like_dbc_file_is_recursed() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("legacy.dbc").join("powertrain.dbc"), &powertrain());

    let converter = Converter::new(dir.path()).unwrap();
    assert_eq!(converter.table().can_ids(), vec![100, 200]);
}

#[test]
fn extended_id_matches_frame_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("body.dbc");
    // 2147483940 = 0x80000124, the DBC flag for an extended frame with ID 0x124
    write(
        &path,
        &dbc(r#"
BO_ 2147483940 DoorStatus: 8 ECU1
 SG_ DoorOpen : 0|1@1+ (1,0) [0|1] "" ECU2
 SG_ WindowPos : 8|8@1+ (0.5,0) [0|127.5] "%" ECU2
"#),
    );

    let converter = Converter::new(&path).unwrap();
    assert_eq!(converter.table().can_ids(), vec![0x124]);

    let signals = converter
        .decode(br#"{"frames":[{"id":292,"data":"0114"}]}"#)
        .unwrap();
    assert_eq!(signals["DoorOpen"], SignalValue::Boolean(true));
    assert_eq!(signals["WindowPos"], SignalValue::Float(10.0));

    let flagged = converter
        .decode(br#"{"frames":[{"id":2147483940,"data":"0114"}]}"#)
        .unwrap();
    assert!(flagged.is_empty());
}

#[test]
fn broken_source_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a.dbc"), &powertrain());
    write(&dir.path().join("b.dbc"), "BO_ this is not valid");

    let err = Converter::new(dir.path()).err().unwrap();
    assert!(err.is_configuration_error());
}

#[test]
fn missing_path_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let err = Converter::new(&dir.path().join("nope")).err().unwrap();
    assert!(matches!(err, DecoderError::SourceRead { .. }));
}

#[test]
fn unknown_frame_does_not_fail_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());
    let converter = Converter::new(&path).unwrap();

    let signals = converter
        .decode(br#"{"frames":[{"id":999,"data":"ffff"},{"id":200,"data":"0001"}]}"#)
        .unwrap();
    assert_eq!(names(&signals), BTreeSet::from(["Pressure"]));
}

#[test]
fn schema_errors_reference_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());
    let converter = Converter::new(&path).unwrap();

    assert!(converter.decode(br#"{"frames":[]}"#).unwrap_err().is_schema_error());

    let input = br#"{"frames":[{"id":100,"data":"0a0"}]}"#;
    match converter.decode(input).unwrap_err() {
        DecoderError::InvalidBatch { payload, reason } => {
            assert_eq!(payload.as_bytes(), input);
            assert!(reason.starts_with("frame 0 data"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn oversized_payload_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());
    let input = br#"{"frames":[{"id":100,"data":"00000a0000000000ffff"}]}"#;

    let truncating = Converter::new(&path).unwrap();
    assert_eq!(truncating.decode(input).unwrap()["RPM"], SignalValue::Float(2.5));

    let config = ConverterConfig::new().with_payload_overflow(PayloadOverflow::Reject);
    let rejecting = Converter::with_config(&path, config).unwrap();
    assert!(rejecting.decode(input).unwrap_err().is_schema_error());
}

#[test]
fn encode_is_not_supported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());
    let converter = Converter::new(&path).unwrap();

    let signals = converter.decode(br#"{"frames":[{"id":100,"data":"00"}]}"#).unwrap();
    let err = converter.encode(&signals).unwrap_err();
    assert!(matches!(err, DecoderError::NotImplemented(_)));
    assert!(!err.is_schema_error());
}

#[test]
fn concurrent_decodes_share_one_converter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powertrain.dbc");
    write(&path, &powertrain());
    let converter = Converter::new(&path).unwrap();

    let expected = converter
        .decode(br#"{"frames":[{"id":100,"data":"01030a00"}]}"#)
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..100 {
                    let signals = converter
                        .decode(br#"{"frames":[{"id":100,"data":"01030a00"}]}"#)
                        .unwrap();
                    assert_eq!(signals, expected);
                }
            });
        }
    });
}
