mod common;

use std::collections::HashMap;

use rstest::rstest;
use typeconv_api::Record;
use typeconv_engine::{ErrorCategory, Options};

use common::{counting_engine, ExternalDate, InternalDate};

#[derive(Record, Default)]
pub struct Src {
    #[tag(json = "date")]
    pub date: InternalDate,
}

#[derive(Record, Default)]
pub struct Dst {
    #[tag(json = "date")]
    pub date: ExternalDate,
}

#[test]
fn records_without_overlap_round_trip_through_codec() {
    let (engine, codec) = counting_engine();
    let src = Src {
        date: InternalDate { y: 2025, m: 9, d: 3 },
    };
    let mut dst = Dst::default();
    engine.convert(&src, &mut dst, vec![]).unwrap();
    assert_eq!(dst.date.raw, "2025-09-03");
    assert_eq!(codec.encodes(), 1);
}

#[test]
fn zero_source_skips_the_codec() {
    let (engine, codec) = counting_engine();
    let mut dst = Dst {
        date: ExternalDate { raw: "stale".into() },
    };
    engine.convert(&Src::default(), &mut dst, vec![]).unwrap();
    assert_eq!(dst.date.raw, "");
    assert_eq!(codec.encodes(), 0);
}

#[derive(Record, Default)]
pub struct WrapSrc {
    #[tag(json = "x")]
    pub x: Src,
}

#[derive(Record, Default)]
pub struct WrapDst {
    #[tag(json = "x")]
    pub x: Dst,
}

#[test]
fn fallback_below_nested_record() {
    let (engine, codec) = counting_engine();
    let src = WrapSrc {
        x: Src {
            date: InternalDate { y: 2024, m: 12, d: 31 },
        },
    };
    let mut dst = WrapDst::default();
    engine.convert(&src, &mut dst, vec![]).unwrap();
    assert_eq!(dst.x.date.raw, "2024-12-31");
    assert_eq!(codec.encodes(), 1);
}

#[derive(Record, Default)]
pub struct Narrow {
    #[tag(json = "n")]
    pub n: i32,
}

#[derive(Record, Default)]
pub struct Wide {
    #[tag(json = "n")]
    pub n: i64,
}

#[rstest]
#[case::primitive(false, 0)]
#[case::strict(true, 1)]
fn strict_mode_routes_numbers_through_codec(#[case] strict: bool, #[case] encodes: usize) {
    let (engine, codec) = counting_engine();
    let plan = engine
        .build_plan::<Narrow, Wide>(&Options::default().strict(strict))
        .unwrap();
    let mut dst = Wide::default();
    plan.convert(&mut dst, &Narrow { n: 7 }).unwrap();
    assert_eq!(dst.n, 7);
    assert_eq!(codec.encodes(), encodes);
}

#[derive(Record, Default)]
pub struct Float {
    #[tag(json = "n")]
    pub n: f64,
}

#[rstest]
#[case(7.0, Ok(7))]
#[case(7.9, Err(ErrorCategory::LeafConversion))]
fn strict_float_to_int(#[case] input: f64, #[case] expected: Result<i64, ErrorCategory>) {
    let (engine, _) = counting_engine();
    let plan = engine
        .build_plan::<Float, Wide>(&Options::default().strict(true))
        .unwrap();
    let mut dst = Wide::default();
    let got = plan.convert(&mut dst, &Float { n: input }).map(|()| dst.n);
    assert_eq!(got.map_err(|e| e.kind()), expected);
}

#[test]
fn non_strict_float_to_int_truncates() {
    let (engine, codec) = counting_engine();
    let mut dst = Wide::default();
    engine.convert(&Float { n: 7.9 }, &mut dst, vec![]).unwrap();
    assert_eq!(dst.n, 7);
    assert_eq!(codec.encodes(), 0);
}

#[derive(Record, Default)]
pub struct Label {
    #[tag(json = "v")]
    pub v: String,
}

#[derive(Record, Default)]
pub struct Count {
    #[tag(json = "v")]
    pub v: u32,
}

#[test]
fn string_to_number_is_not_a_primitive_conversion() {
    let (engine, codec) = counting_engine();
    let mut dst = Count::default();
    let err = engine
        .convert(&Label { v: "12".into() }, &mut dst, vec![])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorCategory::LeafConversion);
    assert_eq!(codec.encodes(), 1);
}

#[derive(Record, Default)]
pub struct PtrNarrow {
    #[tag(json = "n")]
    pub n: Option<i32>,
}

#[test]
fn nil_pointer_into_value_is_zero_without_codec() {
    let (engine, codec) = counting_engine();
    let mut dst = Wide { n: 5 };
    engine
        .build_plan::<PtrNarrow, Wide>(&Options::default())
        .unwrap()
        .convert(&mut dst, &PtrNarrow { n: None })
        .unwrap();
    assert_eq!(dst.n, 0);

    engine
        .convert(&PtrNarrow { n: Some(12) }, &mut dst, vec![])
        .unwrap();
    assert_eq!(dst.n, 12);
    assert_eq!(codec.encodes(), 1);
}

#[test]
fn options_from_toml_drive_the_plan() {
    let options = Options::parse("strict_types = true\n").unwrap();
    assert_eq!(options.tag, "json");

    let (engine, codec) = counting_engine();
    let plan = engine.build_plan::<Narrow, Wide>(&options).unwrap();
    assert!(plan.options().strict_types);
    let mut dst = Wide::default();
    plan.convert(&mut dst, &Narrow { n: -3 }).unwrap();
    assert_eq!(dst.n, -3);
    assert_eq!(codec.encodes(), 1);
}

#[derive(Record, Debug, Default, PartialEq)]
pub struct Tallies {
    #[tag(json = "by_id")]
    pub by_id: HashMap<i32, i32>,
    #[tag(json = "by_name")]
    pub by_name: HashMap<String, i32>,
    #[tag(json = "list")]
    pub list: Vec<i32>,
}

#[derive(Record, Debug, Default, PartialEq)]
pub struct WideTallies {
    #[tag(json = "by_id")]
    pub by_id: HashMap<i64, i64>,
    #[tag(json = "by_name")]
    pub by_name: HashMap<String, i64>,
    #[tag(json = "list")]
    pub list: Vec<i64>,
}

#[test]
fn empty_collections_clear_destination_on_every_path() {
    let (engine, codec) = counting_engine();
    let mut dst = WideTallies {
        by_id: HashMap::from([(1, 1)]),
        by_name: HashMap::from([("k".to_string(), 1)]),
        list: vec![4],
    };
    engine.convert(&Tallies::default(), &mut dst, vec![]).unwrap();
    assert_eq!(dst, WideTallies::default());
    // The int-keyed map would use the codec; empty is zero, so it does not.
    assert_eq!(codec.encodes(), 0);
}

#[test]
fn int_keyed_map_goes_through_codec() {
    let (engine, codec) = counting_engine();
    let src = Tallies {
        by_id: HashMap::from([(1, 10), (-2, 20)]),
        by_name: HashMap::from([("k".to_string(), 3)]),
        list: vec![5, 6],
    };
    let mut dst = WideTallies::default();
    engine.convert(&src, &mut dst, vec![]).unwrap();
    assert_eq!(dst.by_id, HashMap::from([(1, 10), (-2, 20)]));
    assert_eq!(dst.by_name, HashMap::from([("k".to_string(), 3)]));
    assert_eq!(dst.list, vec![5, 6]);
    assert_eq!(codec.encodes(), 1);
}

#[derive(Record, Default)]
pub struct Text {
    #[tag(json = "body")]
    pub body: String,
}

#[derive(Record, Default)]
pub struct Bytes {
    #[tag(json = "body")]
    pub body: Vec<u8>,
}

#[test]
fn string_and_bytes_convert_directly() {
    let (engine, codec) = counting_engine();
    let mut bytes = Bytes::default();
    engine
        .convert(&Text { body: "héllo".into() }, &mut bytes, vec![])
        .unwrap();
    assert_eq!(bytes.body, "héllo".as_bytes());

    let mut text = Text { body: "stale".into() };
    engine.convert(&bytes, &mut text, vec![]).unwrap();
    assert_eq!(text.body, "héllo");

    engine.convert(&Bytes::default(), &mut text, vec![]).unwrap();
    assert_eq!(text.body, "");
    assert_eq!(codec.encodes(), 0);
}

#[test]
fn invalid_utf8_bytes_are_rejected() {
    let mut text = Text::default();
    let err = typeconv_engine::convert(&Bytes { body: vec![0xff, 0xfe] }, &mut text, vec![])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorCategory::Reflection);
    assert!(err.to_string().contains("body"));
}

#[test]
fn strict_mode_sends_string_to_bytes_through_codec() {
    let (engine, codec) = counting_engine();
    let plan = engine
        .build_plan::<Text, Bytes>(&Options::default().strict(true))
        .unwrap();
    let mut dst = Bytes::default();
    let err = plan.convert(&mut dst, &Text { body: "hi".into() }).unwrap_err();
    assert_eq!(err.kind(), ErrorCategory::LeafConversion);
    assert_eq!(codec.encodes(), 1);
}
