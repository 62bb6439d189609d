//! Public API tests: literal wire fixtures, one-shot helpers, encoder
//! options, limits, and configuration loading.

use hex_literal::hex;

use mashpack::varint;
use mashpack::*;

fn ints(values: &[i128]) -> Value {
    Value::Array(values.iter().map(|&i| Value::Int(i)).collect())
}

fn text_map(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

// ── Array fixtures ──────────────────────────────────────────

#[test]
fn empty_array() {
    assert_eq!(pack(&ints(&[])).unwrap(), hex!("80"));
}

#[test]
fn inline_ints_are_individually_tagged() {
    assert_eq!(pack(&ints(&[1])).unwrap(), hex!("81 A1"));
    assert_eq!(pack(&ints(&[1, 2, 3, 4])).unwrap(), hex!("84 A1 A2 A3 A4"));
}

#[test]
fn two_elements_never_compact() {
    assert_eq!(pack(&ints(&[255, 255])).unwrap(), hex!("82 F1 FF F1 FF"));
}

#[test]
fn three_uniform_elements_compact() {
    assert_eq!(pack(&ints(&[255; 3])).unwrap(), hex!("E8 03 F1 FF FF FF"));
}

#[test]
fn sixty_four_uniform_elements_compact() {
    let bytes = pack(&ints(&[255; 64])).unwrap();
    assert_eq!(&bytes[..3], &hex!("E8 40 F1"));
    assert_eq!(bytes.len(), 3 + 64);
    assert!(bytes[3..].iter().all(|&b| b == 0xFF));
    assert_eq!(unpack(&bytes).unwrap(), ints(&[255; 64]));
}

#[test]
fn mixed_widths_stay_generic() {
    assert_eq!(
        pack(&ints(&[0xFF, 0xFFFF, 1])).unwrap(),
        hex!("83 F1 FF F2 FF FF A1")
    );
}

#[test]
fn generic_only_disables_compaction() {
    let config = EncoderConfig {
        use_generic_array_only: true,
        ..Default::default()
    };
    assert_eq!(
        pack_with(&ints(&[255; 3]), config).unwrap(),
        hex!("83 F1 FF F1 FF F1 FF")
    );
}

#[test]
fn large_array_uses_array16() {
    let value = ints(&[7; 300]);
    let bytes = pack(&value).unwrap();
    assert_eq!(&bytes[..3], &hex!("EC 01 2C"));
    assert_eq!(unpack(&bytes).unwrap(), value);
}

// ── Scalar fixtures ─────────────────────────────────────────

#[test]
fn sentinels() {
    assert_eq!(pack(&Value::Nil).unwrap(), hex!("E0"));
    assert_eq!(pack(&Value::Bool(false)).unwrap(), hex!("E1"));
    assert_eq!(pack(&Value::Bool(true)).unwrap(), hex!("E2"));
}

#[test]
fn integer_boundaries() {
    let cases: &[(i128, &[u8])] = &[
        (0, &hex!("A0")),
        (31, &hex!("BF")),
        (32, &hex!("F1 20")),
        (-1, &hex!("C0")),
        (-32, &hex!("DF")),
        (-33, &hex!("F5 DF")),
        (256, &hex!("F2 01 00")),
        (-129, &hex!("F6 FF 7F")),
        (u64::MAX as i128, &hex!("F4 FF FF FF FF FF FF FF FF")),
        (i64::MIN as i128, &hex!("F8 80 00 00 00 00 00 00 00")),
    ];
    for &(i, want) in cases {
        let bytes = pack(&Value::Int(i)).unwrap();
        assert_eq!(bytes, want, "encoding {}", i);
        assert_eq!(unpack(&bytes).unwrap(), Value::Int(i));
    }
}

#[test]
fn integers_outside_64_bits_are_range_errors() {
    for i in [u64::MAX as i128 + 1, i64::MIN as i128 - 1] {
        let err = pack(&Value::Int(i)).unwrap_err();
        assert_eq!(err.code(), ERR_RANGE, "encoding {}", i);
    }
}

#[test]
fn floats() {
    assert_eq!(pack(&Value::F64(1.5)).unwrap(), hex!("E4 3F F8 00 00 00 00 00 00"));
    assert_eq!(pack(&Value::F32(1.5)).unwrap(), hex!("E3 3F C0 00 00"));

    let config = EncoderConfig {
        use_32bit_float: true,
        ..Default::default()
    };
    assert_eq!(pack_with(&Value::F64(1.5), config).unwrap(), hex!("E3 3F C0 00 00"));
}

#[test]
fn text_and_bytes() {
    assert_eq!(pack(&"abc".into()).unwrap(), hex!("43 61 62 63"));
    let long = "z".repeat(64);
    assert_eq!(&pack(&long.as_str().into()).unwrap()[..2], &hex!("EE 40"));
    assert_eq!(pack(&Value::Bytes(vec![1, 2])).unwrap(), hex!("F9 02 01 02"));
    assert_eq!(pack(&Value::Bytes(vec![])).unwrap(), hex!("F9 00"));
}

// ── Maps ─────────────────────────────────────────────────────

#[test]
fn nested_map_fixture() {
    let value = text_map(vec![(
        "a",
        text_map(vec![("b", text_map(vec![("c", text_map(vec![]))]))]),
    )]);
    let bytes = hex!("01 41 61 01 41 62 01 41 63 00");
    assert_eq!(pack(&value).unwrap(), bytes);
    assert_eq!(unpack(&bytes).unwrap(), value);
}

#[test]
fn maps_keep_order_and_duplicates() {
    let value = Value::Map(vec![
        ("z".into(), Value::Int(1)),
        ("a".into(), Value::Int(2)),
        ("z".into(), Value::Int(3)),
    ]);
    let back = unpack(&pack(&value).unwrap()).unwrap();
    assert_eq!(back, value);
    assert_eq!(back.get("z"), Some(&Value::Int(3)));
}

#[test]
fn non_text_keys_round_trip() {
    let value = Value::Map(vec![(Value::Int(1), Value::Nil), (Value::Nil, Value::Bool(true))]);
    assert_eq!(unpack(&pack(&value).unwrap()).unwrap(), value);
}

#[test]
fn accessors_on_decoded_values() {
    let bytes = pack(&Value::Array(vec![
        Value::Nil,
        Value::Bool(true),
        Value::Int(-300),
        Value::Bytes(vec![7, 8]),
    ]))
    .unwrap();
    let back = unpack(&bytes).unwrap();
    let items = back.as_array().unwrap();
    assert!(items[0].is_nil());
    assert_eq!(items[1].as_bool(), Some(true));
    assert_eq!(items[2].as_int(), Some(-300));
    assert_eq!(items[3].as_bytes(), Some(&[7u8, 8][..]));

    // Accessors of the wrong kind come back empty.
    assert!(!items[1].is_nil());
    assert_eq!(items[2].as_bool(), None);
    assert_eq!(items[3].as_int(), None);
    assert_eq!(items[0].as_bytes(), None);
}

// ── Extensions ───────────────────────────────────────────────

#[test]
fn ext_length_classes() {
    let ext = Ext::new(127, vec![0u8; 255]).unwrap();
    let bytes = pack(&ext.clone().into()).unwrap();
    assert_eq!(&bytes[..3], &hex!("FC FF 7F"));
    assert_eq!(bytes.len(), 3 + 255);
    assert_eq!(unpack(&bytes).unwrap(), Value::Ext(ext));

    let ext16 = Ext::new(1, vec![9u8; 256]).unwrap();
    assert_eq!(&pack(&ext16.into()).unwrap()[..4], &hex!("FD 01 00 01"));

    let ext32 = Ext::new(2, vec![9u8; 65536]).unwrap();
    assert_eq!(&pack(&ext32.into()).unwrap()[..6], &hex!("FE 00 01 00 00 02"));
}

#[test]
fn ext_payload_is_handed_back() {
    let Value::Ext(ext) = unpack(&hex!("FC 03 0A 01 02 03")).unwrap() else {
        panic!("expected ext");
    };
    assert_eq!(ext.code(), 10);
    assert_eq!(ext.into_data(), vec![1, 2, 3]);
}

#[test]
fn ext_code_above_127_is_rejected() {
    let err = Ext::new(128, vec![]).unwrap_err();
    assert_eq!(err.code(), ERR_RANGE);
}

// ── One-shot decode errors ──────────────────────────────────

#[test]
fn extra_data_carries_value_and_tail() {
    match unpack(&hex!("A1 A2 A3")).unwrap_err() {
        Error::ExtraData { value, remaining } => {
            assert_eq!(*value, Value::Int(1));
            assert_eq!(remaining, hex!("A2 A3"));
        }
        other => panic!("expected ExtraData, got {:?}", other),
    }
}

#[test]
fn truncated_input_is_insufficient_data() {
    let err = unpack(&hex!("F2 01")).unwrap_err();
    assert!(err.is_insufficient_data());
    assert_eq!(err.code(), ERR_INSUFFICIENT_DATA);
}

#[test]
fn reserved_lead_byte_is_format_error() {
    assert_eq!(unpack(&hex!("FF")).unwrap_err().code(), ERR_FORMAT);
}

// ── Fallback and recursion ──────────────────────────────────

#[derive(Debug)]
struct Point {
    x: i64,
    y: i64,
}

#[test]
fn opaque_without_fallback_is_unserializable() {
    let value = Value::Array(vec![Value::Opaque(Opaque::new(Point { x: 1, y: 2 }))]);
    let err = pack(&value).unwrap_err();
    assert_eq!(err.code(), ERR_UNSERIALIZABLE);
    assert!(err.to_string().contains("Point"), "{}", err);
}

#[test]
fn fallback_substitutes_opaque_values() {
    let mut encoder = Encoder::new().with_fallback(|v| {
        let Value::Opaque(o) = v else {
            return Err(Error::hook("not opaque"));
        };
        let p = o
            .downcast_ref::<Point>()
            .ok_or_else(|| Error::hook("unknown type"))?;
        Ok(ints(&[p.x as i128, p.y as i128]))
    });
    let value = Value::Opaque(Opaque::new(Point { x: 1, y: 2 }));
    assert_eq!(encoder.pack(&value).unwrap(), hex!("82 A1 A2"));
}

#[test]
fn fallback_returning_opaque_is_unserializable() {
    let mut encoder = Encoder::new().with_fallback(|v| Ok(v.clone()));
    let value = Value::Opaque(Opaque::new(Point { x: 0, y: 0 }));
    assert_eq!(encoder.pack(&value).unwrap_err().code(), ERR_UNSERIALIZABLE);
}

#[test]
fn fallback_errors_propagate() {
    let mut encoder = Encoder::new().with_fallback(|_| Err(Error::hook("refused")));
    let value = Value::Opaque(Opaque::new(Point { x: 0, y: 0 }));
    assert_eq!(encoder.pack(&value).unwrap_err().code(), ERR_HOOK);
}

#[test]
fn recursion_limit_counts_nesting() {
    let config = EncoderConfig {
        recursion_limit: 2,
        ..Default::default()
    };
    let two_deep = Value::Array(vec![ints(&[1])]);
    assert!(pack_with(&two_deep, config).is_ok());

    let three_deep = Value::Array(vec![Value::Array(vec![ints(&[1])])]);
    let err = pack_with(&three_deep, config).unwrap_err();
    assert_eq!(err.code(), ERR_LIMIT);
}

fn nested_arrays(levels: usize) -> Value {
    let mut value = Value::Array(vec![]);
    for _ in 1..levels {
        value = Value::Array(vec![value]);
    }
    value
}

#[test]
fn default_nesting_allows_512_levels() {
    let deepest = nested_arrays(512);
    let bytes = pack(&deepest).unwrap();
    assert_eq!(bytes.len(), 512);
    assert_eq!(unpack(&bytes).unwrap(), deepest);

    assert_eq!(pack(&nested_arrays(513)).unwrap_err().code(), ERR_LIMIT);

    let mut too_deep = vec![0x81; 512];
    too_deep.push(0x80);
    assert_eq!(unpack(&too_deep).unwrap_err().code(), ERR_LIMIT);
}

#[test]
fn failed_pack_leaves_no_partial_bytes() {
    let config = EncoderConfig {
        reset_buffer_after_pack: false,
        ..Default::default()
    };
    let mut encoder = Encoder::with_config(config);
    assert!(!encoder.config().reset_buffer_after_pack);
    encoder.pack(&Value::Int(1)).unwrap();
    let bad = Value::Array(vec![Value::Int(2), Value::Int(i128::MAX)]);
    assert!(encoder.pack(&bad).is_err());
    assert_eq!(encoder.bytes(), hex!("A1"));

    encoder.pack(&Value::Nil).unwrap();
    assert_eq!(encoder.bytes(), hex!("A1 E0"));
    encoder.reset();
    assert!(encoder.bytes().is_empty());
}

#[test]
fn streaming_headers() {
    let mut encoder = Encoder::new();
    let mut out = encoder.pack_map_header(1).unwrap();
    out.extend(encoder.pack(&"k".into()).unwrap());
    out.extend(encoder.pack_array_header(2).unwrap());
    out.extend(encoder.pack(&Value::Int(1)).unwrap());
    out.extend(encoder.pack(&Value::Int(2)).unwrap());
    assert_eq!(
        unpack(&out).unwrap(),
        text_map(vec![("k", ints(&[1, 2]))])
    );
    assert_eq!(encoder.pack_array_header(40).unwrap(), hex!("EB 28"));
    assert_eq!(encoder.pack_map_header(70).unwrap(), hex!("E5 46"));
}

// ── Decoder limits ──────────────────────────────────────────

#[test]
fn limits_are_checked_before_payload() {
    let config = DecoderConfig {
        limits: Limits {
            max_str_len: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    // Header only; the payload never arrives.
    let err = unpack_with(&hex!("43"), config).unwrap_err();
    assert_eq!(err.code(), ERR_LIMIT);

    assert_eq!(unpack_with(&hex!("42 61 62"), config).unwrap(), Value::from("ab"));
}

#[test]
fn each_limit_is_independent() {
    let tight = Limits {
        max_str_len: 0,
        max_bin_len: 0,
        max_array_len: 0,
        max_map_len: 0,
        max_ext_len: 0,
    };
    let config = DecoderConfig {
        limits: tight,
        ..Default::default()
    };
    let over: [&[u8]; 6] = [
        &hex!("41 61"),
        &hex!("F9 01 00"),
        &hex!("81 A0"),
        &hex!("E8 03 F1 01 02 03"),
        &hex!("01 A0 A0"),
        &hex!("FC 01 05 00"),
    ];
    for bytes in over {
        assert_eq!(unpack_with(bytes, config).unwrap_err().code(), ERR_LIMIT, "{:02x?}", bytes);
    }
    // Empty containers stay within a zero limit.
    assert_eq!(unpack_with(&hex!("80"), config).unwrap(), ints(&[]));
}

#[test]
fn depth_limit() {
    let config = DecoderConfig {
        max_depth: 2,
        ..Default::default()
    };
    assert!(unpack_with(&hex!("81 81 A1"), config).is_ok());
    assert_eq!(unpack_with(&hex!("81 81 81 A1"), config).unwrap_err().code(), ERR_LIMIT);
}

#[test]
fn hostile_count_does_not_preallocate() {
    // array32 claiming 2^31 - 1 elements, followed by a single element.
    let err = unpack(&hex!("ED 7F FF FF FF A1")).unwrap_err();
    assert!(err.is_insufficient_data());
}

// ── Stream adapters ─────────────────────────────────────────

#[test]
fn pack_into_and_unpack_from() {
    let value = text_map(vec![("n", Value::Int(300)), ("s", "hi".into())]);
    let mut sink = Vec::new();
    pack_into(&value, &mut sink).unwrap();
    assert_eq!(unpack_from(sink.as_slice()).unwrap(), value);
}

// ── Varints ─────────────────────────────────────────────────

#[test]
fn varint_fixtures() {
    assert_eq!(varint::encode(5, 0, 0).unwrap(), hex!("85"));
    assert_eq!(varint::encode(200, 0, 0).unwrap(), hex!("48 81"));
    assert_eq!(varint::encode(3, 3, 0xA0).unwrap(), hex!("B3"));
    assert_eq!(varint::decode(&hex!("48 81"), 0).unwrap(), (200, 2));
    assert_eq!(varint::decode(&hex!("B3 FF"), 3).unwrap(), (3, 1));
}

#[test]
fn varint_layout_table() {
    let decodes: &[(&[u8], u8, u64)] = &[
        (&hex!("FF"), 0, 127),
        (&hex!("81"), 0, 1),
        (&hex!("01 00 80"), 0, 1),
        (&hex!("F8"), 4, 0),
        (&hex!("F8"), 3, 8),
    ];
    for &(bytes, p, want) in decodes {
        assert_eq!(varint::decode(bytes, p).unwrap(), (want, bytes.len()), "{:02x?} p={}", bytes, p);
    }

    let encodes: &[(u64, u8, u8, &[u8])] = &[
        (1, 3, 0x80, &hex!("91")),
        (0xFF, 0, 0, &hex!("7F 81")),
        (1 << 14, 0, 0, &hex!("00 00 81")),
        (1 << 7, 1, 0x80, &hex!("80 82")),
        (1 << 49, 0, 0, &hex!("00 00 00 00 00 00 00 81")),
        (1 << 56, 0, 0, &hex!("00 00 00 00 00 00 00 00 81")),
        (64, 1, 0, &hex!("00 81")),
    ];
    for &(n, p, header, want) in encodes {
        let bytes = varint::encode(n, p, header).unwrap();
        assert_eq!(bytes, want, "encoding {} p={}", n, p);
        assert_eq!(varint::decode(&bytes, p).unwrap(), (n, bytes.len()));
    }
}

#[test]
fn varint_usage_errors() {
    assert_eq!(varint::encode(1, 8, 0).unwrap_err().code(), ERR_RANGE);
    assert_eq!(varint::encode(1, 3, 0x10).unwrap_err().code(), ERR_RANGE);
}

#[test]
fn varint_without_stop_bit() {
    assert_eq!(varint::decode(&hex!("00 00"), 0).unwrap_err().code(), ERR_FORMAT);
    assert_eq!(varint::decode(&[], 0).unwrap_err().code(), ERR_FORMAT);
}

#[test]
fn varint_collection_guard() {
    let at_limit = varint::encode(1 << 20, 0, 0).unwrap();
    assert_eq!(varint::decode_collection_len(&at_limit, 0).unwrap().0, 1 << 20);

    let over = varint::encode((1 << 20) + 1, 0, 0).unwrap();
    assert_eq!(varint::decode_collection_len(&over, 0).unwrap_err().code(), ERR_LIMIT);

    // Aborts on the byte that crosses the guard, before any stop bit.
    let err = varint::decode_collection_len(&hex!("00 00 00 7F"), 0).unwrap_err();
    assert_eq!(err.code(), ERR_LIMIT);
}

// ── Configuration ───────────────────────────────────────────

#[test]
fn decoder_config_from_json() {
    let config = DecoderConfig::from_json(r#"{"max_depth": 8, "limits": {"max_str_len": 16}}"#)
        .unwrap();
    assert_eq!(config.max_depth, 8);
    assert_eq!(config.limits.max_str_len, 16);
    assert_eq!(config.limits.max_map_len, Limits::default().max_map_len);
    assert_eq!(config.read_chunk_size, DecoderConfig::default().read_chunk_size);

    let decoder = Decoder::with_config(config);
    assert_eq!(decoder.config().max_depth, 8);
}

#[test]
fn encoder_config_from_json() {
    let config = EncoderConfig::from_json(r#"{"use_32bit_float": true}"#).unwrap();
    assert!(config.use_32bit_float);
    assert!(config.reset_buffer_after_pack);
    assert_eq!(config.recursion_limit, 511);
}

#[test]
fn bad_config_document() {
    let err = DecoderConfig::from_json(r#"{"max_depth": "deep"}"#).unwrap_err();
    assert_eq!(err.code(), ERR_CONFIG);
}
