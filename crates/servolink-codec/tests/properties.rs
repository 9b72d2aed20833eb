//! Property checks over every command shape.

use proptest::prelude::*;
use servolink_codec::command::ANSWER_HEADER;
use servolink_codec::{
    Answer, Command, LengthTable, MessageIn, MessageOut, Query, HOST_TERMINATOR,
};

fn any_query() -> impl Strategy<Value = Query> {
    let id = 0u8..=15;
    prop_oneof![
        (id.clone(), any::<i16>()).prop_map(|(id, value)| Query::Control { id, value }),
        id.clone().prop_map(|id| Query::Info { id }),
        (id.clone(), any::<u16>(), any::<i32>())
            .prop_map(|(id, index, value)| Query::Write { id, index, value }),
        (id.clone(), any::<u16>()).prop_map(|(id, index)| Query::Read { id, index }),
        (id, any::<u32>(), any::<u32>())
            .prop_map(|(id, address, word)| Query::Flash { id, address, word }),
    ]
}

fn any_answer() -> impl Strategy<Value = Answer> {
    prop_oneof![
        (any::<i16>(), any::<i16>()).prop_map(|(angle, moment)| Answer::Control { angle, moment }),
        any::<[i16; 3]>().prop_map(|values| Answer::Info { values }),
        any::<i32>().prop_map(|value| Answer::Write { value }),
        any::<i32>().prop_map(|value| Answer::Read { value }),
        (0u8..8, 0u8..=15, any::<u32>())
            .prop_map(|(status, id, value)| Answer::Flash { status, id, value }),
    ]
}

/// Exactly one byte, the first, has bit 7 cleared.
fn single_header(bytes: &[u8]) -> bool {
    bytes[0] & 0x80 == 0 && bytes[1..].iter().all(|b| b & 0x80 == 0x80)
}

fn encode_query(query: &Query) -> MessageOut {
    let mut out = MessageOut::new();
    query.encode(&mut out);
    out
}

proptest! {
    #[test]
    fn query_roundtrip(query in any_query()) {
        let out = encode_query(&query);
        let mut msg = MessageIn::new(out.buffer());
        let decoded = Query::decode(&mut msg, &LengthTable::device_queries()).unwrap();
        prop_assert_eq!(decoded, query);
    }

    #[test]
    fn reencoding_reproduces_bytes(query in any_query()) {
        let out = encode_query(&query);
        let mut msg = MessageIn::new(out.buffer());
        let decoded = Query::decode(&mut msg, &LengthTable::device_queries()).unwrap();
        let reencoded = encode_query(&decoded);
        prop_assert_eq!(reencoded.buffer(), out.buffer());
    }

    #[test]
    fn answer_roundtrip(answer in any_answer()) {
        let mut out: MessageOut = MessageOut::new();
        answer.encode(&mut out);
        let mut msg = MessageIn::new(out.buffer());
        let decoded =
            Answer::decode(&mut msg, answer.command(), &LengthTable::device_answers()).unwrap();
        prop_assert_eq!(decoded, answer);
    }

    #[test]
    fn only_first_byte_is_a_header(query in any_query()) {
        let out = encode_query(&query);
        prop_assert!(single_header(out.buffer()));
    }

    #[test]
    fn answers_have_a_single_header(answer in any_answer()) {
        let mut out: MessageOut = MessageOut::new();
        answer.encode(&mut out);
        prop_assert!(single_header(out.buffer()));
        prop_assert_eq!(out.buffer()[0], ANSWER_HEADER);
    }

    #[test]
    fn host_frames_have_a_single_header_before_the_terminator(
        cmd in 0u8..0x80,
        answer in any::<bool>(),
        fields in prop::collection::vec((any::<u32>(), 1u32..=32), 0..3),
    ) {
        let mut out: MessageOut = MessageOut::new();
        if answer {
            out.host_begin_answer();
        } else {
            out.host_begin_query(cmd);
        }
        for &(value, bits) in &fields {
            out.add_int_n(value, bits);
        }
        out.host_end();

        let (terminator, frame) = out.buffer().split_last().unwrap();
        prop_assert_eq!(*terminator, HOST_TERMINATOR);
        prop_assert!(single_header(frame));
        prop_assert!(MessageIn::new(frame).check_crc(frame.len()));
    }

    #[test]
    fn length_matches_table(query in any_query()) {
        let out = encode_query(&query);
        let table = LengthTable::device_queries();
        prop_assert_eq!(out.length(), table.length(query.command().code()));
    }

    #[test]
    fn any_single_bit_flip_fails_checksum(
        query in any_query(),
        byte in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let out = encode_query(&query);
        let mut wire = out.buffer().to_vec();
        let index = byte.index(wire.len());
        wire[index] ^= 1 << bit;

        let msg = MessageIn::new(&wire);
        prop_assert!(!msg.check_crc(wire.len()));
    }

    #[test]
    fn wrapped_frame_checks_like_contiguous(
        query in any_query(),
        extra in 0usize..16,
        start in any::<prop::sample::Index>(),
    ) {
        let out = encode_query(&query);
        let frame = out.buffer();
        let mut ring = vec![0xEEu8; frame.len() + extra];
        let start = start.index(ring.len());
        for (i, &b) in frame.iter().enumerate() {
            let slot = (start + i) % ring.len();
            ring[slot] = b;
        }

        let mut msg = MessageIn::circular(&ring, start);
        prop_assert!(msg.check_crc(frame.len()));
        let decoded = Query::decode(&mut msg, &LengthTable::device_queries()).unwrap();
        prop_assert_eq!(decoded, query);
    }

    #[test]
    fn arbitrary_width_fields_roundtrip(fields in prop::collection::vec((any::<u32>(), 1u32..=32), 1..6)) {
        let mut out = MessageOut::<32>::new();
        out.begin_answer();
        for &(value, bits) in &fields {
            out.add_int_n(value, bits);
        }
        out.end();

        let mut msg = MessageIn::new(out.buffer());
        for &(value, bits) in &fields {
            let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
            prop_assert_eq!(msg.get_int_n(bits), value & mask);
        }
        prop_assert!(msg.check_crc(out.length()));
    }
}

#[test]
fn boundary_values_roundtrip() {
    let table = LengthTable::device_queries();
    let queries = [
        Query::Control { id: 0, value: 0 },
        Query::Control {
            id: 15,
            value: i16::MAX,
        },
        Query::Control {
            id: 15,
            value: i16::MIN,
        },
        Query::Write {
            id: 0,
            index: 0,
            value: 0,
        },
        Query::Write {
            id: 15,
            index: u16::MAX,
            value: i32::MAX,
        },
        Query::Flash {
            id: 15,
            address: u32::MAX,
            word: u32::MAX,
        },
    ];
    for query in queries {
        let out = encode_query(&query);
        let mut msg = MessageIn::new(out.buffer());
        assert_eq!(Query::decode(&mut msg, &table).unwrap(), query);
        assert_eq!(query.command(), Command::try_from(msg.cmd()).unwrap());
    }
}
