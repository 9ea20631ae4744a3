// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{criterion_group, criterion_main, Criterion};
use stun_wire::attribute::*;
use stun_wire::builder::MessageBuilder;
use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};

const PASSWORD: &[u8] = b"xJcE9AQAR7kczUDVOXRUCl";

fn ice_request() -> Vec<u8> {
    let mtype = MessageType::from_class_method(MessageClass::Request, BINDING);
    let mut msg = MessageBuilder::new(mtype, TransactionId::generate());
    msg.add_attribute(&Username::new(b"p9KA:SQAt")).unwrap();
    msg.add_attribute(&IceControlling::new(0x6eee_c6e9_7d18_395c))
        .unwrap();
    msg.add_attribute(&UseCandidate::new()).unwrap();
    msg.add_attribute(&Priority::new(0x6e7f_1eff)).unwrap();
    msg.add_message_integrity(PASSWORD).unwrap();
    msg.add_fingerprint().unwrap();
    msg.build()
}

fn bench_message_parse(c: &mut Criterion) {
    let data = ice_request();
    let mut group = c.benchmark_group("Message/Parse");
    group.throughput(criterion::Throughput::Bytes(data.len() as u64));

    group.bench_with_input("Header", &data, |b, data| {
        b.iter(|| Message::from_bytes(data).unwrap())
    });
    let msg = Message::from_bytes(&data).unwrap();
    group.bench_with_input("Attributes", &msg, |b, msg| {
        b.iter(|| msg.parse_attributes().unwrap())
    });
    let attrs = msg.parse_attributes().unwrap();
    group.bench_with_input("Fingerprint", &attrs, |b, attrs| {
        b.iter(|| assert!(msg.verify_fingerprint(attrs)))
    });
    group.bench_with_input("MessageIntegrity", &attrs, |b, attrs| {
        b.iter(|| assert!(msg.verify_integrity(attrs, PASSWORD)))
    });
    group.finish();
}

criterion_group!(message_parse, bench_message_parse);
criterion_main!(message_parse);
