//! # DigiSeal Codec Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | ABI | `registerProduct` calldata encoding |
//! | ABI | `getProductDetails` return decoding |
//! | ABI | History array decoding at growing sizes |
//! | Types | Address parsing and role id hashing |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use digiseal_types::{parse_address, Address, ProductRegistration, Role, U256};
use product_contract::abi::{self, Token};
use product_contract::binding;

fn product_output() -> Vec<u8> {
    abi::encode(&[
        Token::String("BAG-001".into()),
        Token::Address(Address::repeat_byte(0x11)),
        Token::Address(Address::repeat_byte(0x22)),
        Token::Uint(U256::from(1_700_000_000u64)),
        Token::String("Acme Leather".into()),
        Token::String("Handbag, brown, hand stitched, serial 0042".into()),
        Token::String("Florence".into()),
        Token::Uint(U256::from(1u8)),
        Token::Bool(true),
    ])
}

fn transfer_output(len: usize) -> Vec<u8> {
    let records = (0..len)
        .map(|i| {
            Token::Tuple(vec![
                Token::Address(Address::from_low_u64_be(i as u64)),
                Token::Address(Address::from_low_u64_be(i as u64 + 1)),
                Token::Uint(U256::from(1_700_000_000u64 + i as u64)),
            ])
        })
        .collect();
    abi::encode(&[Token::Array(records)])
}

fn bench_calldata_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("abi-encode");
    let function = binding::register_product();
    let registration = ProductRegistration {
        product_id: "BAG-001".into(),
        manufacturer_name: "Acme Leather".into(),
        product_details: "Handbag, brown, hand stitched, serial 0042".into(),
        manufacturing_location: "Florence".into(),
    };

    group.bench_function("register_product", |b| {
        b.iter(|| {
            let tokens = binding::registration_tokens(black_box(&registration));
            black_box(function.encode_input(&tokens))
        })
    });

    group.finish();
}

fn bench_output_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("abi-decode");

    let details = binding::get_product_details();
    let data = product_output();
    group.bench_function("product_details", |b| {
        b.iter(|| {
            let tokens = details.decode_output(black_box(&data)).ok()?;
            binding::product_from_tokens(tokens).ok()
        })
    });

    let history = binding::get_transfer_history();
    for size in [1usize, 10, 100, 1000] {
        let data = transfer_output(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("transfer_history", size), &data, |b, data| {
            b.iter(|| {
                let tokens = history.decode_output(black_box(data)).ok()?;
                binding::transfer_history_from_tokens(tokens).ok()
            })
        });
    }

    group.finish();
}

fn bench_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("types");

    group.bench_function("parse_address", |b| {
        b.iter(|| parse_address(black_box("0x5B38Da6a701c568545dCfcB03FcB875f56beddC4")))
    });
    group.bench_function("role_id", |b| {
        b.iter(|| black_box(Role::Manufacturer).role_id())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_calldata_encoding,
    bench_output_decoding,
    bench_types,
);

criterion_main!(benches);
