// Signing, verification and envelope decryption benchmarks.
//
// Covers canonicalization, MD5 and HMAC-SHA256 digests over a realistic
// unified order, constant-time verification, notification parsing, and
// AES-CBC envelope decryption at several payload sizes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use wechat_sdk::crypto::cbc::{decrypt_envelope, encrypt_envelope};
use wechat_sdk::crypto::{attach_signature, canonicalize, sign, verify, SignType, SigningRecord};
use wechat_sdk::pay::PayNotification;
use wechat_sdk::wire;

const PAY_KEY: &str = "192006250b4c09247ec02edce69f6a2d";

fn order_record() -> SigningRecord {
    SigningRecord::new()
        .with("appid", "wx2421b1c4370ec43b")
        .with("mch_id", "10000100")
        .with("nonce_str", "1add1a30ac87aa2db72f57a2375d8fec")
        .with("body", "Tea shop - green tea")
        .with("out_trade_no", "1000010020240101120000123456")
        .with("total_fee", 888)
        .with("spbill_create_ip", "203.0.113.7")
        .with("notify_url", "https://shop.example.com/wxpay/notify")
        .with("trade_type", "APP")
}

fn bench_canonicalize(c: &mut Criterion) {
    let record = order_record();
    c.bench_function("canonical/unified_order", |b| {
        b.iter(|| canonicalize(&record, PAY_KEY));
    });
}

fn bench_sign(c: &mut Criterion) {
    let record = order_record();
    let mut group = c.benchmark_group("sign/unified_order");
    for sign_type in [SignType::Md5, SignType::HmacSha256] {
        group.bench_with_input(BenchmarkId::from_parameter(sign_type), &record, |b, record| {
            b.iter(|| sign(record, PAY_KEY, sign_type).unwrap());
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let record = order_record();
    let digest = sign(&record, PAY_KEY, SignType::Md5).unwrap().to_ascii_uppercase();
    c.bench_function("verify/md5_uppercase", |b| {
        b.iter(|| verify(&record, PAY_KEY, SignType::Md5, &digest).unwrap());
    });
}

fn bench_notification(c: &mut Criterion) {
    let mut record = order_record()
        .with("return_code", "SUCCESS")
        .with("result_code", "SUCCESS")
        .with("transaction_id", "1004400740201409030005092168")
        .with("cash_fee", 888);
    attach_signature(&mut record, PAY_KEY, SignType::Md5).unwrap();
    let xml = wire::to_xml(&record);

    c.bench_function("notify/parse_and_verify", |b| {
        b.iter(|| PayNotification::verify(&xml, PAY_KEY, SignType::Md5).unwrap());
    });
}

fn bench_decrypt_envelope(c: &mut Criterion) {
    let key = [0x42u8; 16];
    let iv = [0x24u8; 16];
    let key_b64 = STANDARD.encode(key);
    let iv_b64 = STANDARD.encode(iv);

    let mut group = c.benchmark_group("cbc/decrypt_envelope");
    for size in [256usize, 1024, 4096] {
        let sealed = encrypt_envelope(&key, &iv, &vec![b'x'; size]).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sealed, |b, sealed| {
            b.iter(|| decrypt_envelope(&key_b64, &iv_b64, sealed).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_canonicalize,
    bench_sign,
    bench_verify,
    bench_notification,
    bench_decrypt_envelope,
);
criterion_main!(benches);
