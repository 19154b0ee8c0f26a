#![no_main]

use driftwatch_ingest::wire::decode_record;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut input = data;
    // 임의의 바이트에 대해 패닉 없이 에러 또는 레코드를 돌려줘야 한다
    while let Ok(Some(_)) = decode_record(&mut input) {}
});
