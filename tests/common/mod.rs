#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use restorer::alphabet::BASE64_SYMBOLS;
use restorer::substitution;
use restorer::{AlphabetTable, Container};
use std::fs;
use std::path::{Path, PathBuf};

/// Frames `content` exactly like the disguising tool does.
pub fn disguise(content: &[u8], original_name: &str, type_tag: &str) -> String {
    disguise_with(AlphabetTable::deployed(), content, original_name, type_tag)
}

pub fn disguise_with(
    table: &AlphabetTable,
    content: &[u8],
    original_name: &str,
    type_tag: &str,
) -> String {
    let encoded = STANDARD.encode(content);
    let payload = substitution::encode(&encoded, table.encode_map());
    Container::new(original_name, type_tag, &payload).frame()
}

pub fn write_disguised(dir: &Path, file_name: &str, content: &[u8], original_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, disguise(content, original_name, "bin")).unwrap();
    path
}

/// Writes a candidate whose payload is cut short so it is no longer valid
/// base64.
pub fn write_truncated(dir: &Path, file_name: &str, content: &[u8], original_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    let mut text = disguise(content, original_name, "bin");
    text.truncate(text.len() - 3);
    fs::write(&path, text).unwrap();
    path
}

/// Deterministic bytes whose base64 form avoids the symbols the deployed
/// table cannot round-trip.
pub fn sample_content(len: usize, seed: u32) -> Vec<u8> {
    let lost = AlphabetTable::deployed().collisions();
    let symbols: Vec<char> = BASE64_SYMBOLS.chars().filter(|c| !lost.contains(c)).collect();
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);

    for _ in 0..100 {
        let text: String = (0..len.div_ceil(3) * 4)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                symbols[(state >> 16) as usize % symbols.len()]
            })
            .collect();
        let mut bytes = STANDARD.decode(&text).unwrap();
        bytes.truncate(len);
        if !STANDARD.encode(&bytes).chars().any(|c| lost.contains(&c)) {
            return bytes;
        }
    }
    panic!("no sample of {len} bytes avoids {lost:?}");
}
