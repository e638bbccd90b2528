//! Simple inspector for CBOR files.

use std::fs;

use cbor_object::{decode_from_bytes, to_json_string, Value};

fn describe(value: &Value) -> String {
    let tags = value.tags();
    let kind = value.untagged().kind();
    if tags.is_empty() {
        kind.to_string()
    } else {
        format!("{} under tags {:?}", kind, tags)
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data.cbor".to_string());

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let value = decode_from_bytes(&data).expect("Failed to decode");

    println!("\n=== Item ===");
    println!("Kind: {}", describe(&value));
    if let Ok(array) = value.untagged().as_array() {
        println!("Items: {}", array.len());
    }
    if let Ok(map) = value.untagged().as_map() {
        println!("Entries: {}", map.len());
        for key in map.keys().iter().take(20) {
            println!("  {}", key);
        }
    }

    println!("\n=== Diagnostic ===");
    println!("{}", value);

    println!("\n=== JSON ===");
    match to_json_string(&value) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("(not representable: {})", err),
    }
}
