use std::collections::HashMap;

use serde_json::Value;

/// Free-form records kept per address, alongside the ledger.
#[derive(Debug, Default)]
pub struct AddressBook {
    entries: HashMap<String, Vec<Value>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` to the list kept for `address`; returns the new length.
    pub fn record(&mut self, address: &str, data: Value) -> usize {
        let list = self.entries.entry(address.to_string()).or_default();
        list.push(data);
        list.len()
    }

    /// Unknown addresses yield an empty slice.
    pub fn entries(&self, address: &str) -> &[Value] {
        self.entries.get(address).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::AddressBook;
    use serde_json::json;

    #[test]
    fn records_accumulate_per_address() {
        let mut book = AddressBook::new();
        assert_eq!(book.record("address1", json!({ "note": "first" })), 1);
        assert_eq!(book.record("address1", json!({ "note": "second" })), 2);
        book.record("address2", json!(42));

        assert_eq!(book.entries("address1")[1]["note"], "second");
        assert_eq!(book.entries("address2"), [json!(42)]);
    }

    #[test]
    fn unknown_address_is_empty() {
        let book = AddressBook::new();
        assert!(book.entries("nobody").is_empty());
    }
}
