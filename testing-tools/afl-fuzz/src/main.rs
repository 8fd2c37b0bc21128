use std::str;

use afl::fuzz;

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(text) = str::from_utf8(data) {
            if let Ok(mut doc) = xmlbranch::Document::parse(text) {
                let root = doc.root_id();
                let _ = doc.normalize(root);
            }
        }
    });
}
