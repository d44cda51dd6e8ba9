use std::collections::{HashMap, HashSet};

const DOT_KEYWORDS: [&str; 6] = ["node", "edge", "graph", "digraph", "subgraph", "strict"];

/// Logical name of a lock key: trailing `_<digits>` groups are removed,
/// so `nixpkgs_2` and `nixpkgs_2_1` both become `nixpkgs`.
pub fn normalized_name(name: &str) -> &str {
    let mut end = name.len();
    while let Some(idx) = name[..end].rfind('_') {
        let suffix = &name[idx + 1..end];
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        end = idx;
    }
    if end == 0 {
        name
    } else {
        &name[..end]
    }
}

#[derive(Debug, Default)]
pub struct IdAllocator {
    assigned: HashMap<String, String>,
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<&str> = names.into_iter().collect();
        let mut allocator = Self::default();
        let (valid, invalid): (Vec<&str>, Vec<&str>) =
            names.into_iter().partition(|name| sanitize(name) == *name);
        for name in valid.into_iter().chain(invalid) {
            allocator.id_for(name);
        }
        allocator
    }

    pub fn id_for(&mut self, name: &str) -> String {
        if let Some(id) = self.assigned.get(name) {
            return id.clone();
        }
        let base = sanitize(name);
        let mut candidate = base.clone();
        let mut counter = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.used.insert(candidate.clone());
        self.assigned.insert(name.to_string(), candidate.clone());
        candidate
    }
}

fn sanitize(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let starts_with_digit = id.chars().next().map_or(true, |c| c.is_ascii_digit());
    if starts_with_digit || DOT_KEYWORDS.contains(&id.to_ascii_lowercase().as_str()) {
        id.insert_str(0, "n_");
    }
    id
}

pub fn escape_dot(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
