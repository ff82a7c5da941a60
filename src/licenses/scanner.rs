//! Heuristic license detection from LICENSE-family files.
//!
//! Finds the first file from a priority-ordered name list and matches its
//! content against an ordered table of regex → SPDX identifier pairs. The
//! first match wins; matching is case-insensitive across line boundaries.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Candidate file names, highest priority first.
const LICENSE_FILES: &[&str] = &[
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
    "LICENCE",
    "LICENCE.md",
    "LICENCE.txt",
    "LICENSE-MIT",
    "LICENSE-APACHE",
    "COPYING",
    "COPYING.md",
    "COPYING.txt",
];

/// Ordered content heuristics. More specific texts come before their
/// substrings (BSD-3 before BSD-2, AGPL/LGPL before GPL).
static HEURISTICS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: &[(&str, &str)] = &[
        (
            r"Permission is hereby granted, free of charge, to any person obtaining a copy",
            "MIT",
        ),
        (r"Apache License,?\s+Version 2\.0", "Apache-2.0"),
        (
            r"(?s)Redistribution and use in source and binary forms.*Neither the name",
            "BSD-3-Clause",
        ),
        (
            r"Redistribution and use in source and binary forms",
            "BSD-2-Clause",
        ),
        (
            r"Permission to use, copy, modify, and(?:/or)? distribute this software",
            "ISC",
        ),
        (r"Mozilla Public License,?\s+(?:Version\s+|v\.?\s*)2\.0", "MPL-2.0"),
        (
            r"GNU AFFERO GENERAL PUBLIC LICENSE\s+Version 3",
            "AGPL-3.0-only",
        ),
        (
            r"GNU LESSER GENERAL PUBLIC LICENSE\s+Version 3",
            "LGPL-3.0-only",
        ),
        (
            r"GNU LESSER GENERAL PUBLIC LICENSE\s+Version 2\.1",
            "LGPL-2.1-only",
        ),
        (r"GNU GENERAL PUBLIC LICENSE\s+Version 3", "GPL-3.0-only"),
        (r"GNU GENERAL PUBLIC LICENSE\s+Version 2", "GPL-2.0-only"),
        (
            r"This is free and unencumbered software released into the public domain",
            "Unlicense",
        ),
        (r"CC0 1\.0 Universal", "CC0-1.0"),
        (
            r"(?s)This software is provided ['\x{2018}\x{2019}]?as-is['\x{2018}\x{2019}]?.*must not\s+be misrepresented",
            "Zlib",
        ),
    ];

    table
        .iter()
        .map(|(pattern, id)| {
            let re = Regex::new(&format!("(?i){}", pattern)).expect("static pattern is valid");
            (re, *id)
        })
        .collect()
});

/// Detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Confidence {
    High,
    None,
}

/// Outcome of scanning a directory.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The license file that was inspected, if any.
    pub file: Option<PathBuf>,

    /// Detected SPDX identifier.
    pub id: Option<String>,

    pub confidence: Confidence,
}

impl ScanResult {
    fn empty() -> Self {
        ScanResult {
            file: None,
            id: None,
            confidence: Confidence::None,
        }
    }
}

/// Scan a directory for a license file and guess its SPDX identifier.
pub fn scan(dir: &Path) -> ScanResult {
    let Some(file) = find_license_file(dir) else {
        return ScanResult::empty();
    };

    let Ok(content) = std::fs::read_to_string(&file) else {
        tracing::debug!("failed to read license file {}", file.display());
        return ScanResult {
            file: Some(file),
            id: None,
            confidence: Confidence::None,
        };
    };

    for (re, id) in HEURISTICS.iter() {
        if re.is_match(&content) {
            return ScanResult {
                file: Some(file),
                id: Some((*id).to_string()),
                confidence: Confidence::High,
            };
        }
    }

    ScanResult {
        file: Some(file),
        id: None,
        confidence: Confidence::None,
    }
}

fn find_license_file(dir: &Path) -> Option<PathBuf> {
    LICENSE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}
