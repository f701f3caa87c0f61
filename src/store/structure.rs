//! Line-based import and definition counting
//!
//! A cheap structural probe over file content, good enough to rank files of
//! one repository against each other. Supports Python, Rust, JS/TS, Go,
//! Java, C/C++ and C#.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::models::FileStructure;

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyi", "rs", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "kt", "c", "h",
    "cc", "cpp", "cxx", "hpp", "hh", "cs",
];

static IMPORT: OnceLock<Option<Regex>> = OnceLock::new();
static DEFINITION: OnceLock<Option<Regex>> = OnceLock::new();
static METHOD: OnceLock<Option<Regex>> = OnceLock::new();
static C_FUNCTION: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn import_pattern() -> Option<&'static Regex> {
    compiled(
        &IMPORT,
        r#"^\s*(?:import\s|from\s+\S+\s+import\s|(?:pub(?:\([^)]*\))?\s+)?use\s+\w+::|#\s*include\s*[<"]|using\s+[\w.]+\s*;|(?:const|let|var)\s+.*=\s*require\s*\()"#,
    )
}

fn definition_pattern() -> Option<&'static Regex> {
    compiled(
        &DEFINITION,
        r"^\s*(?:export\s+(?:default\s+)?)?(?:pub(?:\([^)]*\))?\s+)?(?:(?:public|private|protected|internal|static|abstract|final|sealed|partial)\s+)*(?:async\s+)?(?:unsafe\s+)?(?:def|fn|func|function|class|struct|enum|trait|interface|impl)\b",
    )
}

fn method_pattern() -> Option<&'static Regex> {
    compiled(
        &METHOD,
        r"^\s*(?:(?:public|private|protected|internal|static|virtual|override|final|abstract|synchronized)\s+)+[\w<>\[\],.?]+\s+\w+\s*\(",
    )
}

fn c_function_pattern() -> Option<&'static Regex> {
    compiled(
        &C_FUNCTION,
        r"^[A-Za-z_][\w*\s:<>,]*\s\**[A-Za-z_][\w:~]*\s*\([^;]*$",
    )
}

/// Whether the path looks like source code worth inspecting
pub fn is_source_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Count import lines and function / class definitions in `content`.
///
/// Each line counts at most once towards each total.
pub fn inspect(content: &str) -> FileStructure {
    let imports = import_pattern();
    let definitions = [definition_pattern(), method_pattern(), c_function_pattern()];

    let mut structure = FileStructure::default();
    for line in content.lines() {
        if imports.is_some_and(|re| re.is_match(line)) {
            structure.imports += 1;
            continue;
        }
        if definitions
            .iter()
            .flatten()
            .any(|re| re.is_match(line))
        {
            structure.definitions += 1;
        }
    }
    structure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_file() {
        let src = "\
import os
from pathlib import Path

class Loader:
    def load(self):
        return os.getcwd()

def main():
    Loader().load()
";
        let s = inspect(src);
        assert_eq!(s.imports, 2);
        assert_eq!(s.definitions, 3);
    }

    #[test]
    fn test_rust_file() {
        let src = "\
use std::fmt;
use crate::models::{A, B};

pub struct Point;

impl Point {
    pub fn new() -> Self {
        Point
    }
}

fn helper(x: u32) -> u32 {
    x
}
";
        let s = inspect(src);
        assert_eq!(s.imports, 2);
        assert_eq!(s.definitions, 4);
    }

    #[test]
    fn test_java_methods() {
        let src = "\
import java.util.List;

public class Service {
    private int count;
    public static void main(String[] args) {
        if (args.length > 0) {
        }
    }
}
";
        let s = inspect(src);
        assert_eq!(s.imports, 1);
        assert_eq!(s.definitions, 2);
    }

    #[test]
    fn test_prose_is_not_structure() {
        let s = inspect("We use this module to import data.\nFunctions are defined below.\n");
        assert_eq!(s, FileStructure::default());
    }

    #[test]
    fn test_source_paths() {
        assert!(is_source_path("src/main.rs"));
        assert!(is_source_path("web/App.TSX"));
        assert!(!is_source_path("README.md"));
        assert!(!is_source_path("Makefile"));
    }
}
