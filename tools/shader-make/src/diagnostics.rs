//! Compiler diagnostics reformatting
//!
//! dxc reports `file:line:col: message` with paths relative to the manifest
//! directory. IDEs jump to `absolute/file(line,col): message`, so failure
//! output is rewritten before it is printed.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::executor::CompileFailure;

fn diagnostic_regex() -> &'static Regex {
    static DIAGNOSTIC: OnceLock<Regex> = OnceLock::new();
    DIAGNOSTIC.get_or_init(|| {
        Regex::new(r"^([a-zA-Z0-9_./\\:]+):(\d+):(\d+): (.*)$").expect("diagnostic pattern is valid")
    })
}

/// Rewrite every diagnostic line of `output`; other lines pass through.
pub fn format_diagnostics(output: &str, base_dir: &Path) -> String {
    output
        .lines()
        .map(|line| format_line(line, base_dir))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_line(line: &str, base_dir: &Path) -> String {
    let Some(captures) = diagnostic_regex().captures(line) else {
        return line.to_string();
    };
    let file = base_dir.join(&captures[1]);
    let file = std::path::absolute(&file).unwrap_or(file);
    format!(
        "{}({},{}): {}",
        file.display(),
        &captures[2],
        &captures[3],
        &captures[4]
    )
}

/// Print every failure with its rewritten compiler output to stderr.
pub fn print_failures(failures: &[CompileFailure], base_dir: &Path) {
    for failure in failures {
        eprintln!(
            "Errors for {} / {} {}:",
            failure.file_name, failure.entry_point, failure.defines
        );
        eprintln!("{}", format_diagnostics(&failure.output, base_dir));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_is_resolved() {
        let formatted = format_diagnostics(
            "lighting/deferred.hlsl:12:7: error: undeclared identifier 'x'",
            Path::new("/proj/shaders"),
        );
        assert_eq!(
            formatted,
            "/proj/shaders/lighting/deferred.hlsl(12,7): error: undeclared identifier 'x'"
        );
    }

    #[test]
    fn test_absolute_path_is_kept() {
        let formatted =
            format_diagnostics("/inc/common.hlsli:3:1: warning: unused", Path::new("/proj"));
        assert_eq!(formatted, "/inc/common.hlsli(3,1): warning: unused");
    }

    #[test]
    fn test_other_lines_pass_through() {
        let output = "compilation failed\n  float x = y;\n        ^";
        assert_eq!(format_diagnostics(output, Path::new("/proj")), output);
    }

    #[test]
    fn test_mixed_output() {
        let output = "a.hlsl:1:2: error: bad\nnote: here";
        assert_eq!(
            format_diagnostics(output, Path::new("/p")),
            "/p/a.hlsl(1,2): error: bad\nnote: here"
        );
    }
}
