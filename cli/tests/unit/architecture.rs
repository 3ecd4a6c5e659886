//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks to the host only through ports, infra
//! never renders output, and commands are the composition root.

use std::path::Path;

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Count non-test, non-comment, non-empty lines in a file.
fn count_non_test_lines(content: &str) -> usize {
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .filter(|line| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            !in_test && !trimmed.is_empty() && !trimmed.starts_with("//")
        })
        .count()
}

// ── Output ────────────────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let commands_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("commands");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let lines = read_non_comment_lines(&file);
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        for (i, line) in lines.iter().enumerate() {
            let lineno = i + 1;
            if line.contains("json: bool") {
                violations.push(format!(
                    "{rel}:{lineno}: found `json: bool` parameter: {line}"
                ));
            }
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{rel}:{lineno}: found inline JSON branch: {line}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/ -> use app.is_json() with output::json:\n{}",
        violations.join("\n")
    );
}

// ── Layer imports ─────────────────────────────────────────────────────────────

/// Scan `dir` for non-comment lines containing any of `forbidden`.
fn forbidden_lines(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            for pattern in forbidden {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{}: `{pattern}`: {line}", i + 1));
                }
            }
        }
    }
    violations
}

#[test]
fn domain_is_pure() {
    let domain_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("domain");

    let violations = forbidden_lines(
        &domain_dir,
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::net",
        ],
    );

    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_reaches_the_host_only_through_ports() {
    let app_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("application");

    let violations = forbidden_lines(
        &app_dir,
        &[
            "crate::infra",
            "crate::output",
            "crate::commands",
            "crate::app::",
            "println!",
            "eprintln!",
        ],
    );

    assert!(
        violations.is_empty(),
        "application/ must depend on ports, not adapters or presentation:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_take_trait_bounds_not_adapters() {
    let services_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("application")
        .join("services");

    let concrete = ["LocalHost", "SystemdInstaller", "TokioCommandRunner", "ProcessDelegate"];
    let mut violations = Vec::new();
    for file in collect_rs_files(&services_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if !line.contains("fn ") {
                continue;
            }
            for name in concrete {
                if line.contains(name) {
                    violations.push(format!("{rel}:{}: concrete `{name}` in signature: {line}", i + 1));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Service signatures must use port trait bounds:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("infra");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&infra_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("crate::commands") || line.contains("crate::output") {
                violations.push(format!(
                    "{rel}:{}: forbidden import in infra/: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("infra");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&infra_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };

        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            if line.contains("println!") || line.contains("eprintln!") {
                violations.push(format!(
                    "{rel}:{}: print macro in infra/ outside #[cfg(test)]: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Command handler size ──────────────────────────────────────────────────────

/// Command handlers stay thin; logic belongs in application services.
#[test]
fn command_handlers_are_reasonably_sized() {
    let commands_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("commands");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };

        let line_count = count_non_test_lines(&content);

        if line_count > 125 {
            let rel = file
                .strip_prefix(env!("CARGO_MANIFEST_DIR"))
                .unwrap_or(&file)
                .display()
                .to_string();
            violations.push(format!("{rel}: {line_count} non-test lines (limit: 125)"));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handler files exceed 125-line limit -> extract logic to application services:\n{}",
        violations.join("\n")
    );
}

// ── Prompts ───────────────────────────────────────────────────────────────────

/// Prompts in `commands/` go through the `Prompter` implemented by `AppContext`.
#[test]
fn commands_use_standardized_confirmation() {
    let commands_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("commands");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("std::io::stdin().lock()") || line.contains("io::stdin().lock()") {
                violations.push(format!(
                    "{rel}:{}: direct stdin lock -> use app.confirm() instead: {line}",
                    i + 1
                ));
            }
            if line.contains("dialoguer::Confirm::new()") || line.contains("Confirm::new()") {
                violations.push(format!(
                    "{rel}:{}: direct dialoguer::Confirm -> use app.confirm() instead: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Commands must use app.confirm() for user prompts:\n{}",
        violations.join("\n")
    );
}

// ── Blocking I/O ──────────────────────────────────────────────────────────────

/// Track whether a line is inside an async fn and outside `spawn_blocking`.
struct AsyncContextTracker {
    in_async_fn: bool,
    in_spawn_blocking: bool,
    brace_depth: i32,
    async_fn_start_depth: i32,
    spawn_blocking_start_depth: i32,
}

impl AsyncContextTracker {
    fn new() -> Self {
        Self {
            in_async_fn: false,
            in_spawn_blocking: false,
            brace_depth: 0,
            async_fn_start_depth: 0,
            spawn_blocking_start_depth: 0,
        }
    }

    /// Process a line. Returns `true` if the line is in an async fn but NOT in `spawn_blocking`.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if (trimmed.contains("async fn ") || trimmed.contains("async fn\t"))
            && !trimmed.starts_with("//")
        {
            self.in_async_fn = true;
            self.async_fn_start_depth = self.brace_depth;
        } else if trimmed.contains("fn ")
            && !trimmed.contains("async ")
            && !trimmed.starts_with("//")
        {
            self.in_async_fn = false;
            self.in_spawn_blocking = false;
        }
        if self.in_async_fn && line.contains("spawn_blocking") {
            self.in_spawn_blocking = true;
            self.spawn_blocking_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_spawn_blocking && self.brace_depth <= self.spawn_blocking_start_depth
                    {
                        self.in_spawn_blocking = false;
                    }
                    if self.in_async_fn && self.brace_depth <= self.async_fn_start_depth {
                        self.in_async_fn = false;
                    }
                }
                _ => {}
            }
        }
        self.in_async_fn && !self.in_spawn_blocking
    }
}

#[test]
fn infra_async_functions_do_not_use_blocking_fs() {
    let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("infra");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&infra_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };

        let mut tracker = AsyncContextTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_unguarded_async = tracker.process_line(line);
            let trimmed = line.trim();
            if !in_unguarded_async || trimmed.starts_with("//") {
                continue;
            }
            if line.contains("std::fs::") || (line.contains("fs::") && line.contains("std::fs")) {
                violations.push(format!(
                    "{rel}:{}: std::fs in async fn outside spawn_blocking -> use spawn_blocking instead: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ async functions must not use blocking std::fs outside spawn_blocking:\n{}",
        violations.join("\n")
    );
}

/// application/ must not use `std::fs`, `std::process::Command`, or `std::net` directly
/// in async functions outside `spawn_blocking`.
///
/// `std::fs` is fine inside `spawn_blocking`, `#[cfg(unix)]` or test blocks,
/// and in synchronous functions.
#[test]
fn application_has_no_blocking_io() {
    let app_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("application");

    let mut violations = Vec::new();
    for file in collect_rs_files(&app_dir) {
        if let Some(v) = check_file_for_blocking_io(&file) {
            violations.extend(v);
        }
    }

    assert!(
        violations.is_empty(),
        "Found blocking I/O calls in async functions in application/ layer:\n{}",
        violations.join("\n")
    );
}

fn check_file_for_blocking_io(file: &Path) -> Option<Vec<String>> {
    let rel = file
        .strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string();
    let rel_normalized = rel.replace('\\', "/");

    let content = std::fs::read_to_string(file).ok()?;

    let deny_list = [
        ("std::fs::", "use spawn_blocking for fs operations"),
        (
            "std::process::Command",
            "use crate::application::ports::CommandRunner",
        ),
        ("std::net::", "the orchestrator has no network port"),
    ];

    let mut violations = Vec::new();
    let mut tracker = AsyncContextTracker::new();
    let mut in_cfg_unix = false;
    let mut in_cfg_test = false;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with("#[cfg(unix)]") {
            in_cfg_unix = true;
            continue;
        }
        if trimmed.starts_with("#[cfg(test)]") || trimmed.starts_with("#[tokio::test]") {
            in_cfg_test = true;
            continue;
        }

        let in_unguarded_async = tracker.process_line(line);

        if trimmed.starts_with('}') {
            in_cfg_unix = false;
        }

        if !in_unguarded_async || in_cfg_unix || in_cfg_test {
            continue;
        }

        for (pattern, recommendation) in &deny_list {
            if trimmed.contains(pattern) {
                violations.push(format!(
                    "  {}:{}: found `{}` in async context ({})",
                    rel_normalized,
                    i + 1,
                    pattern,
                    recommendation
                ));
            }
        }
    }

    if violations.is_empty() {
        None
    } else {
        Some(violations)
    }
}

/// No module-level #![`allow(dead_code)`] in domain/, application/, or infra/ layers.
#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let layer_dirs = [
        src_dir.join("domain"),
        src_dir.join("application"),
        src_dir.join("infra"),
    ];

    let mut violations: Vec<String> = Vec::new();

    for dir in &layer_dirs {
        for file in collect_rs_files(dir) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            let rel = file
                .strip_prefix(env!("CARGO_MANIFEST_DIR"))
                .unwrap_or(&file)
                .display()
                .to_string();

            for (i, line) in content.lines().enumerate() {
                let trimmed = line.trim();
                // Only flag module-level (inner attribute) dead_code suppression
                if trimmed == "#![allow(dead_code)]" {
                    violations.push(format!(
                        "{rel}:{}: module-level #![allow(dead_code)] -> use item-level suppression with a comment explaining why",
                        i + 1
                    ));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] found in architecture layers -> use item-level suppression:\n{}",
        violations.join("\n")
    );
}

