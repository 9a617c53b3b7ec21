use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

mod progress;
mod settings;

use carve::contexts::{Extractor, RuleRegistry};
use carve::data::{AttributionSource, RuleSet, SectionMatch};
use carve::manifest::Manifest;
use carve::registries::FileRuleRegistry;
use progress::ProgressIndicator;
pub use settings::{ExtractSettings, SettingsOverrides, SETTINGS_FILE};

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

const STDIN_MARKER: &str = "-";

/// One attributed file plus its structural check
#[derive(Debug, Serialize)]
struct FileReport {
    filename: String,
    source: AttributionSource,
    confident: bool,
    ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
    #[serde(skip)]
    code: String,
}

#[derive(Debug, Serialize)]
struct ResponseReport {
    response: String,
    files: Vec<FileReport>,
    sections: Vec<SectionMatch>,
}

/// Extracts files from each response and writes them under the output directory.
///
/// Responses are independent, so they are scanned concurrently on blocking
/// tasks; writing happens afterwards, one response at a time.
pub async fn extract(
    responses: Vec<String>,
    overrides: SettingsOverrides,
    json: bool,
    config: &Config,
) -> Result<()> {
    if responses.is_empty() {
        println!("No responses given");
        return Ok(());
    }

    let settings = ExtractSettings::resolve(Path::new(SETTINGS_FILE), overrides)?;
    let rules = Arc::new(load_rules(settings.rules.as_deref())?);
    let out_dirs = response_out_dirs(&settings.out_dir, &responses);

    if config.verbose && !json {
        println!(
            "Extracting {} response(s) into {} ({} signature rule(s))",
            responses.len(),
            settings.out_dir.display(),
            rules.signatures.len()
        );
    }

    let mut progress = ProgressIndicator::new(responses.len());
    let mut tasks = Vec::new();
    for (index, response) in responses.into_iter().enumerate() {
        if !json {
            progress.start_item(&response, index);
        }
        let rules = Arc::clone(&rules);
        let max_input_bytes = settings.max_input_bytes;
        tasks.push(tokio::task::spawn_blocking(move || {
            let result = process_response(&response, &rules, max_input_bytes);
            (response, result)
        }));
    }

    let mut reports = Vec::new();
    for (task, out_dir) in tasks.into_iter().zip(&out_dirs) {
        let (response, result) = task.await?;
        match result {
            Ok(report) => {
                match write_report(&report, out_dir, &settings, config, json, &mut progress) {
                    Ok(()) => progress.complete_item(&response, true),
                    Err(e) => {
                        progress.complete_item(&response, false);
                        eprintln!("✗ Failed to write files for {}: {:#}", response, e);
                    }
                }
                reports.push(report);
            }
            Err(e) => {
                progress.complete_item(&response, false);
                eprintln!("✗ Failed to extract {}: {:#}", response, e);
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialize report")?
        );
    } else {
        progress.finish();
    }

    if progress.failed() > 0 {
        anyhow::bail!("{} response(s) could not be processed", progress.failed());
    }

    Ok(())
}

/// Runs the structural checks on each file and fails if any of them fail.
pub fn validate(files: Vec<PathBuf>, config: &Config) -> Result<()> {
    let mut failures = 0usize;

    for file in &files {
        let code = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let outcome = carve::validate(&code);
        if outcome.ok {
            if config.verbose {
                println!("✓ {}", file.display());
            }
        } else {
            failures += 1;
            tracing::warn!(file = %file.display(), message = %outcome.message, "structural check failed");
            eprintln!("✗ {}: {}", file.display(), outcome.message);
        }
    }

    if failures > 0 {
        anyhow::bail!(
            "{} of {} file(s) failed structural checks",
            failures,
            files.len()
        );
    }

    println!("All {} file(s) passed structural checks", files.len());
    Ok(())
}

/// Prints filenames introduced in the prose of a response.
pub fn sections(response: &str, json: bool) -> Result<()> {
    let text = read_response(response)?;
    let found = carve::locate_sections(&text);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&found).context("Failed to serialize sections")?
        );
        return Ok(());
    }

    if found.is_empty() {
        println!("No file sections found in {}", response);
        return Ok(());
    }

    for section in &found {
        println!("{}", section.filename);
        println!("  …{}…", single_line(&section.snippet));
    }
    Ok(())
}

/// Lists the active signature table in evaluation order.
pub fn rules(rules_path: Option<PathBuf>) -> Result<()> {
    let rules = load_rules(rules_path.as_deref())?;

    println!("Default header:         {}", rules.header_default);
    println!("Default implementation: {}", rules.implementation_default);
    println!("Signature rules ({}):", rules.signatures.len());
    for (idx, rule) in rules.signatures.iter().enumerate() {
        println!("  {:>3}. {} -> {}", idx + 1, rule.pattern.as_str(), rule.filename);
    }
    Ok(())
}

fn load_rules(rules_path: Option<&Path>) -> Result<RuleSet> {
    match rules_path {
        Some(path) => FileRuleRegistry::new(Some(path.to_path_buf()))
            .load_rules()
            .with_context(|| format!("Failed to load rules from {}", path.display())),
        None => Ok(RuleSet::builtin().clone()),
    }
}

fn process_response(response: &str, rules: &RuleSet, max_input_bytes: usize) -> Result<ResponseReport> {
    let text = cap_input(read_response(response)?, max_input_bytes);
    let result = Extractor::new(rules).extract(&text);

    if result.is_empty() {
        tracing::warn!(response, "no C-family code blocks found");
    }

    let files = result
        .into_iter()
        .map(|attribution| {
            let outcome = carve::validate(&attribution.code);
            if !attribution.source.is_confident() {
                tracing::warn!(
                    response,
                    file = %attribution.filename,
                    via = attribution.source.label(),
                    "low-confidence attribution"
                );
            }
            if !outcome.ok {
                tracing::warn!(
                    response,
                    file = %attribution.filename,
                    message = %outcome.message,
                    "structural check failed"
                );
            }
            FileReport {
                confident: attribution.source.is_confident(),
                filename: attribution.filename,
                source: attribution.source,
                ok: outcome.ok,
                message: outcome.message,
                code: attribution.code,
            }
        })
        .collect();

    Ok(ResponseReport {
        response: response.to_string(),
        files,
        sections: carve::locate_sections(&text),
    })
}

fn write_report(
    report: &ResponseReport,
    out_dir: &Path,
    settings: &ExtractSettings,
    config: &Config,
    json: bool,
    progress: &mut ProgressIndicator,
) -> Result<()> {
    if !config.dry_run {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }
    let mut manifest = Manifest::load(out_dir)?;
    if settings.clean {
        let removed = manifest.clear();
        tracing::debug!(removed, dir = %out_dir.display(), "cleared manifest records");
    }

    for file in &report.files {
        if !file.confident {
            progress.low_confidence();
        }

        if settings.reject_invalid && !file.ok {
            progress.file_rejected();
            eprintln!("✗ Rejected {}: {}", file.filename, file.message);
            continue;
        }

        let Some(relative) = safe_relative_path(&file.filename) else {
            progress.file_rejected();
            eprintln!("✗ Blocked path (outside output directory): {}", file.filename);
            continue;
        };
        let path = out_dir.join(relative);

        if !manifest.needs_write(&file.filename, &file.code, &path) {
            progress.file_unchanged();
            if config.verbose {
                status(json, format!("⊚ Skipping {} (unchanged)", path.display()));
            }
            continue;
        }

        if config.dry_run {
            status(
                json,
                format!("Would write {} ({})", path.display(), file.source.label()),
            );
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, format!("{}\n", file.code))
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let outcome = carve::data::ValidationOutcome {
            ok: file.ok,
            message: file.message.clone(),
        };
        manifest.record(&file.filename, &file.code, file.source, &outcome, &report.response);
        progress.file_written();

        if config.verbose {
            status(
                json,
                format!("✓ Written {} ({})", path.display(), file.source.label()),
            );
        }
    }

    if !config.dry_run {
        manifest.save(out_dir)?;
        if config.verbose {
            status(json, manifest.summary());
        }
    }

    Ok(())
}

/// Status lines go to stderr while stdout carries the JSON report.
fn status(json: bool, line: String) {
    if json {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

fn read_response(response: &str) -> Result<String> {
    if response == STDIN_MARKER {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read response from stdin")?;
        return Ok(text);
    }

    fs::read_to_string(response).with_context(|| format!("Failed to read response {}", response))
}

/// Truncates oversized input at a char boundary before it reaches the scanner.
fn cap_input(mut text: String, max_input_bytes: usize) -> String {
    if text.len() <= max_input_bytes {
        return text;
    }

    let mut end = max_input_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    tracing::warn!(
        original = text.len(),
        kept = end,
        "response exceeds max_input_bytes; truncating"
    );
    text.truncate(end);
    text
}

/// With several responses each one gets its own subdirectory named after it.
///
/// Repeated stems (`a/answer.md`, `b/answer.md`) get a numeric suffix so no
/// response writes over another.
fn response_out_dirs(out_dir: &Path, responses: &[String]) -> Vec<PathBuf> {
    if responses.len() <= 1 {
        return vec![out_dir.to_path_buf(); responses.len()];
    }

    let mut used = HashSet::new();
    responses
        .iter()
        .map(|response| {
            let stem = response_stem(response);
            let mut name = stem.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}", stem, n);
                n += 1;
            }
            if name != stem {
                tracing::warn!(response = %response, dir = %name, "duplicate response name; using a suffixed directory");
            }
            out_dir.join(name)
        })
        .collect()
}

fn response_stem(response: &str) -> String {
    if response == STDIN_MARKER {
        return "stdin".to_string();
    }
    Path::new(response)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("response")
        .to_string()
}

/// Filenames come from model output; only plain relative paths are written.
fn safe_relative_path(filename: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(filename).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Config {
        Config {
            verbose: false,
            dry_run: false,
        }
    }

    #[test]
    fn blocks_paths_outside_output_directory() {
        assert_eq!(safe_relative_path("zone.c"), Some(PathBuf::from("zone.c")));
        assert_eq!(
            safe_relative_path("./src/zone.c"),
            Some(PathBuf::from("src/zone.c"))
        );
        assert_eq!(safe_relative_path("../zone.c"), None);
        assert_eq!(safe_relative_path("/etc/zone.c"), None);
        assert_eq!(safe_relative_path(""), None);
    }

    #[test]
    fn caps_input_on_char_boundary() {
        assert_eq!(cap_input("abcdef".to_string(), 10), "abcdef");
        assert_eq!(cap_input("abcdef".to_string(), 3), "abc");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(cap_input("aé".to_string(), 2), "a");
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn multiple_responses_get_subdirectories() {
        let out = Path::new("gen");
        assert_eq!(
            response_out_dirs(out, &names(&["a/answer.md"])),
            vec![PathBuf::from("gen")]
        );
        assert_eq!(
            response_out_dirs(out, &names(&["a/answer.md", "-"])),
            vec![PathBuf::from("gen/answer"), PathBuf::from("gen/stdin")]
        );
    }

    #[test]
    fn repeated_response_stems_get_distinct_subdirectories() {
        let out = Path::new("gen");
        assert_eq!(
            response_out_dirs(
                out,
                &names(&["a/answer.md", "b/answer.md", "answer-2.md", "c/answer.txt"])
            ),
            vec![
                PathBuf::from("gen/answer"),
                PathBuf::from("gen/answer-2"),
                PathBuf::from("gen/answer-2-2"),
                PathBuf::from("gen/answer-3"),
            ]
        );
    }

    #[test]
    fn processes_and_writes_response() {
        let dir = tempfile::tempdir().unwrap();
        let response_path = dir.path().join("answer.md");
        fs::write(
            &response_path,
            "Here is zone.c:\n```c\nvoid *p = Z_TagMalloc(8, 1);\n```\n```c\nint broken(void) {\n```\n",
        )
        .unwrap();

        let response = response_path.to_string_lossy().to_string();
        let report = process_response(&response, RuleSet::builtin(), 1024).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].filename, "zone.c");
        assert!(report.files[0].ok);
        assert_eq!(report.files[1].filename, "main.c");
        assert!(!report.files[1].ok);
        assert_eq!(report.sections[0].filename, "zone.c");

        let out_dir = dir.path().join("out");
        let settings = ExtractSettings {
            reject_invalid: true,
            out_dir: out_dir.clone(),
            ..ExtractSettings::default()
        };
        let mut progress = ProgressIndicator::new(1);
        write_report(&report, &out_dir, &settings, &quiet(), false, &mut progress).unwrap();

        assert_eq!(
            fs::read_to_string(out_dir.join("zone.c")).unwrap(),
            "void *p = Z_TagMalloc(8, 1);\n"
        );
        assert!(!out_dir.join("main.c").exists());

        let manifest = Manifest::load(&out_dir).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(!manifest.needs_write(
            "zone.c",
            "void *p = Z_TagMalloc(8, 1);",
            &out_dir.join("zone.c")
        ));
    }

    fn single_file_report(code: &str) -> ResponseReport {
        ResponseReport {
            response: "r.md".to_string(),
            files: vec![FileReport {
                filename: "main.c".to_string(),
                source: AttributionSource::ImplementationFallback,
                confident: false,
                ok: true,
                message: String::new(),
                code: code.to_string(),
            }],
            sections: Vec::new(),
        }
    }

    #[test]
    fn clean_rewrites_files_the_manifest_considers_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let report = single_file_report("int x;");
        let mut settings = ExtractSettings {
            out_dir: out_dir.clone(),
            ..ExtractSettings::default()
        };
        let mut progress = ProgressIndicator::new(1);

        write_report(&report, &out_dir, &settings, &quiet(), false, &mut progress).unwrap();
        fs::write(out_dir.join("main.c"), "edited by hand\n").unwrap();

        write_report(&report, &out_dir, &settings, &quiet(), false, &mut progress).unwrap();
        assert_eq!(
            fs::read_to_string(out_dir.join("main.c")).unwrap(),
            "edited by hand\n"
        );

        settings.clean = true;
        write_report(&report, &out_dir, &settings, &quiet(), false, &mut progress).unwrap();
        assert_eq!(fs::read_to_string(out_dir.join("main.c")).unwrap(), "int x;\n");
        assert_eq!(Manifest::load(&out_dir).unwrap().len(), 1);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let report = single_file_report("int x;");
        let config = Config {
            verbose: false,
            dry_run: true,
        };
        let mut progress = ProgressIndicator::new(1);
        write_report(&report, &out_dir, &ExtractSettings::default(), &config, true, &mut progress)
            .unwrap();
        assert!(!out_dir.exists());
    }
}
