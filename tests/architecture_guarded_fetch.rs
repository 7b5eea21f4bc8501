use std::fs;
use std::path::{Path, PathBuf};

/// The only module allowed to put bytes on the wire
const ALLOWED_RAW_HTTP: &[&str] = &["src/quota/fetch.rs"];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn outbound_http_goes_through_the_quota_governor() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);
    assert!(!files.is_empty());

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if ALLOWED_RAW_HTTP.contains(&rel.as_str()) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            let raw_http = trimmed.contains(".send().await")
                || trimmed.contains("reqwest::get(")
                || trimmed.contains("client.get(")
                || trimmed.contains("client.post(");
            if raw_http {
                offenders.push(format!("{rel}:{}: {trimmed}", idx + 1));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "HTTP calls outside the guarded fetcher bypass provider quotas:\n{}",
        offenders.join("\n")
    );
}
