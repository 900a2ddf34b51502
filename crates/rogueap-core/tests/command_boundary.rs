//! Only the host layer may start processes; everything else goes through `HostOps`.

use std::fs;
use std::path::{Path, PathBuf};

const ALLOWED: &[&str] = &["host.rs"];
const NEEDLES: &[&str] = &["Command::new", "std::process::Command", "process::Command"];

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_sources(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn commands_are_spawned_only_from_host_layer() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut sources = Vec::new();
    collect_sources(&src, &mut sources);
    assert!(!sources.is_empty());

    let mut violations = Vec::new();
    for path in sources {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if ALLOWED.contains(&name) {
            continue;
        }
        let text = fs::read_to_string(&path).unwrap();
        for (idx, line) in text.lines().enumerate() {
            if NEEDLES.iter().any(|n| line.contains(n)) {
                violations.push(format!("{}:{}: {}", path.display(), idx + 1, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "process spawning outside host.rs:\n{}",
        violations.join("\n")
    );
}
