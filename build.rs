use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const QUOTED_PREFIX: &str = "\"THORT_";

/// Every `.rs` file under `root`, sorted so the generated list is stable.
fn source_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut out = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Names that appear as complete string literals, e.g. `"THORT_HOME"`.
/// Mentions in comments or prefixes assembled at runtime are not variables
/// the binary reads.
fn literal_env_keys(source: &str, out: &mut BTreeSet<String>) {
    for (at, _) in source.match_indices(QUOTED_PREFIX) {
        let rest = &source[at + 1..];
        let Some(end) = rest.find('"') else {
            continue;
        };
        let key = &rest[..end];
        let is_name = key.len() > QUOTED_PREFIX.len() - 1
            && key
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if is_name {
            out.insert(key.to_string());
        }
    }
}

fn render_allowlist(keys: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const GENERATED_THORT_ENV_ALLOWLIST: &[&str] = &[\n");
    for key in keys {
        out.push_str(&format!("    \"{key}\",\n"));
    }
    out.push_str("];\n");
    out
}

fn main() {
    let mut keys = BTreeSet::new();
    let files = source_files(Path::new("src")).expect("src/ is readable");
    for file in &files {
        if let Ok(content) = fs::read_to_string(file) {
            literal_env_keys(&content, &mut keys);
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(
        Path::new(&out_dir).join("thort_env_allowlist.rs"),
        render_allowlist(&keys),
    )
    .expect("failed to write THORT env allowlist");

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        now.as_secs(),
        now.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
